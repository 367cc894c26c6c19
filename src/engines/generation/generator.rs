use crate::config::{ConfigSection, GeneratorConfig};
use crate::engines::generation::genome::Genome;
use crate::error::{GpError, Result};
use crate::machine::InstructionRegistry;
use crate::types::Token;
use rand::Rng;

/// Produces random genomes from an instruction vocabulary.
///
/// The vocabulary is fixed at construction and never contains excluded
/// names, so blocking or introspective instructions cannot be drawn.
#[derive(Debug, Clone)]
pub struct Generator {
    vocabulary: Vec<String>,
    config: GeneratorConfig,
}

impl Generator {
    pub fn new(registry: &InstructionRegistry, config: GeneratorConfig) -> Result<Self> {
        let names = registry.names().map(|n| n.to_string()).collect();
        Self::from_vocabulary(names, config)
    }

    pub fn from_vocabulary(vocabulary: Vec<String>, config: GeneratorConfig) -> Result<Self> {
        config.validate()?;

        let vocabulary: Vec<String> = vocabulary
            .into_iter()
            .filter(|name| !config.exclude.contains(name))
            .collect();

        if vocabulary.is_empty() {
            return Err(GpError::Configuration(
                "Instruction vocabulary is empty after exclusions".to_string(),
            ));
        }

        Ok(Self { vocabulary, config })
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Random genome with a length drawn uniformly from the configured range.
    pub fn generate<R: Rng>(&self, rng: &mut R) -> Genome {
        let length = rng.gen_range(self.config.min_code_length..=self.config.max_code_length);
        (0..length).map(|_| self.random_token(rng)).collect()
    }

    /// One random token, as a length-one genome would contain.
    pub fn random_token<R: Rng>(&self, rng: &mut R) -> Token {
        let r: f64 = rng.gen();
        if r <= self.config.instruction_ratio {
            let index = rng.gen_range(0..self.vocabulary.len());
            Token::Opcode(self.vocabulary[index].clone())
        } else if r <= self.config.number_string_ratio {
            Token::Integer(rng.gen_range(self.config.int_min..=self.config.int_max))
        } else {
            let length =
                rng.gen_range(self.config.string_min_length..=self.config.string_max_length);
            Token::Str((0..length).map(|_| rng.gen_range(1..=127u8)).collect())
        }
    }
}
