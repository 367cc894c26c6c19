use super::traits::{invalid, ConfigSection};
use crate::error::GpError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub generations: usize,
    /// Machine steps allowed per evaluation
    pub step_budget: usize,
    /// Survivors kept for breeding each generation
    pub keep_top: usize,
    /// Per-genome probability of one mutation
    pub mutation_rate: f64,
    pub seed: Option<u64>,
    /// Evaluate genomes on the rayon pool
    pub parallel: bool,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 1000,
            generations: 100_000,
            step_budget: 20,
            keep_top: 50,
            mutation_rate: 0.075,
            seed: None,
            parallel: false,
        }
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<(), GpError> {
        let section = Self::section_name();
        if self.population_size == 0 {
            return Err(invalid(section, "Population size must be at least 1"));
        }
        if self.keep_top == 0 {
            return Err(invalid(section, "keep_top must be at least 1"));
        }
        if self.keep_top >= self.population_size {
            return Err(invalid(
                section,
                format!(
                    "keep_top ({}) must be smaller than population_size ({})",
                    self.keep_top, self.population_size
                ),
            ));
        }
        if self.step_budget == 0 {
            return Err(invalid(section, "Step budget must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(invalid(section, "Mutation rate must be between 0 and 1"));
        }
        Ok(())
    }
}
