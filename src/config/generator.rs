use super::traits::{invalid, ConfigSection};
use crate::error::GpError;
use serde::{Deserialize, Serialize};

/// Instructions that would make a program interactive or introspective.
pub const DEFAULT_EXCLUDED: [&str; 5] = [".", "exit", "read", "write", "stack"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub min_code_length: usize,
    pub max_code_length: usize,
    pub int_min: i64,
    pub int_max: i64,
    pub string_min_length: usize,
    pub string_max_length: usize,
    /// Draws at or below this ratio become instructions
    pub instruction_ratio: f64,
    /// Draws above `instruction_ratio` and at or below this become integers; the rest strings
    pub number_string_ratio: f64,
    pub exclude: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            min_code_length: 1,
            max_code_length: 10,
            int_min: 0,
            int_max: 999,
            string_min_length: 1,
            string_max_length: 10,
            instruction_ratio: 0.5,
            number_string_ratio: 0.8,
            exclude: DEFAULT_EXCLUDED.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ConfigSection for GeneratorConfig {
    fn section_name() -> &'static str {
        "generator"
    }

    fn validate(&self) -> Result<(), GpError> {
        let section = Self::section_name();
        if self.min_code_length > self.max_code_length {
            return Err(invalid(section, "min_code_length exceeds max_code_length"));
        }
        if self.int_min > self.int_max {
            return Err(invalid(section, "int_min exceeds int_max"));
        }
        if self.string_min_length > self.string_max_length {
            return Err(invalid(section, "string_min_length exceeds string_max_length"));
        }
        for (name, ratio) in [
            ("instruction_ratio", self.instruction_ratio),
            ("number_string_ratio", self.number_string_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(invalid(section, format!("{} must be between 0 and 1", name)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_excludes_blocking_io() {
        let config = GeneratorConfig::default();
        for name in ["read", "write", "exit", "stack", "."] {
            assert!(config.exclude.iter().any(|e| e == name));
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let config = GeneratorConfig {
            min_code_length: 5,
            max_code_length: 2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
