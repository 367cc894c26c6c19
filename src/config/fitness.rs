use super::traits::{invalid, ConfigSection};
use crate::error::GpError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessConfig {
    /// Value the evolved program should leave on top of the stack
    pub target: i64,
    /// Distance assigned when the top of stack is missing or not numeric
    pub sentinel_distance: f64,
    /// Average top-K distance at or below which the run counts as converged.
    /// 0.0 keeps the exact-equality rule.
    pub convergence_epsilon: f64,
    /// Average top-K code length must be strictly below this to converge
    pub convergence_code_length: f64,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            target: 123,
            sentinel_distance: 9999.9,
            convergence_epsilon: 0.0,
            convergence_code_length: 2.0,
        }
    }
}

impl ConfigSection for FitnessConfig {
    fn section_name() -> &'static str {
        "fitness"
    }

    fn validate(&self) -> Result<(), GpError> {
        let section = Self::section_name();
        if !self.sentinel_distance.is_finite() || self.sentinel_distance <= 0.0 {
            return Err(invalid(section, "sentinel_distance must be a positive finite number"));
        }
        if !self.convergence_epsilon.is_finite() || self.convergence_epsilon < 0.0 {
            return Err(invalid(section, "convergence_epsilon must be non-negative"));
        }
        Ok(())
    }
}
