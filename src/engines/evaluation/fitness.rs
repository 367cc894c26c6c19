use crate::config::FitnessConfig;
use crate::engines::evaluation::evaluator::ExecutionOutcome;
use crate::types::Value;
use serde::Serialize;
use std::cmp::Ordering;

/// Ranking key for a genome; lower is better.
///
/// Ordered by distance, then combined stack depth, then code length. The
/// last two prefer smaller programs that leave less behind.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FitnessScore {
    pub distance: f64,
    pub stack_depth: usize,
    pub code_length: usize,
}

impl Ord for FitnessScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.stack_depth.cmp(&other.stack_depth))
            .then(self.code_length.cmp(&other.code_length))
    }
}

impl PartialOrd for FitnessScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FitnessScore {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FitnessScore {}

pub struct FitnessFunction {
    target: i64,
    sentinel_distance: f64,
}

impl FitnessFunction {
    pub fn new(target: i64, sentinel_distance: f64) -> Self {
        Self {
            target,
            sentinel_distance,
        }
    }

    pub fn from_config(config: &FitnessConfig) -> Self {
        Self::new(config.target, config.sentinel_distance)
    }

    pub fn target(&self) -> i64 {
        self.target
    }

    /// `|target - value| / |target|`, or `|value|` when the target is zero.
    pub fn distance(&self, value: i64) -> f64 {
        let diff = (self.target as f64 - value as f64).abs();
        if self.target == 0 {
            diff
        } else {
            diff / (self.target as f64).abs()
        }
    }

    pub fn score(&self, outcome: &ExecutionOutcome) -> FitnessScore {
        let stack_depth = outcome.stack_depth();
        let code_length = outcome.code_length;

        // Doing nothing must never beat doing something.
        if code_length == 0 {
            return FitnessScore {
                distance: f64::INFINITY,
                stack_depth,
                code_length,
            };
        }

        // A fault does not discard whatever the program already computed.
        let distance = match outcome.top().and_then(Value::as_integer) {
            Some(top) => self.distance(top),
            None => self.sentinel_distance,
        };

        FitnessScore {
            distance,
            stack_depth,
            code_length,
        }
    }
}
