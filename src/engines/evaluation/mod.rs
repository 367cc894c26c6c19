pub mod evaluator;
pub mod fitness;

pub use evaluator::{Evaluator, ExecutionOutcome, Outcome};
pub use fitness::{FitnessFunction, FitnessScore};
