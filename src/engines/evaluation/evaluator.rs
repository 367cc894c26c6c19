use crate::engines::generation::genome::Genome;
use crate::error::MachineError;
use crate::machine::{InstructionRegistry, Machine, RunStatus};
use crate::types::Value;
use rayon::prelude::*;
use std::sync::Arc;

/// How one evaluation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Ran past the last token
    Completed,
    /// Executed an explicit stop
    Stopped,
    BudgetExhausted,
    Faulted(MachineError),
}

impl Outcome {
    /// Everything except a runtime fault counts as a clean finish.
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Faulted(_))
    }
}

/// Machine state captured when an evaluation ends.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub outcome: Outcome,
    pub stack: Vec<Value>,
    pub return_stack: Vec<usize>,
    pub code_length: usize,
}

impl ExecutionOutcome {
    pub fn top(&self) -> Option<&Value> {
        self.stack.last()
    }

    /// Data stack plus return stack depth
    pub fn stack_depth(&self) -> usize {
        self.stack.len() + self.return_stack.len()
    }
}

/// Runs genomes on fresh machines under a step budget.
pub struct Evaluator {
    registry: Arc<InstructionRegistry>,
    step_budget: usize,
}

impl Evaluator {
    pub fn new(registry: Arc<InstructionRegistry>, step_budget: usize) -> Self {
        Self {
            registry,
            step_budget,
        }
    }

    pub fn step_budget(&self) -> usize {
        self.step_budget
    }

    /// Evaluates on a machine of its own, so no state leaks between genomes.
    pub fn evaluate(&self, genome: &Genome) -> ExecutionOutcome {
        let mut machine = Machine::new(Arc::clone(&self.registry), genome.clone());
        self.evaluate_machine(&mut machine)
    }

    /// Resets `machine` and runs its current code. Faults are captured in the
    /// returned outcome, never propagated.
    pub fn evaluate_machine(&self, machine: &mut Machine) -> ExecutionOutcome {
        let outcome = match machine.reset().run(self.step_budget) {
            Ok(RunStatus::Halted) => Outcome::Completed,
            Ok(RunStatus::Stopped) => Outcome::Stopped,
            Ok(RunStatus::BudgetExhausted) => Outcome::BudgetExhausted,
            Err(e) => {
                log::trace!("Program faulted: {} (code: {})", e, machine.code_string());
                Outcome::Faulted(e)
            }
        };

        ExecutionOutcome {
            outcome,
            stack: machine.stack().to_vec(),
            return_stack: machine.return_stack().to_vec(),
            code_length: machine.code().len(),
        }
    }

    /// Outcomes in population order. With `parallel` the work is spread over
    /// the rayon pool; the call returns only once every genome is done.
    pub fn evaluate_population(
        &self,
        population: &[Genome],
        parallel: bool,
    ) -> Vec<ExecutionOutcome> {
        if parallel {
            population.par_iter().map(|g| self.evaluate(g)).collect()
        } else {
            population.iter().map(|g| self.evaluate(g)).collect()
        }
    }
}
