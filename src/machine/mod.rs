pub mod instructions;
pub mod registry;

pub use registry::{Instruction, InstructionRegistry, NativeInstruction};

use crate::error::MachineError;
use crate::types::{render, Token, Value};
use std::io::{self, BufRead};
use std::sync::Arc;

pub const MAX_STACK_DEPTH: usize = 1024;
pub const MAX_STRING_LEN: usize = 4096;

/// How a bounded run ended without faulting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The instruction pointer moved past the last token
    Halted,
    /// The program executed `exit`
    Stopped,
    BudgetExhausted,
}

/// Stack machine executing a token sequence.
///
/// Code is only replaced through [`Machine::set_code`]; [`Machine::reset`]
/// clears the stacks, instruction pointer and captured output but keeps the
/// program.
pub struct Machine {
    registry: Arc<InstructionRegistry>,
    code: Vec<Token>,
    stack: Vec<Value>,
    return_stack: Vec<usize>,
    ip: usize,
    stopped: bool,
    output: Vec<u8>,
    input: Box<dyn BufRead + Send>,
}

impl Machine {
    /// Creates a machine whose input is permanently at end-of-file.
    pub fn new(registry: Arc<InstructionRegistry>, code: Vec<Token>) -> Self {
        Self {
            registry,
            code,
            stack: Vec::new(),
            return_stack: Vec::new(),
            ip: 0,
            stopped: false,
            output: Vec::new(),
            input: Box::new(io::empty()),
        }
    }

    pub fn with_input(mut self, input: Box<dyn BufRead + Send>) -> Self {
        self.input = input;
        self
    }

    pub fn reset(&mut self) -> &mut Self {
        self.stack.clear();
        self.return_stack.clear();
        self.ip = 0;
        self.stopped = false;
        self.output.clear();
        self
    }

    /// Executes at most `steps` tokens.
    pub fn run(&mut self, steps: usize) -> Result<RunStatus, MachineError> {
        for _ in 0..steps {
            if self.ip >= self.code.len() {
                return Ok(RunStatus::Halted);
            }
            self.step()?;
            if self.stopped {
                return Ok(RunStatus::Stopped);
            }
        }

        if self.ip >= self.code.len() {
            Ok(RunStatus::Halted)
        } else {
            Ok(RunStatus::BudgetExhausted)
        }
    }

    fn step(&mut self) -> Result<(), MachineError> {
        let ip = self.ip;
        self.ip += 1;

        let instruction = match &self.code[ip] {
            Token::Integer(n) => {
                let value = Value::Integer(*n);
                return self.push(value);
            }
            Token::Str(bytes) => {
                let value = Value::Str(bytes.clone());
                return self.push(value);
            }
            Token::Opcode(name) => self
                .registry
                .get(name)
                .ok_or_else(|| MachineError::UnknownInstruction(name.clone()))?,
        };

        if self.stack.len() < instruction.arity() {
            return Err(MachineError::StackUnderflow(instruction.alias().to_string()));
        }
        instruction.execute(self)
    }

    pub fn code(&self) -> &[Token] {
        &self.code
    }

    pub fn set_code(&mut self, code: Vec<Token>) {
        self.code = code;
    }

    pub fn code_string(&self) -> String {
        render(&self.code)
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn return_stack(&self) -> &[usize] {
        &self.return_stack
    }

    pub fn top(&self) -> Option<&Value> {
        self.stack.last()
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn registry(&self) -> &Arc<InstructionRegistry> {
        &self.registry
    }

    // --- Primitives used by instruction implementations ---

    pub fn push(&mut self, value: Value) -> Result<(), MachineError> {
        if self.stack.len() >= MAX_STACK_DEPTH {
            return Err(MachineError::StackOverflow);
        }
        if let Value::Str(bytes) = &value {
            if bytes.len() > MAX_STRING_LEN {
                return Err(MachineError::StringTooLong(bytes.len()));
            }
        }
        self.stack.push(value);
        Ok(())
    }

    pub fn pop(&mut self, op: &str) -> Result<Value, MachineError> {
        self.stack
            .pop()
            .ok_or_else(|| MachineError::StackUnderflow(op.to_string()))
    }

    pub fn pop_integer(&mut self, op: &str) -> Result<i64, MachineError> {
        match self.pop(op)? {
            Value::Integer(n) => Ok(n),
            other => Err(MachineError::TypeMismatch {
                op: op.to_string(),
                expected: "integer".to_string(),
                actual: other.type_name().to_string(),
            }),
        }
    }

    pub fn peek(&self, op: &str) -> Result<&Value, MachineError> {
        self.stack
            .last()
            .ok_or_else(|| MachineError::StackUnderflow(op.to_string()))
    }

    /// Moves the instruction pointer. Jumping to `code.len()` is allowed and halts.
    pub fn jump(&mut self, target: i64) -> Result<(), MachineError> {
        if target < 0 || target as usize > self.code.len() {
            return Err(MachineError::InvalidJump(target));
        }
        self.ip = target as usize;
        Ok(())
    }

    pub fn instruction_pointer(&self) -> usize {
        self.ip
    }

    pub fn push_return(&mut self, address: usize) -> Result<(), MachineError> {
        if self.return_stack.len() >= MAX_STACK_DEPTH {
            return Err(MachineError::StackOverflow);
        }
        self.return_stack.push(address);
        Ok(())
    }

    pub fn pop_return(&mut self) -> Result<usize, MachineError> {
        self.return_stack
            .pop()
            .ok_or(MachineError::ReturnStackUnderflow)
    }

    pub fn write_output(&mut self, bytes: &[u8]) {
        self.output.extend_from_slice(bytes);
    }

    /// Reads one line without its terminator; end-of-input yields an empty line.
    pub fn read_line(&mut self) -> Result<Vec<u8>, MachineError> {
        let mut line = Vec::new();
        self.input
            .read_until(b'\n', &mut line)
            .map_err(|e| MachineError::Io(e.to_string()))?;
        while matches!(line.last(), Some(b'\n') | Some(b'\r')) {
            line.pop();
        }
        Ok(line)
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(code: Vec<Token>) -> Machine {
        Machine::new(Arc::new(InstructionRegistry::new()), code)
    }

    #[test]
    fn test_literals_and_arithmetic() {
        let mut m = machine(vec![Token::Integer(100), Token::Integer(23), Token::opcode("+")]);
        assert_eq!(m.run(10), Ok(RunStatus::Halted));
        assert_eq!(m.top(), Some(&Value::Integer(123)));
        assert_eq!(m.stack().len(), 1);
    }

    #[test]
    fn test_budget_exhaustion() {
        // 0 jmp loops forever
        let mut m = machine(vec![Token::Integer(0), Token::opcode("jmp")]);
        assert_eq!(m.run(20), Ok(RunStatus::BudgetExhausted));
    }

    #[test]
    fn test_exit_stops() {
        let mut m = machine(vec![Token::Integer(1), Token::opcode("exit"), Token::Integer(2)]);
        assert_eq!(m.run(10), Ok(RunStatus::Stopped));
        assert_eq!(m.stack(), &[Value::Integer(1)]);
    }

    #[test]
    fn test_underflow_faults() {
        let mut m = machine(vec![Token::opcode("+")]);
        assert!(matches!(m.run(10), Err(MachineError::StackUnderflow(_))));
    }

    #[test]
    fn test_unknown_instruction_faults() {
        let mut m = machine(vec![Token::opcode("frobnicate")]);
        assert_eq!(
            m.run(10),
            Err(MachineError::UnknownInstruction("frobnicate".to_string()))
        );
    }

    #[test]
    fn test_reset_keeps_code() {
        let mut m = machine(vec![Token::Integer(5), Token::opcode("dup")]);
        m.run(10).unwrap();
        assert_eq!(m.stack().len(), 2);
        m.reset();
        assert!(m.stack().is_empty());
        assert!(m.return_stack().is_empty());
        assert_eq!(m.code().len(), 2);
    }

    #[test]
    fn test_reset_then_run_is_deterministic() {
        let code = vec![
            Token::Integer(7),
            Token::opcode("dup"),
            Token::opcode("*"),
            Token::Str(b"x".to_vec()),
            Token::Integer(0),
            Token::opcode("call"),
        ];
        let mut m = machine(code);
        let first = m.reset().run(20);
        let first_stack = m.stack().to_vec();
        let first_return = m.return_stack().to_vec();
        let second = m.reset().run(20);
        assert_eq!(first, second);
        assert_eq!(first_stack, m.stack());
        assert_eq!(first_return, m.return_stack());
    }

    #[test]
    fn test_read_without_input_yields_empty_string() {
        let mut m = machine(vec![Token::opcode("read")]);
        assert_eq!(m.run(5), Ok(RunStatus::Halted));
        assert_eq!(m.top(), Some(&Value::Str(Vec::new())));
    }

    #[test]
    fn test_read_from_supplied_input() {
        let input = std::io::Cursor::new(b"hello\nworld\n".to_vec());
        let mut m = machine(vec![Token::opcode("read")]).with_input(Box::new(input));
        m.run(5).unwrap();
        assert_eq!(m.top(), Some(&Value::Str(b"hello".to_vec())));
    }

    #[test]
    fn test_code_string() {
        let m = machine(vec![Token::Integer(1), Token::Str(b"hi".to_vec()), Token::opcode("swap")]);
        assert_eq!(m.code_string(), "1 \"hi\" swap");
    }

    #[test]
    fn test_stack_overflow_is_fault() {
        // 1 0 jmp: pushes forever
        let mut m = machine(vec![Token::Integer(1), Token::Integer(0), Token::opcode("jmp")]);
        assert_eq!(m.run(10_000), Err(MachineError::StackOverflow));
    }
}
