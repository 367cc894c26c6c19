use super::{instructions, Machine};
use crate::error::MachineError;
use std::collections::BTreeMap;
use std::sync::Arc;

/// An operation over the machine's stacks, selected by name at run time.
pub trait Instruction: Send + Sync {
    fn alias(&self) -> &'static str;

    /// Number of data stack values consumed
    fn arity(&self) -> usize;

    fn execute(&self, machine: &mut Machine) -> Result<(), MachineError>;
}

/// Instruction backed by a plain function.
pub struct NativeInstruction {
    pub alias: &'static str,
    pub arity: usize,
    pub exec: fn(&mut Machine) -> Result<(), MachineError>,
}

impl Instruction for NativeInstruction {
    fn alias(&self) -> &'static str {
        self.alias
    }

    fn arity(&self) -> usize {
        self.arity
    }

    fn execute(&self, machine: &mut Machine) -> Result<(), MachineError> {
        (self.exec)(machine)
    }
}

/// Name -> instruction mapping, built once at startup.
///
/// Backed by a `BTreeMap` so [`InstructionRegistry::names`] enumerates in a
/// stable order; seeded runs depend on that.
pub struct InstructionRegistry {
    instructions: BTreeMap<String, Arc<dyn Instruction>>,
}

impl InstructionRegistry {
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_arithmetic();
        registry.register_logic();
        registry.register_stack_ops();
        registry.register_control_flow();
        registry.register_io();
        registry
    }

    pub fn empty() -> Self {
        Self {
            instructions: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, instruction: Arc<dyn Instruction>) {
        self.instructions
            .insert(instruction.alias().to_string(), instruction);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Instruction>> {
        self.instructions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.instructions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.instructions.keys().map(|k| k.as_str())
    }

    /// Sorted instruction names minus `excluded`.
    pub fn vocabulary(&self, excluded: &[String]) -> Vec<String> {
        self.names()
            .filter(|name| !excluded.iter().any(|e| e == name))
            .map(|name| name.to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    fn register_all(&mut self, natives: Vec<NativeInstruction>) {
        for native in natives {
            self.register(Arc::new(native));
        }
    }

    fn register_arithmetic(&mut self) {
        self.register_all(vec![
            native("+", 2, instructions::add),
            native("-", 2, instructions::sub),
            native("*", 2, instructions::mul),
            native("/", 2, instructions::div),
            native("%", 2, instructions::rem),
            native("abs", 1, instructions::abs),
            native("negate", 1, instructions::negate),
            native("&", 2, instructions::bit_and),
            native("|", 2, instructions::bit_or),
            native("^", 2, instructions::bit_xor),
            native("~", 1, instructions::bit_not),
        ]);
    }

    fn register_logic(&mut self) {
        self.register_all(vec![
            native("<", 2, instructions::less),
            native(">", 2, instructions::greater),
            native("=", 2, instructions::equal),
            native("<>", 2, instructions::not_equal),
            native("and", 2, instructions::and),
            native("or", 2, instructions::or),
            native("not", 1, instructions::not),
            native("true", 0, instructions::push_true),
            native("false", 0, instructions::push_false),
            native("bool", 1, instructions::cast_bool),
            native("int", 1, instructions::cast_int),
            native("str", 1, instructions::cast_str),
        ]);
    }

    fn register_stack_ops(&mut self) {
        self.register_all(vec![
            native("dup", 1, instructions::dup),
            native("drop", 1, instructions::drop),
            native("swap", 2, instructions::swap),
            native("over", 2, instructions::over),
            native("rot", 3, instructions::rot),
            native("nop", 0, instructions::nop),
        ]);
    }

    fn register_control_flow(&mut self) {
        self.register_all(vec![
            native("jmp", 1, instructions::jmp),
            native("call", 1, instructions::call),
            native("return", 0, instructions::ret),
            native("if", 3, instructions::select),
            native("exit", 0, instructions::exit),
        ]);
    }

    fn register_io(&mut self) {
        self.register_all(vec![
            native(".", 1, instructions::print),
            native("write", 1, instructions::write),
            native("read", 0, instructions::read),
            native("stack", 0, instructions::dump_stack),
        ]);
    }
}

impl Default for InstructionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn native(
    alias: &'static str,
    arity: usize,
    exec: fn(&mut Machine) -> Result<(), MachineError>,
) -> NativeInstruction {
    NativeInstruction { alias, arity, exec }
}
