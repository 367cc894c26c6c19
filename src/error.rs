use thiserror::Error;

#[derive(Error, Debug)]
pub enum GpError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Machine error: {0}")]
    Machine(#[from] MachineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),
}

/// Runtime faults raised while a machine executes a program.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MachineError {
    #[error("Stack underflow in '{0}'")]
    StackUnderflow(String),

    #[error("Return stack underflow")]
    ReturnStackUnderflow,

    #[error("Stack overflow")]
    StackOverflow,

    #[error("Type mismatch in '{op}': expected {expected}, got {actual}")]
    TypeMismatch {
        op: String,
        expected: String,
        actual: String,
    },

    #[error("Unknown instruction: {0}")]
    UnknownInstruction(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid jump target: {0}")]
    InvalidJump(i64),

    #[error("String too long: {0} bytes")]
    StringTooLong(usize),

    #[error("IO error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, GpError>;
