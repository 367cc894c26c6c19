pub mod config;
pub mod engines;
pub mod error;
pub mod machine;
pub mod types;

pub use error::{GpError, MachineError, Result};
