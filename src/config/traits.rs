use crate::error::GpError;
use serde::{Deserialize, Serialize};

/// Trait for configuration sections
pub trait ConfigSection: Serialize + for<'de> Deserialize<'de> + Default + Clone {
    fn section_name() -> &'static str;
    fn validate(&self) -> Result<(), GpError>;
}

pub(crate) fn invalid(section: &str, message: impl Into<String>) -> GpError {
    GpError::Configuration(format!("[{}] {}", section, message.into()))
}
