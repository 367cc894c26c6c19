pub mod traits;
pub mod evolution;
pub mod generator;
pub mod fitness;
pub mod manager;

pub use manager::{ConfigManager, AppConfig};
pub use traits::ConfigSection;
pub use evolution::EvolutionConfig;
pub use generator::GeneratorConfig;
pub use fitness::FitnessConfig;
