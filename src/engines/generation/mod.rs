pub mod genome;
pub mod generator;
pub mod operators;
pub mod evolution_engine;
pub mod progress;

pub use genome::Genome;
pub use generator::Generator;
pub use operators::{crossover, mutate, MutationKind};
pub use evolution_engine::{
    EngineState, EvolutionEngine, EvolutionReport, GenerationStats, ProgressCallback, RankedGenome,
};
pub use progress::{ChannelProgressCallback, ConsoleProgressCallback, ProgressMessage};
