use super::evolution_engine::{GenerationStats, ProgressCallback};
use std::sync::mpsc::Sender;

/// Prints one line per generation.
pub struct ConsoleProgressCallback;

impl ConsoleProgressCallback {
    pub fn format_line(stats: &GenerationStats) -> String {
        format!(
            "Generation {} fitness {:.7} stack length {:.2} code length {:.2} mutations {}",
            stats.generation,
            stats.avg_distance,
            stats.avg_stack_depth,
            stats.avg_code_length,
            stats.mutations
        )
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_generation_start(&mut self, _generation: usize) {}

    fn on_generation_complete(&mut self, stats: &GenerationStats) {
        println!("{}", Self::format_line(stats));
    }
}

// For embedding the engine behind another thread
pub struct ChannelProgressCallback {
    sender: Sender<ProgressMessage>,
}

#[derive(Debug, Clone)]
pub enum ProgressMessage {
    GenerationStart(usize),
    GenerationComplete(GenerationStats),
}

impl ChannelProgressCallback {
    pub fn new(sender: Sender<ProgressMessage>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationStart(generation));
    }

    fn on_generation_complete(&mut self, stats: &GenerationStats) {
        let _ = self
            .sender
            .send(ProgressMessage::GenerationComplete(stats.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_line_format() {
        let stats = GenerationStats {
            generation: 3,
            avg_distance: 0.5,
            avg_stack_depth: 1.25,
            avg_code_length: 4.0,
            mutations: 7,
            faulted: 0,
            population_size: 10,
        };
        assert_eq!(
            ConsoleProgressCallback::format_line(&stats),
            "Generation 3 fitness 0.5000000 stack length 1.25 code length 4.00 mutations 7"
        );
    }
}
