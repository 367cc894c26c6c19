use crate::config::{AppConfig, EvolutionConfig, FitnessConfig};
use crate::engines::evaluation::{Evaluator, FitnessFunction, FitnessScore};
use crate::engines::generation::{
    generator::Generator,
    genome::{render, Genome},
    operators::{crossover, mutate},
};
use crate::error::Result;
use crate::machine::InstructionRegistry;
use crate::types::Value;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lifecycle of a run. The last three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    Idle,
    Running,
    /// Top-K hit the target with near-minimal code
    Converged,
    /// Cancelled between generations
    Interrupted,
    /// Generation cap reached, or nothing left to breed
    Exhausted,
}

impl EngineState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EngineState::Converged | EngineState::Interrupted | EngineState::Exhausted
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedGenome {
    pub rank: usize,
    pub genome: Genome,
    pub score: FitnessScore,
    /// Top of the data stack after evaluation
    pub top: Option<Value>,
    pub code: String,
}

/// Per-generation report, averaged over the evaluated population's top-K.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub avg_distance: f64,
    pub avg_stack_depth: f64,
    pub avg_code_length: f64,
    pub mutations: usize,
    /// Genomes whose evaluation faulted, across the whole population
    pub faulted: usize,
    pub population_size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvolutionReport {
    pub state: EngineState,
    pub generations: usize,
    /// Ranked top-K of the last evaluated generation, best first
    pub top: Vec<RankedGenome>,
    pub last_stats: Option<GenerationStats>,
}

/// Result of one evaluate -> select -> breed -> mutate pass.
pub struct GenerationStep {
    pub next_population: Vec<Genome>,
    pub ranked: Vec<RankedGenome>,
    pub stats: GenerationStats,
}

pub trait ProgressCallback: Send {
    fn on_generation_start(&mut self, generation: usize);
    fn on_generation_complete(&mut self, stats: &GenerationStats);
}

pub struct EvolutionEngine {
    config: EvolutionConfig,
    fitness_config: FitnessConfig,
    generator: Generator,
    evaluator: Evaluator,
    fitness: FitnessFunction,
    rng: StdRng,
    state: EngineState,
}

impl EvolutionEngine {
    /// Validates the whole configuration; nothing runs if this fails.
    pub fn new(registry: Arc<InstructionRegistry>, config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let generator = Generator::new(&registry, config.generator.clone())?;
        let evaluator = Evaluator::new(registry, config.evolution.step_budget);
        let fitness = FitnessFunction::from_config(&config.fitness);

        let rng = match config.evolution.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config: config.evolution.clone(),
            fitness_config: config.fitness.clone(),
            generator,
            evaluator,
            fitness,
            rng,
            state: EngineState::Idle,
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    /// Run the evolution process until convergence, cancellation or the
    /// generation cap. `cancel` is only checked between generations.
    pub fn run<C: ProgressCallback>(
        &mut self,
        cancel: &AtomicBool,
        callback: &mut C,
    ) -> EvolutionReport {
        self.state = EngineState::Running;
        log::info!(
            "Evolving toward {} with population {}, keep_top {}, step budget {}",
            self.fitness.target(),
            self.config.population_size,
            self.config.keep_top,
            self.config.step_budget
        );

        let mut population = self.initialize_population();
        let mut ranked = Vec::new();
        let mut last_stats = None;
        let mut generations = 0;
        let mut final_state = EngineState::Exhausted;

        for generation in 0..self.config.generations {
            if population.is_empty() {
                log::warn!("Population is empty at generation {}, stopping", generation);
                break;
            }

            callback.on_generation_start(generation);
            let step = self.step(generation, &population);
            callback.on_generation_complete(&step.stats);
            generations = generation + 1;

            let converged = self.is_converged(&step.stats);
            population = step.next_population;
            ranked = step.ranked;
            last_stats = Some(step.stats);

            if converged {
                final_state = EngineState::Converged;
                break;
            }
            if cancel.load(Ordering::SeqCst) {
                final_state = EngineState::Interrupted;
                break;
            }
        }

        self.state = final_state;
        log::info!("Evolution finished after {} generations: {:?}", generations, final_state);

        EvolutionReport {
            state: final_state,
            generations,
            top: ranked,
            last_stats,
        }
    }

    pub fn initialize_population(&mut self) -> Vec<Genome> {
        (0..self.config.population_size)
            .map(|_| self.generator.generate(&mut self.rng))
            .collect()
    }

    /// One generation over `population`.
    pub fn step(&mut self, generation: usize, population: &[Genome]) -> GenerationStep {
        let outcomes = self
            .evaluator
            .evaluate_population(population, self.config.parallel);

        let mut fitness: Vec<(FitnessScore, usize)> = outcomes
            .iter()
            .enumerate()
            .map(|(i, outcome)| (self.fitness.score(outcome), i))
            .collect();
        fitness.sort();

        let chosen = &fitness[..self.config.keep_top.min(fitness.len())];

        let ranked: Vec<RankedGenome> = chosen
            .iter()
            .enumerate()
            .map(|(rank, (score, i))| RankedGenome {
                rank,
                genome: population[*i].clone(),
                score: *score,
                top: outcomes[*i].top().cloned(),
                code: render(&population[*i]),
            })
            .collect();

        let survivors: Vec<&Genome> = chosen.iter().map(|(_, i)| &population[*i]).collect();
        let mut next_population = self.breed(&survivors);

        let mut mutations = 0;
        for genome in next_population.iter_mut() {
            if mutate(genome, self.config.mutation_rate, &self.generator, &mut self.rng) {
                mutations += 1;
            }
        }

        let faulted = outcomes.iter().filter(|o| !o.outcome.is_success()).count();
        let stats = Self::summarize(generation, &ranked, mutations, faulted, population.len());
        log::debug!(
            "Generation {}: avg distance {:.7}, faulted {}/{}",
            generation,
            stats.avg_distance,
            faulted,
            population.len()
        );

        GenerationStep {
            next_population,
            ranked,
            stats,
        }
    }

    /// Fill a new population with crossovers of uniformly drawn survivor pairs.
    fn breed(&mut self, survivors: &[&Genome]) -> Vec<Genome> {
        let mut next_generation = Vec::with_capacity(self.config.population_size);

        while next_generation.len() < self.config.population_size {
            if survivors.is_empty() {
                log::warn!("No survivors to breed from; next generation is empty");
                break;
            }
            let a = survivors[self.rng.gen_range(0..survivors.len())];
            let b = survivors[self.rng.gen_range(0..survivors.len())];
            next_generation.push(crossover(a, b, &mut self.rng));
        }

        next_generation
    }

    fn summarize(
        generation: usize,
        ranked: &[RankedGenome],
        mutations: usize,
        faulted: usize,
        population_size: usize,
    ) -> GenerationStats {
        // Averages over an empty survivor set are NaN.
        let count = ranked.len() as f64;
        let average = |f: fn(&RankedGenome) -> f64| ranked.iter().map(f).sum::<f64>() / count;

        GenerationStats {
            generation,
            avg_distance: average(|r| r.score.distance),
            avg_stack_depth: average(|r| r.score.stack_depth as f64),
            avg_code_length: average(|r| r.score.code_length as f64),
            mutations,
            faulted,
            population_size,
        }
    }

    /// Exact equality when `convergence_epsilon` is zero. A generation with
    /// no survivors never converges.
    pub fn is_converged(&self, stats: &GenerationStats) -> bool {
        stats.population_size > 0
            && stats.avg_distance <= self.fitness_config.convergence_epsilon
            && stats.avg_code_length < self.fitness_config.convergence_code_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Token;

    struct NoProgress;

    impl ProgressCallback for NoProgress {
        fn on_generation_start(&mut self, _generation: usize) {}
        fn on_generation_complete(&mut self, _stats: &GenerationStats) {}
    }

    fn small_config(seed: u64) -> AppConfig {
        let mut config = AppConfig::default();
        config.evolution.population_size = 50;
        config.evolution.keep_top = 5;
        config.evolution.generations = 3;
        config.evolution.step_budget = 20;
        config.evolution.seed = Some(seed);
        config
    }

    fn engine(config: &AppConfig) -> EvolutionEngine {
        EvolutionEngine::new(Arc::new(InstructionRegistry::new()), config).unwrap()
    }

    #[test]
    fn test_rejects_keep_top_not_below_population() {
        let mut config = small_config(1);
        config.evolution.keep_top = 50;
        let result = EvolutionEngine::new(Arc::new(InstructionRegistry::new()), &config);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_empty_vocabulary() {
        let registry = InstructionRegistry::new();
        let mut config = small_config(1);
        config.generator.exclude = registry.names().map(|n| n.to_string()).collect();
        assert!(EvolutionEngine::new(Arc::new(registry), &config).is_err());
    }

    #[test]
    fn test_step_keeps_population_size() {
        let config = small_config(2);
        let mut engine = engine(&config);
        let population = engine.initialize_population();
        let step = engine.step(0, &population);
        assert_eq!(step.next_population.len(), 50);
        assert_eq!(step.ranked.len(), 5);
        for pair in step.ranked.windows(2) {
            assert!(pair[0].score <= pair[1].score);
        }
    }

    #[test]
    fn test_ranked_best_is_exact_target() {
        let config = small_config(3);
        let mut engine = engine(&config);
        let mut population: Vec<Genome> = (0..49).map(|n| vec![Token::Integer(n)]).collect();
        population.push(vec![Token::Integer(123)]);
        let step = engine.step(0, &population);
        assert_eq!(step.ranked[0].top, Some(Value::Integer(123)));
        assert_eq!(step.ranked[0].score.distance, 0.0);
        assert_eq!(step.ranked[0].code, "123");
    }

    #[test]
    fn test_converges_on_perfect_population() {
        let config = small_config(4);
        let mut engine = engine(&config);
        let population: Vec<Genome> = (0..50).map(|_| vec![Token::Integer(123)]).collect();
        let step = engine.step(0, &population);
        assert_eq!(step.stats.avg_distance, 0.0);
        assert_eq!(step.stats.avg_code_length, 1.0);
        assert!(engine.is_converged(&step.stats));
    }

    #[test]
    fn test_empty_generation_never_converges() {
        let config = small_config(9);
        let mut engine = engine(&config);
        let step = engine.step(0, &[]);
        assert!(step.ranked.is_empty());
        assert!(step.next_population.is_empty());
        assert!(step.stats.avg_distance.is_nan());
        assert!(!engine.is_converged(&step.stats));
    }

    #[test]
    fn test_breed_without_survivors_stops_early() {
        let config = small_config(10);
        let mut engine = engine(&config);
        assert!(engine.breed(&[]).is_empty());

        let survivor = vec![Token::Integer(123)];
        let next = engine.breed(&[&survivor]);
        assert_eq!(next.len(), 50);
        assert!(next.iter().all(|g| g == &survivor));
    }

    #[test]
    fn test_run_is_bounded_and_terminal() {
        let config = small_config(5);
        let mut engine = engine(&config);
        let cancel = AtomicBool::new(false);
        let report = engine.run(&cancel, &mut NoProgress);
        assert!(report.top.len() <= 5);
        assert!(report.generations <= 3);
        assert!(engine.state().is_terminal());
    }

    #[test]
    fn test_cancel_stops_after_first_generation() {
        let mut config = small_config(6);
        config.evolution.generations = 1000;
        let mut engine = engine(&config);
        let cancel = AtomicBool::new(true);
        let report = engine.run(&cancel, &mut NoProgress);
        assert_eq!(report.state, EngineState::Interrupted);
        assert_eq!(report.generations, 1);
        assert_eq!(report.top.len(), 5);
    }

    #[test]
    fn test_zero_generations_is_exhausted() {
        let mut config = small_config(7);
        config.evolution.generations = 0;
        let mut engine = engine(&config);
        let report = engine.run(&AtomicBool::new(false), &mut NoProgress);
        assert_eq!(report.state, EngineState::Exhausted);
        assert!(report.top.is_empty());
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let config = small_config(8);
        let first = engine(&config).run(&AtomicBool::new(false), &mut NoProgress);
        let second = engine(&config).run(&AtomicBool::new(false), &mut NoProgress);
        let codes = |r: &EvolutionReport| r.top.iter().map(|g| g.code.clone()).collect::<Vec<_>>();
        assert_eq!(codes(&first), codes(&second));
    }
}
