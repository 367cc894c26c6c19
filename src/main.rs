use anyhow::{Context, Result};
use clap::Parser;
use stackgp::config::{AppConfig, ConfigManager};
use stackgp::engines::generation::{ConsoleProgressCallback, EngineState, EvolutionEngine};
use stackgp::machine::InstructionRegistry;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Evolve a stack machine program that leaves a target value on top of the stack.
#[derive(Parser, Debug)]
#[command(name = "stackgp", version)]
struct Cli {
    /// TOML config file (STACKGP__SECTION__KEY env vars override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of genomes per generation
    #[arg(long)]
    population: Option<usize>,

    /// Generation cap
    #[arg(long)]
    generations: Option<usize>,

    /// Machine steps per evaluation
    #[arg(long)]
    steps: Option<usize>,

    /// Maximum length of initial genomes
    #[arg(long)]
    max_code_length: Option<usize>,

    /// Survivors kept for breeding
    #[arg(long)]
    keep_top: Option<usize>,

    /// Per-genome mutation probability
    #[arg(long)]
    mutation_rate: Option<f64>,

    /// Value to leave on top of the stack
    #[arg(long)]
    target: Option<i64>,

    #[arg(long)]
    seed: Option<u64>,

    /// Evaluate genomes in parallel
    #[arg(long)]
    parallel: bool,

    /// Print the final report as JSON instead of the best-10 listing
    #[arg(long)]
    json: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        let evolution = &mut config.evolution;
        if let Some(v) = self.population {
            evolution.population_size = v;
        }
        if let Some(v) = self.generations {
            evolution.generations = v;
        }
        if let Some(v) = self.steps {
            evolution.step_budget = v;
        }
        if let Some(v) = self.keep_top {
            evolution.keep_top = v;
        }
        if let Some(v) = self.mutation_rate {
            evolution.mutation_rate = v;
        }
        if self.seed.is_some() {
            evolution.seed = self.seed;
        }
        if self.parallel {
            evolution.parallel = true;
        }
        if let Some(v) = self.max_code_length {
            config.generator.max_code_length = v;
        }
        if let Some(v) = self.target {
            config.fitness.target = v;
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let manager = ConfigManager::new();
    manager
        .load(cli.config.as_deref())
        .context("Failed to load configuration")?;
    manager
        .update(|config| cli.apply(config))
        .context("Invalid command line parameters")?;

    if cli.print_config {
        print!("{}", manager.to_toml()?);
        return Ok(());
    }

    let config = manager.get();
    let registry = Arc::new(InstructionRegistry::new());
    let mut engine = EvolutionEngine::new(registry, &config)?;

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("Failed to install Ctrl-C handler")?;

    println!(
        "Using GP to create a program that puts {} on the ToS.",
        config.fitness.target
    );

    let report = engine.run(&cancel, &mut ConsoleProgressCallback);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match report.state {
        EngineState::Converged => println!(
            "Stopping because avg<={} and avglen<{}.",
            config.fitness.convergence_epsilon, config.fitness.convergence_code_length
        ),
        EngineState::Interrupted => {
            println!("Interrupted after {} generations.", report.generations)
        }
        _ => {}
    }

    println!("Best 10:");
    for ranked in report.top.iter().take(10) {
        let tos = ranked
            .top
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "None".to_string());
        println!(
            "fitness={:.6} tos={} slen={} len={} code: {}",
            ranked.score.distance,
            tos,
            ranked.score.stack_depth,
            ranked.score.code_length,
            ranked.code
        );
    }

    Ok(())
}
