//! Epidemic Sim - headless runner
//!
//! Builds a configuration from an optional TOML file plus command-line
//! overrides, runs the epidemic until it dies out, and prints a summary or
//! the full time series as JSON.

use std::path::PathBuf;

use clap::Parser;
use epidemic_sim::core::config::HotspotConfig;
use epidemic_sim::{load_config, HealthCounts, Result, RunSummary, Simulation, SimulationConfig};
use serde::Serialize;

/// Agent-based epidemic simulation
#[derive(Parser, Debug)]
#[command(name = "epidemic-sim")]
#[command(about = "Simulate a contagion spreading through a moving population")]
struct Args {
    /// TOML file with simulation parameters (defaults for anything missing)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Population size
    #[arg(long, short = 'n')]
    population: Option<usize>,

    /// Part of the population infected at the start (for example 0.01)
    #[arg(long)]
    infected_fraction: Option<f64>,

    /// Infection probability per contact per tick
    #[arg(long)]
    infection_probability: Option<f64>,

    /// Death probability per tick while infected
    #[arg(long)]
    death_risk: Option<f64>,

    /// Engine vaccinations per tick (fractions spread one over several ticks)
    #[arg(long)]
    vaccination_rate: Option<f64>,

    /// Enable the hotspot agents occasionally teleport to
    #[arg(long)]
    hotspot: bool,

    /// Maximum ticks before giving up
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Log progress every N ticks (0 disables)
    #[arg(long)]
    report_every: Option<u64>,

    /// Print the recorded series and summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    config: &'a SimulationConfig,
    summary: &'a RunSummary,
    series: &'a [HealthCounts],
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("epidemic_sim=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;

    tracing::info!(
        "Starting run: {} agents, seed {}, infection probability {}",
        config.population_size,
        config.seed,
        config.infection_probability
    );

    let mut sim = Simulation::new(config)?;
    let summary = sim.run();

    if args.json {
        let output = JsonOutput {
            config: sim.config(),
            summary: &summary,
            series: sim.stats().series(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_summary(&summary);
    }

    Ok(())
}

fn build_config(args: &Args) -> Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => SimulationConfig::default(),
    };

    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(n) = args.population {
        config.population_size = n;
    }
    if let Some(fraction) = args.infected_fraction {
        config.initial_infected_fraction = fraction;
    }
    if let Some(p) = args.infection_probability {
        config.infection_probability = p;
    }
    if let Some(risk) = args.death_risk {
        config.death_risk_per_tick = risk;
    }
    if let Some(rate) = args.vaccination_rate {
        config.vaccination_rate = rate;
    }
    if args.hotspot && config.world.hotspot.is_none() {
        config.world.hotspot = Some(HotspotConfig::classic());
    }
    if let Some(max) = args.max_ticks {
        config.max_ticks = Some(max);
    }
    if let Some(every) = args.report_every {
        config.report_every = every;
    }

    config.validate()?;
    Ok(config)
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("=== EPIDEMIC SUMMARY ===");
    if summary.terminated {
        println!("Epidemic extinguished after {} ticks", summary.ticks);
    } else {
        println!("Stopped after {} ticks with infections ongoing", summary.ticks);
    }
    println!(
        "Peak infected: {} (tick {})",
        summary.peak_infected, summary.peak_tick
    );
    println!("Immunity: {:.0}%", summary.immunity * 100.0);
    match summary.latest_r0 {
        Some(r0) => println!("R_0: {:.2}", r0),
        None => println!("R_0: n/a"),
    }
    println!();
    print!("{}", summary.final_counts);
}
