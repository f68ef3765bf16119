//! Driving loop: tick, record, repeat until the epidemic dies out

use serde::Serialize;

use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::{AgentId, Tick, Vec2};
use crate::entity::{HealthCounts, HealthState};
use crate::simulation::engine::{SimulationEngine, TickReport};
use crate::simulation::population::{AgentView, Population};
use crate::simulation::stats::StatsRecorder;

/// Outcome of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub ticks: Tick,
    pub final_counts: HealthCounts,
    pub peak_infected: u32,
    pub peak_tick: Tick,
    pub immunity: f64,
    pub latest_r0: Option<f64>,
    /// False when `max_ticks` stopped the run first
    pub terminated: bool,
}

/// Population, engine and recorder wired together for one run
pub struct Simulation {
    config: SimulationConfig,
    population: Population,
    engine: SimulationEngine,
    stats: StatsRecorder,
}

impl Simulation {
    /// Validate the config and seed the population from `config.seed`
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let mut engine = SimulationEngine::new(&config)?;
        let population = Population::new(&config, engine.rng_mut())?;
        Ok(Self::from_parts(config, population, engine))
    }

    /// Run over a hand-built population
    pub fn from_parts(
        config: SimulationConfig,
        population: Population,
        engine: SimulationEngine,
    ) -> Self {
        let stats = StatsRecorder::new(config.infected_floor);
        Self {
            config,
            population,
            engine,
            stats,
        }
    }

    /// One tick followed by one recorded snapshot
    pub fn step(&mut self) -> TickReport {
        let report = self.engine.tick(&mut self.population);
        self.stats.record(&self.population);

        let every = self.config.report_every;
        if every > 0 && self.engine.tick_counter() % every == 0 {
            tracing::info!(
                "Tick {}: {}",
                self.engine.tick_counter(),
                summary_line(&self.population.counts())
            );
        }
        report
    }

    /// Step until the recorder reports termination or `max_ticks` is hit
    pub fn run(&mut self) -> RunSummary {
        while !self.is_finished() {
            self.step();
        }
        let summary = self.summary();
        tracing::info!(
            "Run finished after {} ticks: {}",
            summary.ticks,
            summary_line(&summary.final_counts)
        );
        summary
    }

    pub fn is_finished(&self) -> bool {
        self.stats.is_terminated()
            || self
                .config
                .max_ticks
                .is_some_and(|max| self.engine.tick_counter() >= max)
    }

    pub fn summary(&self) -> RunSummary {
        let final_counts = self.population.counts();
        let (peak_tick, peak_infected) = self
            .stats
            .peak_infected()
            .map(|(i, v)| (i as Tick + 1, v))
            .unwrap_or((0, final_counts.infected));
        RunSummary {
            ticks: self.engine.tick_counter(),
            final_counts,
            peak_infected,
            peak_tick,
            immunity: final_counts.immunity(),
            latest_r0: self.engine.latest_r0(),
            terminated: self.stats.is_terminated(),
        }
    }

    /// Drop a new agent into the running simulation
    pub fn add_agent(&mut self, position: Vec2, health: HealthState) -> Result<AgentId> {
        self.population
            .add_agent(position, health, self.engine.rng_mut())
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn engine(&self) -> &SimulationEngine {
        &self.engine
    }

    pub fn stats(&self) -> &StatsRecorder {
        &self.stats
    }

    pub fn counts(&self) -> HealthCounts {
        self.population.counts()
    }

    pub fn agents_snapshot(&self) -> Vec<AgentView> {
        self.population.agents_snapshot()
    }

    pub fn latest_r0(&self) -> Option<f64> {
        self.engine.latest_r0()
    }
}

fn summary_line(counts: &HealthCounts) -> String {
    counts
        .iter()
        .map(|(state, n)| format!("{}={}", state, n))
        .collect::<Vec<_>>()
        .join(" ")
}
