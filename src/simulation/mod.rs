//! Epidemic engine: population bookkeeping, the tick, statistics and the
//! driving loop

pub mod engine;
pub mod population;
pub mod runner;
pub mod stats;

pub use engine::{SimulationEngine, TickReport};
pub use population::{AgentView, Partition, Population};
pub use runner::{RunSummary, Simulation};
pub use stats::StatsRecorder;
