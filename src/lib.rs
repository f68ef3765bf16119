//! Epidemic Sim - agent-based contagion over a bounded 2-D area
//!
//! Mobile agents wander a rectangular world; infected ones expose
//! susceptible neighbours within an interaction radius. The engine turns
//! proximity into infections, advances recovery, death and vaccination, and
//! records a per-tick time series of the health counters.

pub mod core;
pub mod entity;
pub mod simulation;
pub mod spatial;
pub mod world;

pub use crate::core::{load_config, AgentId, Result, SimError, SimulationConfig, Vec2};
pub use crate::entity::{HealthCounts, HealthState};
pub use crate::simulation::{Population, RunSummary, Simulation, SimulationEngine, StatsRecorder};
