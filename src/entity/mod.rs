//! Simulated individuals and their health vocabulary

pub mod agent;
pub mod health;

pub use agent::{Agent, AgentTraits, TeleportPhase, TeleportSchedule};
pub use health::{HealthCounts, HealthState, Transition};
