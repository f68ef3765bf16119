//! Simulation configuration with documented constants
//!
//! Every tunable of a run lives here and is passed explicitly into
//! `Population` and `SimulationEngine` construction. Nothing is read from
//! process-wide state.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};

/// Configuration for a simulation run
///
/// `Default` reproduces the classic 600x400 area with 2000 people.
/// Any subset of fields may be overridden from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for the run's single random source
    pub seed: u64,

    // === POPULATION ===
    /// Number of agents created at construction
    pub population_size: usize,

    /// Share of the population infected at tick 0
    ///
    /// At least one agent always starts infected: the initial count is
    /// `ceil(max(1, n * fraction))`.
    pub initial_infected_fraction: f64,

    // === WORLD ===
    pub world: WorldConfig,

    // === MOTION ===
    /// Contact distance before density scaling
    ///
    /// The effective interaction radius is this value divided by
    /// `sqrt(population_size)`, which keeps the expected number of
    /// contacts per agent roughly constant across population sizes.
    /// It is also the spatial grid's cell size.
    pub base_interaction_distance: f64,

    /// Per-tick step length before density scaling (same scaling as above)
    pub base_speed: f64,

    /// Maximum heading change per tick (radians)
    pub angular_volatility: f64,

    // === DISEASE ===
    /// Chance that one infectious contact infects a susceptible agent in a tick
    pub infection_probability: f64,

    /// Chance per tick that an infected agent dies
    pub death_risk_per_tick: f64,

    /// Chance per tick that a susceptible agent gets vaccinated on its own
    pub vaccination_chance_per_tick: f64,

    /// Engine-driven vaccination policy
    ///
    /// 0 disables it. At 1 or above, `floor(rate)` random susceptible
    /// agents are vaccinated every tick. Below 1, one agent is vaccinated
    /// every `round(1 / rate)` ticks.
    pub vaccination_rate: f64,

    /// Distribution of infection length in ticks
    pub recovery: RecoveryConfig,

    /// Hotspot trip timing, only used when the world has a hotspot
    pub teleport: TeleportConfig,

    // === STATISTICS ===
    /// Number of ticks a recovered agent's secondary-infection count
    /// stays in the R0 window
    pub r0_horizon: u32,

    /// The epidemic counts as extinguished once infected <= this floor
    pub infected_floor: u32,

    // === DRIVER ===
    /// Hard stop for the driving loop, `None` runs until extinction
    pub max_ticks: Option<u64>,

    /// Log a progress snapshot every this many ticks (0 disables)
    pub report_every: u64,

    // === PARALLELIZATION ===
    /// Minimum susceptible count before the proximity scan runs on rayon
    ///
    /// Below this, thread overhead exceeds the benefit.
    pub parallel_threshold: usize,
}

/// Bounds of the simulated area plus the optional hotspot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub width: f64,
    pub height: f64,
    pub hotspot: Option<HotspotConfig>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HotspotConfig {
    pub center: [f64; 2],
    pub radius: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub mean: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TeleportConfig {
    /// Chance per tick of leaving for the hotspot once the cooldown is over
    pub chance: f64,
    /// Ticks an agent must spend at large before it may teleport
    pub cooldown: u32,
    /// Ticks an agent stays at the hotspot before returning
    pub back_cooldown: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            population_size: 2000,
            initial_infected_fraction: 0.005,
            world: WorldConfig::default(),
            base_interaction_distance: 350.0,
            base_speed: 14.0,
            angular_volatility: std::f64::consts::PI / 15.0,
            infection_probability: 0.005,
            death_risk_per_tick: 0.00005,
            vaccination_chance_per_tick: 0.001,
            vaccination_rate: 0.0,
            recovery: RecoveryConfig::default(),
            teleport: TeleportConfig::default(),
            r0_horizon: 50,
            infected_floor: 0,
            max_ticks: None,
            report_every: 150,
            parallel_threshold: 1000,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 400.0,
            hotspot: None,
        }
    }
}

impl HotspotConfig {
    /// The supermarket used by the classic scenario
    pub fn classic() -> Self {
        Self {
            center: [200.0, 200.0],
            radius: 50.0,
        }
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            mean: 300.0,
            std_dev: 50.0,
        }
    }
}

impl Default for TeleportConfig {
    fn default() -> Self {
        Self {
            chance: 0.01,
            cooldown: 15,
            back_cooldown: 15,
        }
    }
}

/// Upper bound on spatial grid cells, about 400 MB of empty buckets
pub const MAX_GRID_CELLS: f64 = (1u64 << 24) as f64;

impl SimulationConfig {
    /// Contact distance after density scaling, also the grid cell size
    pub fn interaction_radius(&self) -> f64 {
        self.base_interaction_distance / (self.population_size.max(1) as f64).sqrt()
    }

    /// Step length after density scaling
    pub fn per_agent_speed(&self) -> f64 {
        self.base_speed / (self.population_size.max(1) as f64).sqrt()
    }

    /// Number of agents that start infected
    pub fn initial_infected_count(&self) -> usize {
        let wanted = (self.population_size as f64 * self.initial_infected_fraction).max(1.0);
        (wanted.ceil() as usize).min(self.population_size)
    }

    /// Reject out-of-range parameters before anything is built
    pub fn validate(&self) -> Result<()> {
        if self.population_size == 0 {
            return Err(config_error("population_size must be at least 1"));
        }

        positive("world.width", self.world.width)?;
        positive("world.height", self.world.height)?;
        positive("base_interaction_distance", self.base_interaction_distance)?;
        positive("base_speed", self.base_speed)?;

        if !(self.initial_infected_fraction > 0.0 && self.initial_infected_fraction <= 1.0) {
            return Err(config_error(format!(
                "initial_infected_fraction ({}) must be in (0, 1]",
                self.initial_infected_fraction
            )));
        }

        probability("infection_probability", self.infection_probability)?;
        probability("death_risk_per_tick", self.death_risk_per_tick)?;
        probability("vaccination_chance_per_tick", self.vaccination_chance_per_tick)?;
        probability("teleport.chance", self.teleport.chance)?;

        if !(self.vaccination_rate >= 0.0 && self.vaccination_rate.is_finite()) {
            return Err(config_error(format!(
                "vaccination_rate ({}) must be a finite value >= 0",
                self.vaccination_rate
            )));
        }

        if !(self.angular_volatility >= 0.0 && self.angular_volatility.is_finite()) {
            return Err(config_error("angular_volatility must be a finite value >= 0"));
        }

        positive("recovery.mean", self.recovery.mean)?;
        if !(self.recovery.std_dev >= 0.0 && self.recovery.std_dev.is_finite()) {
            return Err(config_error("recovery.std_dev must be a finite value >= 0"));
        }

        let radius = self.interaction_radius();
        let cells = (self.world.width / radius).ceil() * (self.world.height / radius).ceil();
        if cells > MAX_GRID_CELLS {
            return Err(config_error(format!(
                "{}x{} world needs {:e} grid cells at interaction radius {}, limit is {:e}",
                self.world.width, self.world.height, cells, radius, MAX_GRID_CELLS
            )));
        }

        if self.r0_horizon == 0 {
            return Err(config_error("r0_horizon must be at least 1"));
        }

        if let Some(hotspot) = &self.world.hotspot {
            positive("world.hotspot.radius", hotspot.radius)?;
            let [x, y] = hotspot.center;
            if !(0.0..=self.world.width).contains(&x) || !(0.0..=self.world.height).contains(&y) {
                return Err(config_error(format!(
                    "hotspot center ({}, {}) lies outside the {}x{} world",
                    x, y, self.world.width, self.world.height
                )));
            }
        }

        Ok(())
    }
}

/// Load and validate a config from a TOML file
pub fn load_config(path: &Path) -> Result<SimulationConfig> {
    let contents = fs::read_to_string(path)?;
    let config: SimulationConfig = toml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

fn config_error(msg: impl Into<String>) -> SimError {
    SimError::Configuration(msg.into())
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(config_error(format!("{} ({}) must be > 0", name, value)))
    }
}

fn probability(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(config_error(format!("{} ({}) must be in [0, 1]", name, value)))
    }
}
