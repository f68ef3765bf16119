//! Agent motion and health state machine

use rand::Rng;

use crate::core::types::Vec2;
use crate::entity::health::{HealthState, Transition};
use crate::world::World;

/// Grid cell coordinates `(column, row)`
pub type CellCoord = (usize, usize);

/// Timing of hotspot trips
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeleportSchedule {
    pub chance: f64,
    pub cooldown: u32,
    pub back_cooldown: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeleportPhase {
    AtLarge,
    Teleported,
}

/// Per-agent parameters fixed at creation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentTraits {
    pub speed: f64,
    pub angular_volatility: f64,
    /// Infection age (ticks) at which the agent recovers
    pub recovery_threshold: f64,
    pub death_risk_per_tick: f64,
    pub vaccination_chance_per_tick: f64,
    /// `None` for agents that never visit the hotspot
    pub teleport: Option<TeleportSchedule>,
}

#[derive(Debug, Clone)]
struct TeleportState {
    schedule: TeleportSchedule,
    phase: TeleportPhase,
    ticks_in_phase: u32,
    origin_before_teleport: Vec2,
}

/// One simulated individual
#[derive(Debug, Clone)]
pub struct Agent {
    position: Vec2,
    /// Radians
    heading: f64,
    speed: f64,
    angular_volatility: f64,
    health: HealthState,
    infection_age: u32,
    recovery_threshold: f64,
    death_risk_per_tick: f64,
    vaccination_chance_per_tick: f64,
    secondary_infections: u32,
    teleport: Option<TeleportState>,
    /// Cell recorded by the spatial grid on insertion, `None` when absent
    pub(crate) grid_cell: Option<CellCoord>,
}

impl Agent {
    pub fn new(position: Vec2, heading: f64, health: HealthState, traits: &AgentTraits) -> Self {
        Self {
            position,
            heading,
            speed: traits.speed,
            angular_volatility: traits.angular_volatility,
            health,
            infection_age: 0,
            recovery_threshold: traits.recovery_threshold.max(1.0),
            death_risk_per_tick: traits.death_risk_per_tick,
            vaccination_chance_per_tick: traits.vaccination_chance_per_tick,
            secondary_infections: 0,
            teleport: traits.teleport.map(|schedule| TeleportState {
                schedule,
                phase: TeleportPhase::AtLarge,
                ticks_in_phase: 0,
                origin_before_teleport: position,
            }),
            grid_cell: None,
        }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    #[inline]
    pub fn heading(&self) -> f64 {
        self.heading
    }

    #[inline]
    pub fn health(&self) -> HealthState {
        self.health
    }

    pub fn infection_age(&self) -> u32 {
        self.infection_age
    }

    pub fn recovery_threshold(&self) -> f64 {
        self.recovery_threshold
    }

    pub fn secondary_infections(&self) -> u32 {
        self.secondary_infections
    }

    pub fn teleport_phase(&self) -> Option<TeleportPhase> {
        self.teleport.as_ref().map(|t| t.phase)
    }

    pub fn grid_cell(&self) -> Option<CellCoord> {
        self.grid_cell
    }

    #[cfg(test)]
    pub(crate) fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub(crate) fn set_health(&mut self, health: HealthState) {
        debug_assert!(
            self.health == health || self.health.can_become(health),
            "illegal transition {} -> {}",
            self.health,
            health
        );
        self.health = health;
    }

    pub(crate) fn record_secondary_infection(&mut self) {
        self.secondary_infections += 1;
    }

    /// Hand over the secondary-infection tally and reset it
    pub(crate) fn take_secondary_infections(&mut self) -> u32 {
        std::mem::take(&mut self.secondary_infections)
    }

    /// Advance motion and health by one tick
    ///
    /// Dead agents do not move. Returns the terminal transition taken this
    /// tick, if any; the agent's own health is already updated.
    pub fn step<R: Rng + ?Sized>(&mut self, world: &World, rng: &mut R) -> Option<Transition> {
        if self.health == HealthState::Dead {
            return None;
        }

        self.step_teleport(world, rng);
        self.advance(world);
        self.perturb_heading(rng);

        match self.health {
            HealthState::Infected => {
                self.infection_age += 1;
                if rng.gen::<f64>() < self.death_risk_per_tick {
                    self.health = HealthState::Dead;
                    Some(Transition::Died)
                } else if self.infection_age as f64 >= self.recovery_threshold {
                    self.health = HealthState::Recovered;
                    Some(Transition::Recovered)
                } else {
                    None
                }
            }
            HealthState::Susceptible => {
                if rng.gen::<f64>() < self.vaccination_chance_per_tick {
                    self.health = HealthState::Vaccinated;
                    Some(Transition::Vaccinated)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn step_teleport<R: Rng + ?Sized>(&mut self, world: &World, rng: &mut R) {
        let (Some(state), Some(hotspot)) = (self.teleport.as_mut(), world.hotspot()) else {
            return;
        };

        match state.phase {
            TeleportPhase::AtLarge => {
                // The chance is rolled every tick, cooldown or not
                let roll = rng.gen::<f64>();
                if roll < state.schedule.chance && state.ticks_in_phase >= state.schedule.cooldown {
                    state.origin_before_teleport = self.position;
                    self.position = hotspot.sample_point(rng);
                    state.ticks_in_phase = 0;
                    state.phase = TeleportPhase::Teleported;
                } else {
                    state.ticks_in_phase += 1;
                }
            }
            TeleportPhase::Teleported => {
                if state.ticks_in_phase >= state.schedule.back_cooldown {
                    self.position = state.origin_before_teleport;
                    state.ticks_in_phase = 0;
                    state.phase = TeleportPhase::AtLarge;
                } else {
                    state.ticks_in_phase += 1;
                }
            }
        }
    }

    /// Step forward and bounce off the walls
    fn advance(&mut self, world: &World) {
        self.position = self.position + Vec2::from_angle(self.heading) * self.speed;

        let (w, h) = (world.width(), world.height());
        let outside = self.position.x < 0.0
            || self.position.x > w
            || self.position.y < 0.0
            || self.position.y > h;
        if outside {
            self.heading += std::f64::consts::PI;
            self.position.x = self.position.x.clamp(0.0, w);
            self.position.y = self.position.y.clamp(0.0, h);
        }
    }

    fn perturb_heading<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        self.heading += sign * rng.gen::<f64>() * self.angular_volatility;
    }
}
