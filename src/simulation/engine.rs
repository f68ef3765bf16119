//! Tick system - advances the epidemic one step
//!
//! Each tick runs, in order:
//! vaccination policy -> proximity scan -> infection resolution ->
//! agent motion/health -> transition bookkeeping -> grid reconciliation ->
//! R0 window upkeep.
//!
//! Uses rayon for the proximity scan once the susceptible pool is large.
//! Everything that consumes randomness stays sequential so a seed fully
//! determines the run.

use std::collections::VecDeque;

use ahash::AHashSet;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::{AgentId, SimRng, Tick};
use crate::entity::{HealthState, Transition};
use crate::simulation::population::Population;

/// What happened during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick number that was just processed
    pub tick: Tick,
    pub infected: u32,
    pub recovered: u32,
    pub died: u32,
    /// Vaccinations from both the policy and agents' own chance
    pub vaccinated: u32,
}

/// Secondary infections of one recovered agent, and how long ago it recovered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct R0Sample {
    value: u32,
    age: u32,
}

pub struct SimulationEngine {
    tick_counter: Tick,
    vaccination_rate: f64,
    infection_probability: f64,
    r0_window: VecDeque<R0Sample>,
    r0_horizon: u32,
    latest_r0: Option<f64>,
    parallel_threshold: usize,
    rng: SimRng,
}

impl SimulationEngine {
    /// Engine seeded from `config.seed`
    pub fn new(config: &SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            tick_counter: 0,
            vaccination_rate: config.vaccination_rate,
            infection_probability: config.infection_probability,
            r0_window: VecDeque::new(),
            r0_horizon: config.r0_horizon,
            latest_r0: None,
            parallel_threshold: config.parallel_threshold,
            rng: SimRng::seed_from_u64(config.seed),
        })
    }

    /// The run's random source, for seeding agents before the first tick
    pub fn rng_mut(&mut self) -> &mut SimRng {
        &mut self.rng
    }

    pub fn tick_counter(&self) -> Tick {
        self.tick_counter
    }

    /// Mean secondary infections of agents that recovered within the window
    ///
    /// Keeps the last value while the window is empty, `None` before the
    /// first recovery.
    pub fn latest_r0(&self) -> Option<f64> {
        self.latest_r0
    }

    /// Advance the population by one tick
    pub fn tick(&mut self, pop: &mut Population) -> TickReport {
        let mut report = TickReport {
            tick: self.tick_counter,
            ..Default::default()
        };

        report.vaccinated += self.constant_vaccination(pop);

        let contacts = self.proximity_scan(pop);
        report.infected = self.resolve_infections(pop, &contacts);

        let transitions = self.step_agents(pop);
        let mut departed = Vec::new();
        for &(id, transition) in &transitions {
            self.apply(pop, id, transition);
            match transition {
                Transition::Recovered => report.recovered += 1,
                Transition::Died => report.died += 1,
                Transition::Vaccinated => report.vaccinated += 1,
            }
            if transition.source() == HealthState::Infected {
                departed.push(id);
            }
        }

        pop.reconcile_grid(&departed);
        self.update_r0_window();
        self.tick_counter += 1;

        debug_assert!(
            pop.check_invariants().is_ok(),
            "tick {}: {:?}",
            report.tick,
            pop.check_invariants()
        );

        tracing::debug!(
            "Tick {}: +{} infected, {} recovered, {} died, {} vaccinated ({} still infected)",
            report.tick,
            report.infected,
            report.recovered,
            report.died,
            report.vaccinated,
            pop.counts().infected
        );

        report
    }

    /// Engine-driven vaccination, applied before anyone can be infected
    fn constant_vaccination(&mut self, pop: &mut Population) -> u32 {
        if self.vaccination_rate == 0.0 {
            return 0;
        }

        let quota = if self.vaccination_rate >= 1.0 {
            self.vaccination_rate.floor() as u32
        } else {
            let period = ((1.0 / self.vaccination_rate).round() as u64).max(1);
            u32::from(self.tick_counter % period == 0)
        };

        let mut done = 0;
        for _ in 0..quota {
            let pool = pop.susceptible();
            if pool.is_empty() {
                break;
            }
            let id = pool[self.rng.gen_range(0..pool.len())];
            self.vaccinate(pop, id);
            done += 1;
        }
        done
    }

    /// `(susceptible, infectious)` pairs closer than the interaction radius
    ///
    /// The grid only holds infected agents, so each hit is a real contact.
    /// Pair order follows the susceptible partition either way.
    fn proximity_scan(&self, pop: &Population) -> Vec<(AgentId, AgentId)> {
        let grid = pop.grid();
        let agents = pop.agents();
        let radius = pop.interaction_radius();
        let susceptible = pop.susceptible();

        if grid.is_empty() {
            return Vec::new();
        }

        let contacts_of = |&s: &AgentId| {
            grid.neighbors_within(agents[s.index()].position(), radius, agents)
                .into_iter()
                .map(move |i| (s, i))
        };

        if susceptible.len() >= self.parallel_threshold {
            // PARALLEL: read-only; collect keeps input order
            susceptible.par_iter().flat_map_iter(contacts_of).collect()
        } else {
            susceptible.iter().flat_map(contacts_of).collect()
        }
    }

    /// Roll each contact; a susceptible agent is infected at most once
    fn resolve_infections(&mut self, pop: &mut Population, contacts: &[(AgentId, AgentId)]) -> u32 {
        let mut infected_this_tick = AHashSet::new();
        for &(target, source) in contacts {
            if infected_this_tick.contains(&target) {
                continue;
            }
            if self.rng.gen::<f64>() < self.infection_probability {
                infected_this_tick.insert(target);
                self.infect(pop, target);
                pop.agent_mut(source).record_secondary_infection();
            }
        }
        infected_this_tick.len() as u32
    }

    fn step_agents(&mut self, pop: &mut Population) -> Vec<(AgentId, Transition)> {
        let (world, agents) = pop.world_and_agents_mut();
        let rng = &mut self.rng;
        agents
            .iter_mut()
            .enumerate()
            .filter_map(|(i, agent)| agent.step(world, &mut *rng).map(|t| (AgentId(i as u32), t)))
            .collect()
    }

    fn infect(&mut self, pop: &mut Population, id: AgentId) {
        pop.apply_transition(id, HealthState::Susceptible, HealthState::Infected);
        // Queryable right away; reconciliation re-files it at tick end
        pop.grid_insert(id);
    }

    /// Book a transition reported by `Agent::step`
    ///
    /// A recovery also closes the agent's secondary-infection tally into
    /// the R0 window.
    fn apply(&mut self, pop: &mut Population, id: AgentId, transition: Transition) {
        pop.apply_transition(id, transition.source(), transition.target());
        if transition == Transition::Recovered {
            let value = pop.agent_mut(id).take_secondary_infections();
            self.r0_window.push_back(R0Sample { value, age: 0 });
        }
    }

    fn vaccinate(&mut self, pop: &mut Population, id: AgentId) {
        pop.apply_transition(id, HealthState::Susceptible, HealthState::Vaccinated);
    }

    fn update_r0_window(&mut self) {
        for sample in self.r0_window.iter_mut() {
            sample.age += 1;
        }
        let horizon = self.r0_horizon;
        self.r0_window.retain(|s| s.age <= horizon);

        if !self.r0_window.is_empty() {
            let total: u64 = self.r0_window.iter().map(|s| s.value as u64).sum();
            self.latest_r0 = Some(total as f64 / self.r0_window.len() as f64);
        }
    }
}
