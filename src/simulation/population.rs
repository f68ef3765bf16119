//! Agent arena with partition sets, per-state counters and the infected grid
//!
//! Every agent belongs to exactly one partition (susceptible, infected or
//! removed). The partition an agent sits in, the per-state counters and the
//! spatial grid are only ever changed together, through `place` and
//! `apply_transition`, so they cannot drift apart.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;

use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{AgentId, Vec2};
use crate::entity::{Agent, AgentTraits, HealthCounts, HealthState, TeleportSchedule};
use crate::spatial::SpatialGrid;
use crate::world::World;

/// Disjoint index sets of the population
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Susceptible = 0,
    Infected = 1,
    /// Recovered, dead or vaccinated
    Removed = 2,
}

impl Partition {
    pub fn of(state: HealthState) -> Self {
        match state {
            HealthState::Susceptible => Partition::Susceptible,
            HealthState::Infected => Partition::Infected,
            HealthState::Recovered | HealthState::Dead | HealthState::Vaccinated => {
                Partition::Removed
            }
        }
    }
}

/// What a renderer needs to draw one agent
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AgentView {
    pub id: AgentId,
    pub position: Vec2,
    pub health: HealthState,
}

pub struct Population {
    world: World,
    agents: Vec<Agent>,
    grid: SpatialGrid,
    partitions: [Vec<AgentId>; 3],
    /// Position of each agent inside its current partition vector
    slots: Vec<usize>,
    counts: HealthCounts,

    interaction_radius: f64,
    per_agent_speed: f64,
    angular_volatility: f64,
    death_risk_per_tick: f64,
    vaccination_chance_per_tick: f64,
    recovery: Normal<f64>,
    teleport: Option<TeleportSchedule>,
}

impl Population {
    /// Population with no agents yet
    ///
    /// Density-scaled constants are still derived from
    /// `config.population_size`, so agents added later behave exactly as
    /// those of a fully seeded population of that size.
    pub fn empty(config: &SimulationConfig) -> Result<Self> {
        config.validate()?;

        let world = World::from_config(&config.world);
        let interaction_radius = config.interaction_radius();
        let grid = SpatialGrid::new(world.width(), world.height(), interaction_radius);
        let recovery = Normal::new(config.recovery.mean, config.recovery.std_dev)
            .map_err(|e| SimError::Configuration(format!("recovery distribution: {}", e)))?;
        let teleport = world.hotspot().map(|_| TeleportSchedule {
            chance: config.teleport.chance,
            cooldown: config.teleport.cooldown,
            back_cooldown: config.teleport.back_cooldown,
        });

        Ok(Self {
            world,
            agents: Vec::with_capacity(config.population_size),
            grid,
            partitions: [Vec::new(), Vec::new(), Vec::new()],
            slots: Vec::with_capacity(config.population_size),
            counts: HealthCounts::default(),
            interaction_radius,
            per_agent_speed: config.per_agent_speed(),
            angular_volatility: config.angular_volatility,
            death_risk_per_tick: config.death_risk_per_tick,
            vaccination_chance_per_tick: config.vaccination_chance_per_tick,
            recovery,
            teleport,
        })
    }

    /// Seed `population_size` agents at uniformly random positions
    ///
    /// `initial_infected_count()` of them start infected, the rest
    /// susceptible.
    pub fn new<R: Rng + ?Sized>(config: &SimulationConfig, rng: &mut R) -> Result<Self> {
        let mut population = Self::empty(config)?;
        let infected = config.initial_infected_count();

        for i in 0..config.population_size {
            let health = if i < config.population_size - infected {
                HealthState::Susceptible
            } else {
                HealthState::Infected
            };
            let position = population.world.sample_point(rng);
            population.add_agent(position, health, rng)?;
        }

        tracing::info!(
            "Seeded {} agents ({} infected), interaction radius {:.2}, grid {:?}",
            population.len(),
            infected,
            population.interaction_radius,
            population.grid.dimensions()
        );

        Ok(population)
    }

    /// Draw the private parameters of a new agent
    pub fn sample_traits<R: Rng + ?Sized>(&self, rng: &mut R) -> AgentTraits {
        AgentTraits {
            speed: self.per_agent_speed,
            angular_volatility: self.angular_volatility,
            recovery_threshold: self.recovery.sample(rng).max(1.0),
            death_risk_per_tick: self.death_risk_per_tick,
            vaccination_chance_per_tick: self.vaccination_chance_per_tick,
            teleport: self.teleport,
        }
    }

    /// Insert one new agent into the live simulation
    pub fn add_agent<R: Rng + ?Sized>(
        &mut self,
        position: Vec2,
        health: HealthState,
        rng: &mut R,
    ) -> Result<AgentId> {
        let heading = rng.gen::<f64>() * std::f64::consts::TAU;
        let traits = self.sample_traits(rng);
        self.add_agent_with_traits(position, heading, health, traits)
    }

    /// Insert an agent with explicit parameters
    ///
    /// Agents start either susceptible or infected and must be placed
    /// inside the world.
    pub fn add_agent_with_traits(
        &mut self,
        position: Vec2,
        heading: f64,
        health: HealthState,
        traits: AgentTraits,
    ) -> Result<AgentId> {
        if !matches!(health, HealthState::Susceptible | HealthState::Infected) {
            return Err(SimError::InvalidInitialHealth(health));
        }
        if !self.world.contains(position) {
            return Err(SimError::OutsideWorld {
                x: position.x,
                y: position.y,
            });
        }

        let id = AgentId(self.agents.len() as u32);
        self.agents.push(Agent::new(position, heading, health, &traits));
        self.slots.push(0);
        self.place(id);
        tracing::trace!("Added {:?} as {} at ({:.1}, {:.1})", id, health, position.x, position.y);
        Ok(id)
    }

    /// Register a freshly pushed agent in its partition, the counters and,
    /// when infected, the grid
    fn place(&mut self, id: AgentId) {
        let health = self.agents[id.index()].health();
        self.push_into(Partition::of(health), id);
        self.counts.increment(health);
        if health == HealthState::Infected {
            self.grid.insert(id, &mut self.agents[id.index()]);
        }
    }

    fn push_into(&mut self, partition: Partition, id: AgentId) {
        let members = &mut self.partitions[partition as usize];
        self.slots[id.index()] = members.len();
        members.push(id);
    }

    fn take_from(&mut self, partition: Partition, id: AgentId) {
        let slot = self.slots[id.index()];
        let members = &mut self.partitions[partition as usize];
        debug_assert_eq!(members.get(slot), Some(&id), "{:?} not in {:?}", id, partition);
        members.swap_remove(slot);
        if let Some(&moved) = members.get(slot) {
            self.slots[moved.index()] = slot;
        }
    }

    /// Move an agent between states, keeping partitions and counters in step
    ///
    /// The agent may already carry `to` (it changes its own health during
    /// `Agent::step`); `from` is the state it is accounted under. Grid
    /// membership is handled separately by the caller.
    pub(crate) fn apply_transition(&mut self, id: AgentId, from: HealthState, to: HealthState) {
        debug_assert!(from.can_become(to), "illegal transition {} -> {}", from, to);
        self.counts.shift(from, to);

        let (src, dst) = (Partition::of(from), Partition::of(to));
        if src != dst {
            self.take_from(src, id);
            self.push_into(dst, id);
        }

        self.agents[id.index()].set_health(to);
        tracing::trace!("{:?}: {} -> {}", id, from, to);
    }

    pub(crate) fn grid_insert(&mut self, id: AgentId) {
        self.grid.insert(id, &mut self.agents[id.index()]);
    }

    /// Re-file every infected agent plus `departed` (agents that left the
    /// infected state this tick) under their current cell
    ///
    /// Newly infected agents stay in, recovered and dead ones drop out.
    pub(crate) fn reconcile_grid(&mut self, departed: &[AgentId]) {
        let infected = &self.partitions[Partition::Infected as usize];
        for &id in infected.iter().chain(departed) {
            self.grid
                .reinsert_if_still_infected(id, &mut self.agents[id.index()]);
        }
    }

    pub(crate) fn world_and_agents_mut(&mut self) -> (&World, &mut [Agent]) {
        (&self.world, &mut self.agents)
    }

    pub(crate) fn agent_mut(&mut self, id: AgentId) -> &mut Agent {
        &mut self.agents[id.index()]
    }

    #[inline]
    pub fn counts(&self) -> HealthCounts {
        self.counts
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Result<&Agent> {
        self.agents.get(id.index()).ok_or(SimError::UnknownAgent(id))
    }

    pub fn partition(&self, partition: Partition) -> &[AgentId] {
        &self.partitions[partition as usize]
    }

    pub fn susceptible(&self) -> &[AgentId] {
        self.partition(Partition::Susceptible)
    }

    pub fn infected(&self) -> &[AgentId] {
        self.partition(Partition::Infected)
    }

    pub fn removed(&self) -> &[AgentId] {
        self.partition(Partition::Removed)
    }

    #[inline]
    pub fn interaction_radius(&self) -> f64 {
        self.interaction_radius
    }

    #[inline]
    pub fn per_agent_speed(&self) -> f64 {
        self.per_agent_speed
    }

    /// Position and health of every agent, in id order
    pub fn agents_snapshot(&self) -> Vec<AgentView> {
        self.agents
            .iter()
            .enumerate()
            .map(|(i, agent)| AgentView {
                id: AgentId(i as u32),
                position: agent.position(),
                health: agent.health(),
            })
            .collect()
    }

    /// Verify partitions, counters and grid agree with agent health
    pub fn check_invariants(&self) -> Result<()> {
        let fail = |msg: String| Err(SimError::InvariantViolation(msg));

        if self.counts.total() as usize != self.agents.len() {
            return fail(format!(
                "counts sum to {} but there are {} agents",
                self.counts.total(),
                self.agents.len()
            ));
        }

        let partitioned: usize = self.partitions.iter().map(Vec::len).sum();
        if partitioned != self.agents.len() {
            return fail(format!(
                "partitions hold {} ids for {} agents",
                partitioned,
                self.agents.len()
            ));
        }

        let c = self.counts;
        let expected = [
            (Partition::Susceptible, c.susceptible),
            (Partition::Infected, c.infected),
            (Partition::Removed, c.recovered + c.dead + c.vaccinated),
        ];
        for (partition, count) in expected {
            if self.partition(partition).len() != count as usize {
                return fail(format!(
                    "{:?} holds {} ids but counters say {}",
                    partition,
                    self.partition(partition).len(),
                    count
                ));
            }
        }

        for (partition, members) in [
            Partition::Susceptible,
            Partition::Infected,
            Partition::Removed,
        ]
        .into_iter()
        .map(|p| (p, self.partition(p)))
        {
            for (slot, &id) in members.iter().enumerate() {
                let agent = &self.agents[id.index()];
                if Partition::of(agent.health()) != partition {
                    return fail(format!("{:?} is {} but filed under {:?}", id, agent.health(), partition));
                }
                if self.slots[id.index()] != slot {
                    return fail(format!("{:?} has a stale partition slot", id));
                }
            }
        }

        if self.grid.len() != c.infected as usize {
            return fail(format!(
                "grid holds {} agents but {} are infected",
                self.grid.len(),
                c.infected
            ));
        }
        for (i, agent) in self.agents.iter().enumerate() {
            let id = AgentId(i as u32);
            let infected = agent.health() == HealthState::Infected;
            if infected != self.grid.contains(id, agent) {
                return fail(format!(
                    "{:?} is {} but grid membership is {}",
                    id,
                    agent.health(),
                    !infected
                ));
            }
        }

        Ok(())
    }
}
