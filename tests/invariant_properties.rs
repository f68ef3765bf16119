//! Property tests for the invariants that must hold after every tick

use epidemic_sim::core::config::HotspotConfig;
use epidemic_sim::core::types::{AgentId, Vec2};
use epidemic_sim::entity::{Agent, AgentTraits, HealthState};
use epidemic_sim::simulation::Simulation;
use epidemic_sim::spatial::SpatialGrid;
use epidemic_sim::SimulationConfig;
use proptest::prelude::*;

fn arb_config() -> impl Strategy<Value = SimulationConfig> {
    (
        any::<u64>(),
        5usize..120,
        0.0f64..=1.0,
        0.0f64..=0.3,
        0.0f64..=0.05,
        prop_oneof![Just(0.0), 0.05f64..1.0, 1.0f64..4.0],
        any::<bool>(),
    )
        .prop_map(
            |(seed, n, infection, death, vaccination, rate, hotspot)| {
                let mut config = SimulationConfig {
                    seed,
                    population_size: n,
                    infection_probability: infection,
                    death_risk_per_tick: death,
                    vaccination_chance_per_tick: vaccination,
                    vaccination_rate: rate,
                    // Short infections so recoveries happen within the run
                    recovery: epidemic_sim::core::config::RecoveryConfig {
                        mean: 15.0,
                        std_dev: 5.0,
                    },
                    initial_infected_fraction: 0.2,
                    max_ticks: Some(60),
                    report_every: 0,
                    ..Default::default()
                };
                if hotspot {
                    config.teleport.chance = 0.2;
                    config.teleport.cooldown = 2;
                    config.teleport.back_cooldown = 3;
                    config.world.hotspot = Some(HotspotConfig::classic());
                }
                config
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_tick_invariants(config in arb_config()) {
        let mut sim = Simulation::new(config).unwrap();
        let n = sim.population().len();
        let mut previous: Vec<HealthState> =
            sim.population().agents().iter().map(Agent::health).collect();

        for _ in 0..60 {
            sim.step();
            let pop = sim.population();

            // Counters, partitions and grid agree
            prop_assert!(pop.check_invariants().is_ok(), "{:?}", pop.check_invariants());
            prop_assert_eq!(pop.counts().total() as usize, n);
            let mut in_grid: Vec<AgentId> = pop.grid().iter().collect();
            let mut infected = pop.infected().to_vec();
            in_grid.sort();
            infected.sort();
            prop_assert_eq!(in_grid, infected);

            let world = pop.world();
            for (i, agent) in pop.agents().iter().enumerate() {
                let pos = agent.position();
                prop_assert!(pos.x >= 0.0 && pos.x <= world.width(), "x out of bounds: {:?}", pos);
                prop_assert!(pos.y >= 0.0 && pos.y <= world.height(), "y out of bounds: {:?}", pos);

                let before = previous[i];
                let now = agent.health();
                if before.is_terminal() {
                    prop_assert_eq!(before, now);
                } else if before != now {
                    // Susceptible may pass through Infected within one tick
                    let direct = before.can_become(now);
                    let via_infection = before == HealthState::Susceptible
                        && HealthState::Infected.can_become(now);
                    prop_assert!(direct || via_infection, "{} -> {}", before, now);
                }
                previous[i] = now;
            }
        }
    }

    #[test]
    fn prop_reinsert_is_idempotent(
        positions in prop::collection::vec((0.0f64..=100.0, 0.0f64..=80.0), 1..40),
        infected_mask in prop::collection::vec(any::<bool>(), 40),
        cell_size in 3.0f64..30.0,
    ) {
        let traits = AgentTraits {
            speed: 0.0,
            angular_volatility: 0.0,
            recovery_threshold: 10.0,
            death_risk_per_tick: 0.0,
            vaccination_chance_per_tick: 0.0,
            teleport: None,
        };
        let mut agents: Vec<Agent> = positions
            .iter()
            .zip(&infected_mask)
            .map(|(&(x, y), &sick)| {
                let health = if sick { HealthState::Infected } else { HealthState::Susceptible };
                Agent::new(Vec2::new(x, y), 0.0, health, &traits)
            })
            .collect();

        let mut once = SpatialGrid::new(100.0, 80.0, cell_size);
        let mut twice = SpatialGrid::new(100.0, 80.0, cell_size);
        let mut agents_twice = agents.clone();

        for (i, agent) in agents.iter_mut().enumerate() {
            once.reinsert_if_still_infected(AgentId(i as u32), agent);
        }
        for (i, agent) in agents_twice.iter_mut().enumerate() {
            let id = AgentId(i as u32);
            let first = twice.reinsert_if_still_infected(id, agent);
            let second = twice.reinsert_if_still_infected(id, agent);
            prop_assert_eq!(first, second);
        }

        prop_assert_eq!(once.len(), twice.len());
        let (w, h) = once.dimensions();
        for x in 0..w {
            for y in 0..h {
                prop_assert_eq!(once.cell((x, y)), twice.cell((x, y)));
            }
        }
        for (a, b) in agents.iter().zip(&agents_twice) {
            prop_assert_eq!(a.grid_cell(), b.grid_cell());
        }
    }

    #[test]
    fn prop_neighbor_query_matches_brute_force(
        positions in prop::collection::vec((0.0f64..=100.0, 0.0f64..=100.0), 1..60),
        probe in (0.0f64..=100.0, 0.0f64..=100.0),
        radius in 2.0f64..25.0,
    ) {
        let traits = AgentTraits {
            speed: 0.0,
            angular_volatility: 0.0,
            recovery_threshold: 10.0,
            death_risk_per_tick: 0.0,
            vaccination_chance_per_tick: 0.0,
            teleport: None,
        };
        let mut agents: Vec<Agent> = positions
            .iter()
            .map(|&(x, y)| Agent::new(Vec2::new(x, y), 0.0, HealthState::Infected, &traits))
            .collect();
        let mut grid = SpatialGrid::new(100.0, 100.0, radius);
        for (i, agent) in agents.iter_mut().enumerate() {
            grid.insert(AgentId(i as u32), agent);
        }

        let point = Vec2::new(probe.0, probe.1);
        let mut found = grid.neighbors_within(point, radius, &agents);
        found.sort();
        let expected: Vec<AgentId> = agents
            .iter()
            .enumerate()
            .filter(|(_, a)| a.position().distance(&point) < radius)
            .map(|(i, _)| AgentId(i as u32))
            .collect();
        prop_assert_eq!(found, expected);
    }
}
