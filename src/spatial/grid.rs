//! Uniform grid over the world holding infected agents
//!
//! Cell size equals the interaction radius, so a 3x3 scan around any
//! point finds every agent within that radius. Only infected agents are
//! stored; membership is reconciled once per tick through
//! [`SpatialGrid::reinsert_if_still_infected`].

use crate::core::types::{AgentId, Vec2};
use crate::entity::agent::CellCoord;
use crate::entity::{Agent, HealthState};

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    width: usize,
    height: usize,
    cell_size: f64,
    cells: Vec<Vec<AgentId>>,
    len: usize,
}

impl SpatialGrid {
    /// Grid of `ceil(world_width / cell_size) x ceil(world_height / cell_size)` cells
    pub fn new(world_width: f64, world_height: f64, cell_size: f64) -> Self {
        let width = ((world_width / cell_size).ceil() as usize).max(1);
        let height = ((world_height / cell_size).ceil() as usize).max(1);
        Self {
            width,
            height,
            cell_size,
            cells: vec![Vec::new(); width * height],
            len: 0,
        }
    }

    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Number of agents currently stored
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Convert world position to cell coordinates, clamped into the grid
    #[inline]
    pub fn cell_of(&self, pos: Vec2) -> CellCoord {
        let x = (pos.x / self.cell_size).floor() as i64;
        let y = (pos.y / self.cell_size).floor() as i64;
        (
            x.clamp(0, self.width as i64 - 1) as usize,
            y.clamp(0, self.height as i64 - 1) as usize,
        )
    }

    #[inline]
    fn index(&self, (x, y): CellCoord) -> usize {
        y * self.width + x
    }

    pub fn cell(&self, coord: CellCoord) -> &[AgentId] {
        &self.cells[self.index(coord)]
    }

    /// Store the agent in the cell under its current position
    ///
    /// The cell is cached on the agent for removal. Inserting an agent
    /// that is already present moves it rather than duplicating it.
    pub fn insert(&mut self, id: AgentId, agent: &mut Agent) {
        if agent.grid_cell.is_some() {
            self.remove(id, agent);
        }
        let coord = self.cell_of(agent.position());
        let idx = self.index(coord);
        self.cells[idx].push(id);
        agent.grid_cell = Some(coord);
        self.len += 1;
    }

    /// Erase the agent from the cell it was inserted into
    ///
    /// Uses the cached cell, not the current position, since the agent has
    /// usually moved since insertion. Returns whether it was present.
    pub fn remove(&mut self, id: AgentId, agent: &mut Agent) -> bool {
        let Some(coord) = agent.grid_cell.take() else {
            return false;
        };
        let idx = self.index(coord);
        let cell = &mut self.cells[idx];
        match cell.iter().position(|&e| e == id) {
            Some(pos) => {
                cell.swap_remove(pos);
                self.len -= 1;
                true
            }
            None => {
                debug_assert!(false, "{:?} cached cell {:?} but was not in it", id, coord);
                false
            }
        }
    }

    /// Remove the agent, then put it back under its current position only
    /// if it is still infected
    ///
    /// Returns whether the agent is in the grid afterwards.
    pub fn reinsert_if_still_infected(&mut self, id: AgentId, agent: &mut Agent) -> bool {
        self.remove(id, agent);
        if agent.health() == HealthState::Infected {
            self.insert(id, agent);
            true
        } else {
            false
        }
    }

    /// Stored agents strictly closer than `radius` to `point`
    ///
    /// Scans the 3x3 block around the point's cell (fewer at the edges).
    /// Cells are disjoint, so no deduplication is needed.
    pub fn neighbors_within(&self, point: Vec2, radius: f64, agents: &[Agent]) -> Vec<AgentId> {
        let mut found = Vec::new();
        self.for_each_within(point, radius, agents, |id| found.push(id));
        found
    }

    /// Visitor form of [`Self::neighbors_within`], avoids the allocation
    pub fn for_each_within(
        &self,
        point: Vec2,
        radius: f64,
        agents: &[Agent],
        mut visit: impl FnMut(AgentId),
    ) {
        let (cx, cy) = self.cell_of(point);
        let x_range = cx.saturating_sub(1)..=(cx + 1).min(self.width - 1);
        for y in cy.saturating_sub(1)..=(cy + 1).min(self.height - 1) {
            for x in x_range.clone() {
                for &id in &self.cells[self.index((x, y))] {
                    if agents[id.index()].position().distance(&point) < radius {
                        visit(id);
                    }
                }
            }
        }
    }

    /// Every stored agent, cell by cell
    pub fn iter(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.cells.iter().flatten().copied()
    }

    /// Whether the agent sits in the cell it has cached
    pub fn contains(&self, id: AgentId, agent: &Agent) -> bool {
        agent
            .grid_cell
            .is_some_and(|coord| self.cell(coord).contains(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::AgentTraits;

    fn agent_at(x: f64, y: f64, health: HealthState) -> Agent {
        let traits = AgentTraits {
            speed: 0.0,
            angular_volatility: 0.0,
            recovery_threshold: 300.0,
            death_risk_per_tick: 0.0,
            vaccination_chance_per_tick: 0.0,
            teleport: None,
        };
        Agent::new(Vec2::new(x, y), 0.0, health, &traits)
    }

    #[test]
    fn test_dimensions_round_up() {
        let grid = SpatialGrid::new(600.0, 400.0, 35.0);
        assert_eq!(grid.dimensions(), (18, 12));
        let tiny = SpatialGrid::new(10.0, 10.0, 50.0);
        assert_eq!(tiny.dimensions(), (1, 1));
    }

    #[test]
    fn test_cell_of_clamps_upper_boundary() {
        let grid = SpatialGrid::new(100.0, 100.0, 10.0);
        assert_eq!(grid.cell_of(Vec2::new(100.0, 100.0)), (9, 9));
        assert_eq!(grid.cell_of(Vec2::new(150.0, -3.0)), (9, 0));
        assert_eq!(grid.cell_of(Vec2::new(15.0, 25.0)), (1, 2));
    }

    #[test]
    fn test_remove_uses_cached_cell() {
        let mut grid = SpatialGrid::new(100.0, 100.0, 10.0);
        let mut agents = vec![agent_at(5.0, 5.0, HealthState::Infected)];
        let id = AgentId(0);
        grid.insert(id, &mut agents[0]);
        assert_eq!(agents[0].grid_cell(), Some((0, 0)));

        // Teleport far away without telling the grid
        agents[0].set_position(Vec2::new(95.0, 95.0));
        assert!(grid.remove(id, &mut agents[0]));
        assert!(grid.is_empty());
        assert!(grid.cell((0, 0)).is_empty());
        assert_eq!(agents[0].grid_cell(), None);
    }

    #[test]
    fn test_reinsert_tracks_movement_and_health() {
        let mut grid = SpatialGrid::new(100.0, 100.0, 10.0);
        let mut agents = vec![agent_at(5.0, 5.0, HealthState::Infected)];
        let id = AgentId(0);
        grid.insert(id, &mut agents[0]);

        agents[0].set_position(Vec2::new(55.0, 25.0));
        assert!(grid.reinsert_if_still_infected(id, &mut agents[0]));
        assert_eq!(agents[0].grid_cell(), Some((5, 2)));
        assert_eq!(grid.cell((5, 2)), &[id]);
        assert_eq!(grid.len(), 1);

        agents[0].set_health(HealthState::Recovered);
        assert!(!grid.reinsert_if_still_infected(id, &mut agents[0]));
        assert!(grid.is_empty());
        assert!(!grid.contains(id, &agents[0]));
    }

    #[test]
    fn test_reinsert_is_idempotent() {
        let mut grid = SpatialGrid::new(100.0, 100.0, 10.0);
        let mut agents = vec![agent_at(42.0, 17.0, HealthState::Infected)];
        let id = AgentId(0);
        grid.reinsert_if_still_infected(id, &mut agents[0]);
        let once: Vec<_> = grid.iter().collect();
        let cell_once = agents[0].grid_cell();
        grid.reinsert_if_still_infected(id, &mut agents[0]);
        assert_eq!(grid.iter().collect::<Vec<_>>(), once);
        assert_eq!(agents[0].grid_cell(), cell_once);
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_double_insert_does_not_duplicate() {
        let mut grid = SpatialGrid::new(100.0, 100.0, 10.0);
        let mut agents = vec![agent_at(42.0, 17.0, HealthState::Infected)];
        grid.insert(AgentId(0), &mut agents[0]);
        grid.insert(AgentId(0), &mut agents[0]);
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.iter().count(), 1);
    }

    #[test]
    fn test_neighbors_within_filters_by_distance() {
        let mut grid = SpatialGrid::new(100.0, 100.0, 10.0);
        let mut agents = vec![
            agent_at(50.0, 50.0, HealthState::Infected),
            agent_at(55.0, 50.0, HealthState::Infected),
            agent_at(59.0, 59.0, HealthState::Infected),
            agent_at(80.0, 80.0, HealthState::Infected),
        ];
        for (i, agent) in agents.iter_mut().enumerate() {
            grid.insert(AgentId(i as u32), agent);
        }

        let mut found = grid.neighbors_within(Vec2::new(51.0, 51.0), 10.0, &agents);
        found.sort();
        assert_eq!(found, vec![AgentId(0), AgentId(1)]);
    }

    #[test]
    fn test_neighbors_within_is_strict() {
        let mut grid = SpatialGrid::new(100.0, 100.0, 10.0);
        let mut agents = vec![agent_at(10.0, 0.0, HealthState::Infected)];
        grid.insert(AgentId(0), &mut agents[0]);
        assert!(grid.neighbors_within(Vec2::new(0.0, 0.0), 10.0, &agents).is_empty());
        assert_eq!(grid.neighbors_within(Vec2::new(0.5, 0.0), 10.0, &agents).len(), 1);
    }

    #[test]
    fn test_neighbors_at_corner() {
        let mut grid = SpatialGrid::new(100.0, 100.0, 10.0);
        let mut agents = vec![agent_at(100.0, 100.0, HealthState::Infected)];
        grid.insert(AgentId(0), &mut agents[0]);
        let found = grid.neighbors_within(Vec2::new(95.0, 99.0), 10.0, &agents);
        assert_eq!(found, vec![AgentId(0)]);
    }
}
