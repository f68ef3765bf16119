//! Health states, transitions and per-state tallies

use std::fmt;

use serde::{Deserialize, Serialize};

/// Health of one agent
///
/// Recovered, Dead and Vaccinated are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthState {
    Susceptible,
    Infected,
    Recovered,
    Dead,
    Vaccinated,
}

impl HealthState {
    pub const ALL: [HealthState; 5] = [
        HealthState::Susceptible,
        HealthState::Infected,
        HealthState::Recovered,
        HealthState::Dead,
        HealthState::Vaccinated,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            HealthState::Recovered | HealthState::Dead | HealthState::Vaccinated
        )
    }

    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_become(self, next: HealthState) -> bool {
        matches!(
            (self, next),
            (HealthState::Susceptible, HealthState::Infected)
                | (HealthState::Susceptible, HealthState::Vaccinated)
                | (HealthState::Infected, HealthState::Dead)
                | (HealthState::Infected, HealthState::Recovered)
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            HealthState::Susceptible => "Susceptible",
            HealthState::Infected => "Infected",
            HealthState::Recovered => "Recovered",
            HealthState::Dead => "Dead",
            HealthState::Vaccinated => "Vaccinated",
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Terminal transition reported by `Agent::step`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Recovered,
    Died,
    Vaccinated,
}

impl Transition {
    /// State the agent left
    pub fn source(self) -> HealthState {
        match self {
            Transition::Recovered | Transition::Died => HealthState::Infected,
            Transition::Vaccinated => HealthState::Susceptible,
        }
    }

    /// State the agent entered
    pub fn target(self) -> HealthState {
        match self {
            Transition::Recovered => HealthState::Recovered,
            Transition::Died => HealthState::Dead,
            Transition::Vaccinated => HealthState::Vaccinated,
        }
    }
}

/// Number of agents in each health state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HealthCounts {
    pub susceptible: u32,
    pub infected: u32,
    pub recovered: u32,
    pub dead: u32,
    pub vaccinated: u32,
}

impl HealthCounts {
    pub fn get(&self, state: HealthState) -> u32 {
        match state {
            HealthState::Susceptible => self.susceptible,
            HealthState::Infected => self.infected,
            HealthState::Recovered => self.recovered,
            HealthState::Dead => self.dead,
            HealthState::Vaccinated => self.vaccinated,
        }
    }

    fn slot_mut(&mut self, state: HealthState) -> &mut u32 {
        match state {
            HealthState::Susceptible => &mut self.susceptible,
            HealthState::Infected => &mut self.infected,
            HealthState::Recovered => &mut self.recovered,
            HealthState::Dead => &mut self.dead,
            HealthState::Vaccinated => &mut self.vaccinated,
        }
    }

    pub(crate) fn increment(&mut self, state: HealthState) {
        *self.slot_mut(state) += 1;
    }

    /// Move one unit from `from` to `to`
    pub(crate) fn shift(&mut self, from: HealthState, to: HealthState) {
        let source = self.slot_mut(from);
        debug_assert!(*source > 0, "no {} agent to move", from);
        *source = source.saturating_sub(1);
        self.increment(to);
    }

    pub fn total(&self) -> u32 {
        self.susceptible + self.infected + self.recovered + self.dead + self.vaccinated
    }

    /// Share of the living population that is immune (recovered or vaccinated)
    ///
    /// Returns 0.0 when nobody is alive.
    pub fn immunity(&self) -> f64 {
        let living = self.total() - self.dead;
        if living == 0 {
            return 0.0;
        }
        (self.recovered + self.vaccinated) as f64 / living as f64
    }

    pub fn iter(&self) -> impl Iterator<Item = (HealthState, u32)> + '_ {
        HealthState::ALL.into_iter().map(move |s| (s, self.get(s)))
    }
}

impl fmt::Display for HealthCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (state, count) in self.iter() {
            writeln!(f, "{}: {}", state, count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in HealthState::ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in HealthState::ALL {
                assert!(!from.can_become(to), "{} -> {} should be impossible", from, to);
            }
        }
    }

    #[test]
    fn test_transition_endpoints_are_legal() {
        for t in [Transition::Recovered, Transition::Died, Transition::Vaccinated] {
            assert!(t.source().can_become(t.target()));
        }
    }

    #[test]
    fn test_shift_preserves_total() {
        let mut counts = HealthCounts {
            susceptible: 3,
            infected: 2,
            ..Default::default()
        };
        counts.shift(HealthState::Susceptible, HealthState::Infected);
        counts.shift(HealthState::Infected, HealthState::Dead);
        assert_eq!(counts.total(), 5);
        assert_eq!(counts.susceptible, 2);
        assert_eq!(counts.infected, 2);
        assert_eq!(counts.dead, 1);
    }

    #[test]
    fn test_immunity_ignores_dead() {
        let counts = HealthCounts {
            susceptible: 2,
            infected: 0,
            recovered: 1,
            dead: 6,
            vaccinated: 1,
        };
        assert!((counts.immunity() - 0.5).abs() < 1e-12);
        let all_dead = HealthCounts {
            dead: 4,
            ..Default::default()
        };
        assert_eq!(all_dead.immunity(), 0.0);
    }

    #[test]
    fn test_display_lists_every_state() {
        let text = HealthCounts {
            susceptible: 9,
            infected: 1,
            ..Default::default()
        }
        .to_string();
        assert_eq!(
            text,
            "Susceptible: 9\nInfected: 1\nRecovered: 0\nDead: 0\nVaccinated: 0\n"
        );
    }
}
