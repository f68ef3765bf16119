//! Per-tick time series of the health counters

use serde::Serialize;

use crate::entity::{HealthCounts, HealthState};
use crate::simulation::population::Population;

/// Append-only record of `HealthCounts`, one snapshot per tick
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsRecorder {
    series: Vec<HealthCounts>,
    infected_floor: u32,
    /// Index of the first snapshot at or below the floor
    terminated_at: Option<usize>,
}

impl StatsRecorder {
    pub fn new(infected_floor: u32) -> Self {
        Self {
            series: Vec::new(),
            infected_floor,
            terminated_at: None,
        }
    }

    /// Append the population's current counters
    pub fn record(&mut self, pop: &Population) {
        self.push(pop.counts());
    }

    pub fn push(&mut self, counts: HealthCounts) {
        if self.terminated_at.is_none() && counts.infected <= self.infected_floor {
            self.terminated_at = Some(self.series.len());
            tracing::info!(
                "Epidemic extinguished after {} recorded ticks",
                self.series.len() + 1
            );
        }
        self.series.push(counts);
    }

    /// True from the first snapshot with infected at or below the floor on
    pub fn is_terminated(&self) -> bool {
        self.terminated_at.is_some()
    }

    pub fn terminated_at(&self) -> Option<usize> {
        self.terminated_at
    }

    pub fn series(&self) -> &[HealthCounts] {
        &self.series
    }

    pub fn latest(&self) -> Option<&HealthCounts> {
        self.series.last()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// One state's counts over time, for plotting
    pub fn column(&self, state: HealthState) -> Vec<u32> {
        self.series.iter().map(|c| c.get(state)).collect()
    }

    /// Highest infected count and the first snapshot it occurred at
    pub fn peak_infected(&self) -> Option<(usize, u32)> {
        self.series
            .iter()
            .enumerate()
            .map(|(i, c)| (i, c.infected))
            .fold(None, |best, (i, v)| match best {
                Some((_, b)) if b >= v => best,
                _ => Some((i, v)),
            })
    }
}
