//! Population statistics snapshots and running aggregates.

use serde::{Deserialize, Serialize};

/// One sample fed into [`PopulationStats::from_samples`]
#[derive(Debug, Clone, Copy)]
pub struct EntitySample {
    pub energy: f64,
    pub age: u64,
    pub mutation_load: f64,
}

/// Snapshot of the living population at the end of a tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationStats {
    pub tick: u64,
    pub living: usize,
    pub mean_energy: f64,
    pub min_energy: f64,
    pub max_energy: f64,
    pub total_energy: f64,
    pub mean_age: f64,
    pub mean_mutation_load: f64,
    pub plants: usize,
    pub active_events: usize,
}

impl PopulationStats {
    pub fn from_samples<I>(tick: u64, samples: I, plants: usize, active_events: usize) -> Self
    where
        I: IntoIterator<Item = EntitySample>,
    {
        let mut stats = Self {
            tick,
            plants,
            active_events,
            min_energy: f64::INFINITY,
            max_energy: f64::NEG_INFINITY,
            ..Default::default()
        };

        let mut age_sum = 0u64;
        let mut mutation_sum = 0.0;
        for sample in samples {
            stats.living += 1;
            stats.total_energy += sample.energy;
            stats.min_energy = stats.min_energy.min(sample.energy);
            stats.max_energy = stats.max_energy.max(sample.energy);
            age_sum += sample.age;
            mutation_sum += sample.mutation_load;
        }

        if stats.living == 0 {
            stats.min_energy = 0.0;
            stats.max_energy = 0.0;
            return stats;
        }

        let n = stats.living as f64;
        stats.mean_energy = stats.total_energy / n;
        stats.mean_age = age_sum as f64 / n;
        stats.mean_mutation_load = mutation_sum / n;
        stats
    }

    /// Relative difference of the mean energy against another snapshot
    pub fn mean_energy_delta(&self, other: &PopulationStats) -> f64 {
        let scale = self.mean_energy.abs().max(other.mean_energy.abs());
        if scale == 0.0 {
            return 0.0;
        }
        (self.mean_energy - other.mean_energy).abs() / scale
    }
}

/// Running aggregate across ticks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsAccumulator {
    pub samples: u64,
    pub avg_living: f64,
    pub avg_mean_energy: f64,
    pub peak_living: usize,
    pub peak_active_events: usize,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one snapshot in (incremental mean)
    pub fn update(&mut self, stats: &PopulationStats) {
        let n = self.samples as f64;
        let new_n = n + 1.0;

        self.avg_living = (self.avg_living * n + stats.living as f64) / new_n;
        self.avg_mean_energy = (self.avg_mean_energy * n + stats.mean_energy) / new_n;
        self.peak_living = self.peak_living.max(stats.living);
        self.peak_active_events = self.peak_active_events.max(stats.active_events);
        self.samples += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(energy: f64, age: u64) -> EntitySample {
        EntitySample {
            energy,
            age,
            mutation_load: 0.1,
        }
    }

    #[test]
    fn test_from_samples() {
        let stats = PopulationStats::from_samples(3, vec![sample(10.0, 2), sample(30.0, 4)], 5, 1);
        assert_eq!(stats.living, 2);
        assert_eq!(stats.mean_energy, 20.0);
        assert_eq!(stats.min_energy, 10.0);
        assert_eq!(stats.max_energy, 30.0);
        assert_eq!(stats.mean_age, 3.0);
        assert_eq!(stats.plants, 5);
    }

    #[test]
    fn test_empty_population() {
        let stats = PopulationStats::from_samples(0, Vec::new(), 0, 0);
        assert_eq!(stats.living, 0);
        assert_eq!(stats.mean_energy, 0.0);
        assert_eq!(stats.min_energy, 0.0);
    }

    #[test]
    fn test_mean_energy_delta() {
        let a = PopulationStats::from_samples(0, vec![sample(100.0, 0)], 0, 0);
        let b = PopulationStats::from_samples(0, vec![sample(96.0, 0)], 0, 0);
        assert!((a.mean_energy_delta(&b) - 0.04).abs() < 1e-9);
    }

    #[test]
    fn test_accumulator_update() {
        let mut acc = StatsAccumulator::new();
        acc.update(&PopulationStats::from_samples(0, vec![sample(10.0, 0)], 0, 2));
        acc.update(&PopulationStats::from_samples(1, vec![sample(20.0, 0), sample(40.0, 0)], 0, 1));

        assert_eq!(acc.samples, 2);
        assert_eq!(acc.avg_living, 1.5);
        assert_eq!(acc.avg_mean_energy, 20.0);
        assert_eq!(acc.peak_living, 2);
        assert_eq!(acc.peak_active_events, 2);
    }
}
