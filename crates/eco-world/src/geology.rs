//! Transient terrain-mutating processes: uplift, earthquakes, rifts, volcanism
//! and subsidence.

use crate::terrain::Topology;
use eco_core::{Error, GeologicalEventType, GeologyConfig, GridCoord, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeologicalEvent {
    pub kind: GeologicalEventType,
    pub center: GridCoord,
    /// Cells
    pub radius: f64,
    /// [0,1]
    pub intensity: f64,
    /// Ticks remaining
    pub duration: i64,
    pub start_tick: u64,
}

impl GeologicalEvent {
    /// Linear falloff `1 - d/r`, zero outside the radius
    pub fn falloff(&self, coord: GridCoord) -> f64 {
        let distance = self.center.distance(&coord);
        if distance > self.radius {
            0.0
        } else {
            1.0 - distance / self.radius
        }
    }

    pub fn is_active(&self) -> bool {
        self.duration > 0
    }
}

/// Outcome of one geology tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeologyTick {
    /// Cell updates made
    pub touched: usize,
    /// Events whose duration ran out this tick
    pub finished: Vec<GeologicalEvent>,
}

pub struct GeologyEngine {
    config: GeologyConfig,
    elevation_bounds: (f64, f64),
    sea_level: f64,
    events: Vec<GeologicalEvent>,
}

impl GeologyEngine {
    pub fn new(config: GeologyConfig, elevation_bounds: (f64, f64), sea_level: f64) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            elevation_bounds,
            sea_level,
            events: Vec::new(),
        })
    }

    pub fn active(&self) -> &[GeologicalEvent] {
        &self.events
    }

    /// Roll for a new event; returns it when one starts
    pub fn maybe_spawn(&mut self, topology: &Topology, tick: u64, rng: &mut ChaCha8Rng) -> Option<GeologicalEvent> {
        if self.events.len() >= self.config.max_active || rng.gen::<f64>() >= self.config.spawn_chance {
            return None;
        }

        let kind = *GeologicalEventType::ALL.choose(rng)?;
        let center = GridCoord::new(rng.gen_range(0..topology.width()), rng.gen_range(0..topology.height()));
        let radius = rng.gen_range(self.config.radius.0..=self.config.radius.1);
        let intensity = rng.gen_range(self.config.intensity.0..=self.config.intensity.1);
        let duration = rng.gen_range(self.config.duration.0..=self.config.duration.1);

        self.trigger(kind, center, radius, intensity, duration, tick).ok()
    }

    /// Start an event explicitly
    pub fn trigger(
        &mut self,
        kind: GeologicalEventType,
        center: GridCoord,
        radius: f64,
        intensity: f64,
        duration: u32,
        tick: u64,
    ) -> Result<GeologicalEvent> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(Error::InvalidConfig(format!("geological radius must be positive, got {}", radius)));
        }
        if duration == 0 {
            return Err(Error::InvalidConfig("geological duration must be at least one tick".into()));
        }

        let event = GeologicalEvent {
            kind,
            center,
            radius,
            intensity: intensity.clamp(0.0, 1.0),
            duration: i64::from(duration),
            start_tick: tick,
        };

        info!(
            event = "geological_event",
            kind = kind.name(),
            x = center.x,
            y = center.y,
            radius = event.radius,
            intensity = event.intensity,
            duration = event.duration,
            tick = tick,
            "Geological event started"
        );

        self.events.push(event.clone());
        Ok(event)
    }

    /// Apply every active event to the topology for one tick, then age them
    pub fn apply(&mut self, topology: &mut Topology, rng: &mut ChaCha8Rng) -> GeologyTick {
        let mut touched = 0;

        for event in &self.events {
            let reach = event.radius.ceil() as i64;
            for dy in -reach..=reach {
                for dx in -reach..=reach {
                    let x = event.center.x as i64 + dx;
                    let y = event.center.y as i64 + dy;
                    if !topology.in_bounds(x, y) {
                        continue;
                    }
                    let coord = GridCoord::new(x as usize, y as usize);
                    let falloff = event.falloff(coord);
                    if falloff <= 0.0 {
                        continue;
                    }
                    self.apply_to_cell(event, topology, coord, event.intensity * falloff, rng);
                    touched += 1;
                }
            }
        }

        if !self.events.is_empty() {
            topology.clamp_elevation(self.elevation_bounds);
        }

        let mut finished = Vec::new();
        for event in &mut self.events {
            event.duration -= 1;
            if !event.is_active() {
                debug!(kind = event.kind.name(), start_tick = event.start_tick, "Geological event finished");
                finished.push(event.clone());
            }
        }
        self.events.retain(GeologicalEvent::is_active);

        GeologyTick { touched, finished }
    }

    fn apply_to_cell(
        &self,
        event: &GeologicalEvent,
        topology: &mut Topology,
        coord: GridCoord,
        strength: f64,
        rng: &mut ChaCha8Rng,
    ) {
        let c = &self.config;
        let cell = topology.get_mut(coord);

        match event.kind {
            GeologicalEventType::MountainUplift => {
                cell.elevation += c.uplift_rate * strength;
                cell.hardness = (cell.hardness + c.hardness_rate * strength).min(1.0);
            }
            GeologicalEventType::Earthquake => {
                cell.elevation += rng.gen_range(-1.0..=1.0) * c.earthquake_jitter * strength;
                cell.hardness = (cell.hardness - c.hardness_rate * strength).max(0.0);
            }
            GeologicalEventType::Rift => {
                cell.elevation -= c.rift_rate * strength;
            }
            GeologicalEventType::VolcanicActivity => {
                cell.elevation += c.uplift_rate * 0.5 * strength;
                cell.hardness = (cell.hardness + c.hardness_rate * strength).min(1.0);
                cell.sediment += c.uplift_rate * 0.25 * strength;
            }
            GeologicalEventType::Subsidence => {
                cell.elevation -= c.subsidence_rate * strength;
                if cell.elevation < self.sea_level {
                    cell.water_level = cell.water_level.max(self.sea_level - cell.elevation);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn engine() -> GeologyEngine {
        GeologyEngine::new(GeologyConfig::default(), (-1.0, 1.5), -0.12).unwrap()
    }

    fn flat(size: usize, elevation: f64) -> Topology {
        let mut topology = Topology::new(size, size);
        for coord in topology.coords().collect::<Vec<_>>() {
            topology.get_mut(coord).elevation = elevation;
        }
        topology
    }

    #[test]
    fn test_uplift_raises_center_every_tick() {
        let mut geology = engine();
        let mut topology = flat(20, 0.1);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let center = GridCoord::new(10, 10);
        geology
            .trigger(GeologicalEventType::MountainUplift, center, 4.0, 0.5, 5, 0)
            .unwrap();

        for tick in 0..5 {
            let before = *topology.get(center);
            let report = geology.apply(&mut topology, &mut rng);
            let after = topology.get(center);
            assert!(after.elevation > before.elevation);
            assert!(after.hardness > before.hardness);
            assert!(report.touched > 0);
            assert_eq!(report.finished.len(), usize::from(tick == 4));
        }
        assert!(geology.active().is_empty());
    }

    #[test]
    fn test_falloff_is_linear() {
        let event = GeologicalEvent {
            kind: GeologicalEventType::Rift,
            center: GridCoord::new(5, 5),
            radius: 4.0,
            intensity: 1.0,
            duration: 1,
            start_tick: 0,
        };
        assert_eq!(event.falloff(GridCoord::new(5, 5)), 1.0);
        assert!((event.falloff(GridCoord::new(7, 5)) - 0.5).abs() < 1e-12);
        assert_eq!(event.falloff(GridCoord::new(10, 5)), 0.0);
    }

    #[test]
    fn test_cells_outside_radius_untouched() {
        let mut geology = engine();
        let mut topology = flat(20, 0.1);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        geology
            .trigger(GeologicalEventType::Rift, GridCoord::new(3, 3), 2.0, 1.0, 3, 0)
            .unwrap();
        geology.apply(&mut topology, &mut rng);

        assert!(topology.get(GridCoord::new(3, 3)).elevation < 0.1);
        assert_eq!(topology.get(GridCoord::new(15, 15)).elevation, 0.1);
    }

    #[test]
    fn test_subsidence_floods_below_sea_level() {
        let mut geology = engine();
        let mut topology = flat(10, -0.115);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        geology
            .trigger(GeologicalEventType::Subsidence, GridCoord::new(5, 5), 3.0, 1.0, 5, 0)
            .unwrap();
        for _ in 0..5 {
            geology.apply(&mut topology, &mut rng);
        }
        assert!(topology.get(GridCoord::new(5, 5)).water_level > 0.0);
    }

    #[test]
    fn test_elevation_clamped() {
        let mut geology = engine();
        let mut topology = flat(10, 1.499);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        geology
            .trigger(GeologicalEventType::MountainUplift, GridCoord::new(5, 5), 3.0, 1.0, 10, 0)
            .unwrap();
        for _ in 0..10 {
            geology.apply(&mut topology, &mut rng);
        }
        assert!(topology.get(GridCoord::new(5, 5)).elevation <= 1.5);
    }

    #[test]
    fn test_invalid_trigger_rejected() {
        let mut geology = engine();
        assert!(geology
            .trigger(GeologicalEventType::Earthquake, GridCoord::new(0, 0), 0.0, 0.5, 5, 0)
            .is_err());
        assert!(geology
            .trigger(GeologicalEventType::Earthquake, GridCoord::new(0, 0), 2.0, 0.5, 0, 0)
            .is_err());
    }

    #[test]
    fn test_spawn_respects_max_active() {
        let mut config = GeologyConfig::default();
        config.spawn_chance = 1.0;
        config.max_active = 2;
        let mut geology = GeologyEngine::new(config, (-1.0, 1.5), -0.12).unwrap();
        let topology = flat(10, 0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        let spawned = (0..5)
            .filter(|tick| geology.maybe_spawn(&topology, *tick, &mut rng).is_some())
            .count();
        assert_eq!(spawned, 2);
        assert_eq!(geology.active().len(), 2);
    }
}
