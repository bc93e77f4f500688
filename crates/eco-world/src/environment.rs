//! Ambient collaborators: the wind vector field and the day/season clock.

use eco_core::{Position, Season};
use noise::{NoiseFn, Perlin};
use std::f64::consts::PI;

/// Wind at one position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindSample {
    /// Heading in radians
    pub direction: f64,
    pub magnitude: f64,
}

impl WindSample {
    pub fn calm() -> Self {
        Self {
            direction: 0.0,
            magnitude: 0.0,
        }
    }

    /// Cartesian components `(wind_x, wind_y)`
    pub fn components(&self) -> (f64, f64) {
        (
            self.magnitude * self.direction.cos(),
            self.magnitude * self.direction.sin(),
        )
    }
}

/// Per-position advisory wind signal consumed by wind-sensitive events
pub trait WindField: Send + Sync {
    fn wind_at(&self, position: Position) -> WindSample;

    /// Called once at the start of every tick
    fn advance(&mut self, _tick: u64) {}
}

/// Same wind everywhere, forever
#[derive(Debug, Clone, Copy)]
pub struct ConstantWind {
    pub direction: f64,
    pub magnitude: f64,
}

impl ConstantWind {
    pub fn new(direction: f64, magnitude: f64) -> Self {
        Self {
            direction,
            magnitude,
        }
    }
}

impl WindField for ConstantWind {
    fn wind_at(&self, _position: Position) -> WindSample {
        WindSample {
            direction: self.direction,
            magnitude: self.magnitude,
        }
    }
}

/// Smoothly varying wind driven by seeded Perlin noise that drifts over time
#[derive(Debug, Clone)]
pub struct NoiseWind {
    heading: Perlin,
    strength: Perlin,
    /// Spatial frequency per world unit
    scale: f64,
    max_magnitude: f64,
    /// Noise time advanced per tick
    drift: f64,
    time: f64,
}

impl NoiseWind {
    pub fn new(seed: u32, scale: f64, max_magnitude: f64, drift: f64) -> Self {
        Self {
            heading: Perlin::new(seed),
            strength: Perlin::new(seed.wrapping_add(1)),
            scale,
            max_magnitude,
            drift,
            time: 0.37,
        }
    }
}

impl WindField for NoiseWind {
    fn wind_at(&self, position: Position) -> WindSample {
        let point = [position.x * self.scale, position.y * self.scale, self.time];
        let direction = self.heading.get(point) * 2.0 * PI;
        let magnitude = (self.strength.get(point) * 0.5 + 0.5).clamp(0.0, 1.0) * self.max_magnitude;
        WindSample {
            direction,
            magnitude,
        }
    }

    fn advance(&mut self, tick: u64) {
        self.time = 0.37 + tick as f64 * self.drift;
    }
}

/// Time-of-day and season source
pub trait Clock {
    fn season(&self) -> Season;
    fn is_night(&self) -> bool;
}

/// Clock derived from the tick count
#[derive(Debug, Clone)]
pub struct WorldClock {
    ticks_per_day: u64,
    ticks_per_season: u64,
    tick: u64,
}

impl WorldClock {
    pub fn new(ticks_per_day: u64, days_per_season: u64) -> Self {
        let ticks_per_day = ticks_per_day.max(1);
        Self {
            ticks_per_day,
            ticks_per_season: ticks_per_day * days_per_season.max(1),
            tick: 0,
        }
    }

    pub fn advance(&mut self, tick: u64) {
        self.tick = tick;
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn day(&self) -> u64 {
        self.tick / self.ticks_per_day
    }

    /// Fraction of the current day elapsed, [0,1)
    pub fn day_phase(&self) -> f64 {
        (self.tick % self.ticks_per_day) as f64 / self.ticks_per_day as f64
    }
}

impl Clock for WorldClock {
    fn season(&self) -> Season {
        Season::from_index(self.tick / self.ticks_per_season)
    }

    fn is_night(&self) -> bool {
        let phase = self.day_phase();
        !(0.25..0.75).contains(&phase)
    }
}
