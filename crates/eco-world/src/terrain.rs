//! Procedural terrain.
//!
//! Elevation starts as multi-octave Perlin noise and is then shaped by line
//! features (mountain ranges and valleys), Gaussian lake basins and rivers
//! traced by steepest descent. Slope, aspect and drainage are derived from the
//! final elevation field. Elevation is clamped to the configured bounds after
//! every additive pass.

use eco_core::{Error, GridCoord, Result, TerrainConfig, WorldConfig};
use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Terrain attributes of one cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopologyCell {
    pub elevation: f64,
    /// [0,1]
    pub slope: f64,
    /// Downhill-facing direction in radians
    pub aspect: f64,
    /// Fraction of neighbours lower than this cell, [0,1]
    pub drainage: f64,
    /// Material removed by erosion so far
    pub erosion: f64,
    /// Material deposited so far
    pub sediment: f64,
    pub water_level: f64,
    /// [0,1]
    pub hardness: f64,
    pub soil_depth: f64,
}

impl Default for TopologyCell {
    fn default() -> Self {
        Self {
            elevation: 0.0,
            slope: 0.0,
            aspect: 0.0,
            drainage: 0.0,
            erosion: 0.0,
            sediment: 0.0,
            water_level: 0.0,
            hardness: 0.5,
            soil_depth: 0.5,
        }
    }
}

/// Grid of topology cells, same dimensions as the spatial grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    width: usize,
    height: usize,
    cells: Vec<TopologyCell>,
}

impl Topology {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![TopologyCell::default(); width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, coord: GridCoord) -> &TopologyCell {
        &self.cells[coord.y * self.width + coord.x]
    }

    pub fn get_mut(&mut self, coord: GridCoord) -> &mut TopologyCell {
        &mut self.cells[coord.y * self.width + coord.x]
    }

    pub fn cell_at(&self, x: usize, y: usize) -> Result<&TopologyCell> {
        if x >= self.width || y >= self.height {
            return Err(Error::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(&self.cells[y * self.width + x])
    }

    pub fn cells(&self) -> &[TopologyCell] {
        &self.cells
    }

    pub fn coords(&self) -> impl Iterator<Item = GridCoord> + '_ {
        (0..self.cells.len()).map(move |i| GridCoord::new(i % self.width, i / self.width))
    }

    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Below sea level or holding standing water
    pub fn is_water(&self, coord: GridCoord, sea_level: f64) -> bool {
        let cell = self.get(coord);
        cell.elevation <= sea_level || cell.water_level > 0.0
    }

    /// Lowest of the 8-connected neighbours
    pub fn lowest_neighbor(&self, coord: GridCoord) -> Option<(GridCoord, f64)> {
        let mut lowest: Option<(GridCoord, f64)> = None;
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let Some(next) = coord.checked_offset(dx, dy, self.width, self.height) else {
                    continue;
                };
                let elevation = self.get(next).elevation;
                if lowest.map_or(true, |(_, e)| elevation < e) {
                    lowest = Some((next, elevation));
                }
            }
        }
        lowest
    }

    pub fn clamp_elevation(&mut self, bounds: (f64, f64)) {
        for cell in &mut self.cells {
            cell.elevation = if cell.elevation.is_finite() {
                cell.elevation.clamp(bounds.0, bounds.1)
            } else {
                0.0
            };
        }
    }

    pub fn elevation_range(&self) -> (f64, f64) {
        self.cells.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
            (lo.min(c.elevation), hi.max(c.elevation))
        })
    }
}

/// Straight ridge or trough, in cell units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFeature {
    pub start: (f64, f64),
    pub end: (f64, f64),
    /// Peak elevation change; negative for valleys
    pub height: f64,
    /// Gaussian width
    pub width: f64,
}

impl LineFeature {
    /// Perpendicular distance to the segment, clamped to its endpoints
    pub fn distance_to(&self, point: (f64, f64)) -> f64 {
        let dx = self.end.0 - self.start.0;
        let dy = self.end.1 - self.start.1;
        let len2 = dx * dx + dy * dy;
        let t = if len2 > 0.0 {
            (((point.0 - self.start.0) * dx + (point.1 - self.start.1) * dy) / len2).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let px = self.start.0 + t * dx;
        let py = self.start.1 + t * dy;
        ((point.0 - px).powi(2) + (point.1 - py).powi(2)).sqrt()
    }

    /// `height * exp(-d^2 / (2 width^2))`
    pub fn influence(&self, point: (f64, f64)) -> f64 {
        let d = self.distance_to(point);
        self.height * (-(d * d) / (2.0 * self.width * self.width)).exp()
    }
}

/// Path of a river from source to mouth
#[derive(Debug, Clone, PartialEq)]
pub struct River {
    pub path: Vec<GridCoord>,
}

/// Summary of a full generation pass
#[derive(Debug, Clone, Default)]
pub struct TerrainSummary {
    pub mountain_ranges: usize,
    pub valleys: usize,
    pub lakes: usize,
    pub rivers: usize,
    pub discarded_rivers: usize,
}

pub struct TerrainGenerator {
    config: TerrainConfig,
    world: WorldConfig,
    elevation_noise: Perlin,
    hardness_noise: Perlin,
    offset: (f64, f64),
}

impl TerrainGenerator {
    pub fn new(config: TerrainConfig, world: WorldConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        world.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let elevation_noise = Perlin::new(rng.gen());
        let hardness_noise = Perlin::new(rng.gen());
        // Fractional offsets keep samples off the integer lattice where Perlin is zero
        let offset = (rng.gen_range(0.0..1000.0) + 0.31, rng.gen_range(0.0..1000.0) + 0.17);

        Ok(Self {
            config,
            world,
            elevation_noise,
            hardness_noise,
            offset,
        })
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Run every generation pass and return the finished topology
    pub fn generate(&self, rng: &mut ChaCha8Rng) -> Topology {
        let mut topology = Topology::new(self.world.grid_width, self.world.grid_height);
        let mut summary = TerrainSummary::default();

        self.generate_base_elevation(&mut topology);
        summary.mountain_ranges = self.add_mountain_ranges(&mut topology, rng).len();
        summary.valleys = self.add_valleys(&mut topology, rng).len();
        topology.clamp_elevation(self.config.elevation_bounds);

        let lakes = rng.gen_range(self.config.lake_count.0..=self.config.lake_count.1);
        for _ in 0..lakes {
            if self.create_lake(&mut topology, rng).is_some() {
                summary.lakes += 1;
            }
        }

        let rivers = rng.gen_range(self.config.river_count.0..=self.config.river_count.1);
        for _ in 0..rivers {
            match self.create_river(&mut topology, rng) {
                Some(_) => summary.rivers += 1,
                None => summary.discarded_rivers += 1,
            }
        }

        topology.clamp_elevation(self.config.elevation_bounds);
        self.calculate_slopes(&mut topology);
        self.assign_hardness(&mut topology);

        let (lowest, highest) = topology.elevation_range();
        debug!(
            mountain_ranges = summary.mountain_ranges,
            valleys = summary.valleys,
            lakes = summary.lakes,
            rivers = summary.rivers,
            discarded_rivers = summary.discarded_rivers,
            lowest,
            highest,
            "Terrain generated"
        );

        topology
    }

    /// Octave noise at a cell centre, normalised by the amplitude sum
    pub fn sample_elevation(&self, x: usize, y: usize) -> f64 {
        let (cell_w, cell_h) = self.world.cell_size();
        let wx = (x as f64 + 0.5) * cell_w;
        let wy = (y as f64 + 0.5) * cell_h;

        let mut amplitude = self.config.base_amplitude;
        let mut frequency = self.config.base_frequency;
        let mut total = 0.0;
        let mut amplitude_sum = 0.0;

        for _ in 0..self.config.octaves {
            let n = self
                .elevation_noise
                .get([wx * frequency + self.offset.0, wy * frequency + self.offset.1]);
            total += amplitude * n;
            amplitude_sum += amplitude;
            amplitude *= 0.5;
            frequency *= 2.0;
        }

        let elevation = if amplitude_sum > 0.0 {
            total / amplitude_sum * self.config.elevation_scale
        } else {
            0.0
        };
        if elevation.is_finite() {
            elevation
        } else {
            0.0
        }
    }

    pub fn generate_base_elevation(&self, topology: &mut Topology) {
        for y in 0..topology.height {
            for x in 0..topology.width {
                let elevation = self.sample_elevation(x, y);
                topology.get_mut(GridCoord::new(x, y)).elevation = elevation;
            }
        }
    }

    pub fn add_mountain_ranges(&self, topology: &mut Topology, rng: &mut ChaCha8Rng) -> Vec<LineFeature> {
        let count = rng.gen_range(self.config.mountain_range_count.0..=self.config.mountain_range_count.1);
        let features: Vec<LineFeature> = (0..count)
            .map(|_| {
                let height = rng.gen_range(self.config.mountain_height.0..=self.config.mountain_height.1);
                let width = rng.gen_range(self.config.mountain_width.0..=self.config.mountain_width.1);
                self.random_segment(topology, rng, height, width)
            })
            .collect();
        apply_features(topology, &features);
        features
    }

    pub fn add_valleys(&self, topology: &mut Topology, rng: &mut ChaCha8Rng) -> Vec<LineFeature> {
        let count = rng.gen_range(self.config.valley_count.0..=self.config.valley_count.1);
        let features: Vec<LineFeature> = (0..count)
            .map(|_| {
                let depth = rng.gen_range(self.config.valley_depth.0..=self.config.valley_depth.1);
                let width = rng.gen_range(self.config.valley_width.0..=self.config.valley_width.1);
                self.random_segment(topology, rng, -depth, width)
            })
            .collect();
        apply_features(topology, &features);
        features
    }

    fn random_segment(&self, topology: &Topology, rng: &mut ChaCha8Rng, height: f64, width: f64) -> LineFeature {
        let start = (
            rng.gen_range(0.0..topology.width as f64),
            rng.gen_range(0.0..topology.height as f64),
        );
        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
        let shorter = topology.width.min(topology.height) as f64;
        let length = rng.gen_range(self.config.feature_length.0..=self.config.feature_length.1) * shorter;
        LineFeature {
            start,
            end: (start.0 + length * angle.cos(), start.1 + length * angle.sin()),
            height,
            width,
        }
    }

    /// Depress a Gaussian basin around the lowest of a random cell sample
    pub fn create_lake(&self, topology: &mut Topology, rng: &mut ChaCha8Rng) -> Option<GridCoord> {
        let mut lowest: Option<(GridCoord, f64)> = None;
        for _ in 0..self.config.lake_sample_count {
            let coord = GridCoord::new(rng.gen_range(0..topology.width), rng.gen_range(0..topology.height));
            let elevation = topology.get(coord).elevation;
            if lowest.map_or(true, |(_, e)| elevation < e) {
                lowest = Some((coord, elevation));
            }
        }
        let (center, _) = lowest?;

        let radius = rng.gen_range(self.config.lake_radius.0..=self.config.lake_radius.1);
        let depth = rng.gen_range(self.config.lake_depth.0..=self.config.lake_depth.1);
        let sigma = radius / 2.0;
        let reach = radius.ceil() as i64;

        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let x = center.x as i64 + dx;
                let y = center.y as i64 + dy;
                if !topology.in_bounds(x, y) {
                    continue;
                }
                let distance = ((dx * dx + dy * dy) as f64).sqrt();
                if distance > radius {
                    continue;
                }
                let weight = (-(distance * distance) / (2.0 * sigma * sigma)).exp();
                let cell = topology.get_mut(GridCoord::new(x as usize, y as usize));
                cell.elevation -= depth * weight;
                cell.water_level += depth * weight;
            }
        }

        debug!(x = center.x, y = center.y, radius, depth, "Lake created");
        Some(center)
    }

    /// Trace a river from a high sampled point and carve it into the terrain.
    /// Returns `None` when the trace is too short to keep.
    pub fn create_river(&self, topology: &mut Topology, rng: &mut ChaCha8Rng) -> Option<River> {
        let mut source: Option<(GridCoord, f64)> = None;
        for _ in 0..self.config.river_source_samples.max(1) {
            let coord = GridCoord::new(rng.gen_range(0..topology.width), rng.gen_range(0..topology.height));
            let elevation = topology.get(coord).elevation;
            if source.map_or(true, |(_, e)| elevation > e) {
                source = Some((coord, elevation));
            }
        }
        let (source, _) = source?;

        let path = self.trace_river(topology, source);
        if path.len() < self.config.river_min_length {
            return None;
        }

        for coord in &path {
            let cell = topology.get_mut(*coord);
            cell.water_level += self.config.river_depth;
            cell.elevation -= self.config.river_carve;
            cell.drainage = 1.0;
        }

        Some(River { path })
    }

    /// Steepest-descent walk over the 8-neighbourhood. Stops at sea level, on
    /// existing water, after `river_max_steps` steps, or in a dry local minimum.
    pub fn trace_river(&self, topology: &Topology, source: GridCoord) -> Vec<GridCoord> {
        let mut path = vec![source];
        let mut current = source;

        for _ in 0..self.config.river_max_steps {
            let cell = topology.get(current);
            if cell.elevation <= self.config.sea_level {
                break;
            }
            if path.len() > 1 && cell.water_level > 0.0 {
                break;
            }

            match topology.lowest_neighbor(current) {
                Some((next, elevation)) if elevation < cell.elevation => {
                    path.push(next);
                    current = next;
                }
                _ => break,
            }
        }

        path
    }

    /// Derive slope, aspect and drainage from the elevation field
    pub fn calculate_slopes(&self, topology: &mut Topology) {
        let width = topology.width;
        let height = topology.height;
        let mut derived = Vec::with_capacity(width * height);

        for y in 0..height {
            for x in 0..width {
                let elevation = |cx: usize, cy: usize| topology.get(GridCoord::new(cx, cy)).elevation;

                let left = x.saturating_sub(1);
                let right = (x + 1).min(width - 1);
                let up = y.saturating_sub(1);
                let down = (y + 1).min(height - 1);

                let dzdx = if right > left {
                    (elevation(right, y) - elevation(left, y)) / (right - left) as f64
                } else {
                    0.0
                };
                let dzdy = if down > up {
                    (elevation(x, down) - elevation(x, up)) / (down - up) as f64
                } else {
                    0.0
                };

                let gradient = (dzdx * dzdx + dzdy * dzdy).sqrt() * self.config.slope_scale;
                let slope = if gradient.is_finite() {
                    gradient.clamp(0.0, 1.0)
                } else {
                    0.0
                };
                // Aspect faces downhill
                let aspect = (-dzdy).atan2(-dzdx);
                let aspect = if aspect.is_finite() { aspect } else { 0.0 };

                let coord = GridCoord::new(x, y);
                let here = elevation(x, y);
                let mut lower = 0usize;
                let mut total = 0usize;
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        if let Some(n) = coord.checked_offset(dx, dy, width, height) {
                            total += 1;
                            if elevation(n.x, n.y) < here {
                                lower += 1;
                            }
                        }
                    }
                }
                let drainage = if total > 0 { lower as f64 / total as f64 } else { 0.0 };

                derived.push((slope, aspect, drainage));
            }
        }

        for (cell, (slope, aspect, drainage)) in topology.cells.iter_mut().zip(derived) {
            cell.slope = slope;
            cell.aspect = aspect;
            cell.drainage = cell.drainage.max(drainage).min(1.0);
        }
    }

    /// Rock hardness from low-frequency noise; soil is deeper on soft flat ground
    pub fn assign_hardness(&self, topology: &mut Topology) {
        for y in 0..topology.height {
            for x in 0..topology.width {
                let n = self
                    .hardness_noise
                    .get([x as f64 * 0.08 + self.offset.1, y as f64 * 0.08 + self.offset.0]);
                let cell = topology.get_mut(GridCoord::new(x, y));
                cell.hardness = (n * 0.5 + 0.5).clamp(0.0, 1.0);
                cell.soil_depth = ((1.0 - cell.slope) * (1.0 - 0.5 * cell.hardness)).clamp(0.0, 1.0);
            }
        }
    }

    /// One erosion pass. Steep cells shed material to their steepest downhill
    /// neighbour; deltas are buffered so cell order does not matter.
    /// Returns the total material removed.
    pub fn erode(&self, topology: &mut Topology) -> f64 {
        let width = topology.width;
        let mut elevation_delta = vec![0.0; topology.cells.len()];
        let mut eroded = vec![0.0; topology.cells.len()];
        let mut deposited = vec![0.0; topology.cells.len()];
        let mut total = 0.0;

        for coord in topology.coords().collect::<Vec<_>>() {
            let cell = topology.get(coord);
            if cell.slope <= self.config.erosion_slope_threshold {
                continue;
            }
            let Some((target, target_elevation)) = topology.lowest_neighbor(coord) else {
                continue;
            };
            if target_elevation >= cell.elevation {
                continue;
            }

            let amount = self.config.erosion_rate * cell.slope * (1.0 - cell.hardness);
            if amount <= 0.0 {
                continue;
            }
            let from = coord.y * width + coord.x;
            let to = target.y * width + target.x;
            elevation_delta[from] -= amount;
            eroded[from] += amount;
            elevation_delta[to] += amount * self.config.deposition_fraction;
            deposited[to] += amount * self.config.deposition_fraction;
            total += amount;
        }

        for (i, cell) in topology.cells.iter_mut().enumerate() {
            cell.elevation += elevation_delta[i];
            cell.erosion += eroded[i];
            cell.sediment += deposited[i];
        }
        topology.clamp_elevation(self.config.elevation_bounds);
        self.calculate_slopes(topology);

        total
    }
}

fn apply_features(topology: &mut Topology, features: &[LineFeature]) {
    for y in 0..topology.height {
        for x in 0..topology.width {
            let point = (x as f64 + 0.5, y as f64 + 0.5);
            let delta: f64 = features.iter().map(|f| f.influence(point)).sum();
            topology.get_mut(GridCoord::new(x, y)).elevation += delta;
        }
    }
}
