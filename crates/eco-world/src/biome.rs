//! Biome catalog, terrain-driven classification and the probabilistic
//! transition automaton.

use crate::grid::SpatialGrid;
use crate::terrain::Topology;
use eco_core::{BiomeConfig, BiomeType, Error, GridCoord, Result, TransitionRule, TransitionTrigger};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Multipliers applied to entity traits inside a biome
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TraitModifiers {
    pub speed: f64,
    pub vision: f64,
    pub size: f64,
}

/// Static reference data for one biome
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BiomeProfile {
    pub biome: BiomeType,
    /// Energy lost per tick by an entity standing in the biome
    pub energy_drain: f64,
    pub mutation_rate: f64,
    /// Degrees Celsius
    pub temperature: f64,
    /// Atmospheres
    pub pressure: f64,
    /// Fraction of sea-level oxygen
    pub oxygen: f64,
    pub humidity: f64,
    pub is_aquatic: bool,
    pub is_underground: bool,
    pub is_aerial: bool,
    pub traits: TraitModifiers,
}

const fn profile(
    biome: BiomeType,
    energy_drain: f64,
    mutation_rate: f64,
    climate: (f64, f64, f64, f64),
    flags: (bool, bool, bool),
    traits: (f64, f64, f64),
) -> BiomeProfile {
    BiomeProfile {
        biome,
        energy_drain,
        mutation_rate,
        temperature: climate.0,
        pressure: climate.1,
        oxygen: climate.2,
        humidity: climate.3,
        is_aquatic: flags.0,
        is_underground: flags.1,
        is_aerial: flags.2,
        traits: TraitModifiers {
            speed: traits.0,
            vision: traits.1,
            size: traits.2,
        },
    }
}

// Same order as `BiomeType::ALL`
static CATALOG: [BiomeProfile; 19] = [
    profile(BiomeType::Plains, 0.3, 0.001, (18.0, 1.0, 1.0, 0.5), (false, false, false), (1.0, 1.1, 1.0)),
    profile(BiomeType::Grassland, 0.3, 0.001, (20.0, 1.0, 1.0, 0.45), (false, false, false), (1.05, 1.1, 1.0)),
    profile(BiomeType::Forest, 0.25, 0.001, (15.0, 1.0, 1.05, 0.7), (false, false, false), (0.85, 0.8, 1.0)),
    profile(BiomeType::Rainforest, 0.35, 0.002, (27.0, 1.0, 1.1, 0.95), (false, false, false), (0.75, 0.7, 1.05)),
    profile(BiomeType::Savanna, 0.4, 0.001, (26.0, 1.0, 1.0, 0.35), (false, false, false), (1.1, 1.2, 1.0)),
    profile(BiomeType::Desert, 0.8, 0.002, (38.0, 1.0, 0.98, 0.1), (false, false, false), (0.9, 1.2, 0.9)),
    profile(BiomeType::Tundra, 0.7, 0.001, (-10.0, 1.0, 1.0, 0.3), (false, false, false), (0.85, 1.1, 1.1)),
    profile(BiomeType::Ice, 1.0, 0.001, (-25.0, 1.0, 1.0, 0.2), (false, false, false), (0.7, 1.0, 1.15)),
    profile(BiomeType::Swamp, 0.5, 0.003, (22.0, 1.0, 0.95, 0.95), (true, false, false), (0.7, 0.8, 1.0)),
    profile(BiomeType::Water, 0.6, 0.002, (14.0, 1.2, 0.9, 1.0), (true, false, false), (0.8, 0.7, 1.0)),
    profile(BiomeType::DeepWater, 0.9, 0.003, (4.0, 3.0, 0.8, 1.0), (true, false, false), (0.7, 0.4, 1.1)),
    profile(BiomeType::Mountain, 0.7, 0.002, (5.0, 0.8, 0.85, 0.4), (false, false, false), (0.7, 1.3, 0.95)),
    profile(BiomeType::HighAltitude, 1.0, 0.004, (-5.0, 0.6, 0.7, 0.3), (false, false, true), (0.6, 1.4, 0.9)),
    profile(BiomeType::Canyon, 0.6, 0.002, (24.0, 1.0, 0.95, 0.2), (false, false, false), (0.8, 0.9, 1.0)),
    profile(BiomeType::Cave, 0.5, 0.004, (12.0, 1.05, 0.85, 0.8), (false, true, false), (0.8, 0.3, 0.95)),
    profile(BiomeType::HotSpring, 0.4, 0.005, (45.0, 1.0, 0.95, 0.9), (true, false, false), (0.9, 0.8, 1.0)),
    profile(BiomeType::Volcanic, 1.2, 0.01, (60.0, 1.0, 0.8, 0.2), (false, false, false), (0.8, 0.7, 0.95)),
    profile(BiomeType::Radiation, 1.5, 0.05, (20.0, 1.0, 0.95, 0.4), (false, false, false), (0.9, 0.9, 1.0)),
    profile(BiomeType::Wasteland, 0.9, 0.003, (30.0, 1.0, 0.9, 0.15), (false, false, false), (0.95, 1.1, 1.0)),
];

/// Read-only biome reference data
pub struct BiomeCatalog;

impl BiomeCatalog {
    pub fn profile(biome: BiomeType) -> &'static BiomeProfile {
        &CATALOG[biome as usize]
    }

    /// Resolve a raw biome code. Unknown codes fall back to plains so a bad
    /// value never stalls a tick.
    pub fn profile_for_code(code: u8) -> &'static BiomeProfile {
        match BiomeType::from_code(code) {
            Some(biome) => Self::profile(biome),
            None => {
                warn!(code, fallback = %BiomeType::Plains, "Unknown biome code, using fallback profile");
                Self::profile(BiomeType::Plains)
            }
        }
    }
}

/// Trigger strengths computed for one cell
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TriggerIntensities {
    pub heat: f64,
    pub water: f64,
    pub cold: f64,
    pub fire: f64,
}

impl TriggerIntensities {
    pub fn get(&self, trigger: TransitionTrigger) -> f64 {
        match trigger {
            TransitionTrigger::Heat => self.heat,
            TransitionTrigger::Water => self.water,
            TransitionTrigger::Cold => self.cold,
            TransitionTrigger::Fire => self.fire,
        }
    }
}

/// A biome change applied by the transition automaton
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiomeTransition {
    pub coord: GridCoord,
    pub from: BiomeType,
    pub to: BiomeType,
    pub trigger: TransitionTrigger,
}

pub struct BiomeClassifier {
    config: BiomeConfig,
    seed: u64,
    width: usize,
    height: usize,
    regional_phase: (f64, f64),
    rules_by_biome: BTreeMap<BiomeType, Vec<TransitionRule>>,
}

impl BiomeClassifier {
    pub fn new(config: BiomeConfig, width: usize, height: usize, seed: u64) -> Result<Self> {
        config.validate()?;
        if width == 0 || height == 0 {
            return Err(eco_core::Error::InvalidConfig(format!(
                "classifier needs a non-empty grid, got {}x{}",
                width, height
            )));
        }

        let mut rules_by_biome: BTreeMap<BiomeType, Vec<TransitionRule>> = BTreeMap::new();
        for rule in &config.transition_rules {
            rules_by_biome.entry(rule.from).or_default().push(rule.clone());
        }

        let regional_phase = (
            hash_unit(seed, 0, 0, 11) * std::f64::consts::TAU,
            hash_unit(seed, 0, 0, 12) * std::f64::consts::TAU,
        );

        Ok(Self {
            config,
            seed,
            width,
            height,
            regional_phase,
            rules_by_biome,
        })
    }

    pub fn config(&self) -> &BiomeConfig {
        &self.config
    }

    /// Blend of per-cell uniform noise, local jitter and a regional sine field, in [0,1)
    pub fn noise_blend(&self, x: usize, y: usize) -> f64 {
        let uniform = hash_unit(self.seed, x, y, 1);
        let jitter = hash_unit(self.seed, x, y, 2);
        let f = self.config.regional_frequency;
        let regional = 0.5
            + 0.25 * ((x as f64 * f + self.regional_phase.0).sin() + (y as f64 * f + self.regional_phase.1).cos());

        let c = &self.config;
        let total = c.uniform_weight + c.jitter_weight + c.regional_weight;
        let blend = (c.uniform_weight * uniform + c.jitter_weight * jitter + c.regional_weight * regional) / total;
        blend.clamp(0.0, 0.999_999)
    }

    /// Classify one cell. Pure: the same topology always yields the same biome.
    pub fn classify(&self, topology: &Topology, x: usize, y: usize) -> Result<BiomeType> {
        if x >= self.width || y >= self.height {
            return Err(Error::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        let cell = topology.cell_at(x, y)?;
        let c = &self.config;
        let elevation = cell.elevation;

        if elevation <= c.deep_water_elevation {
            return Ok(BiomeType::DeepWater);
        }
        if elevation <= c.water_elevation || cell.water_level >= c.water_level_threshold {
            return Ok(BiomeType::Water);
        }
        if elevation >= c.high_altitude_elevation {
            return Ok(BiomeType::HighAltitude);
        }
        if elevation >= c.mountain_elevation {
            return Ok(if cell.slope >= c.canyon_slope {
                BiomeType::Canyon
            } else {
                BiomeType::Mountain
            });
        }

        let blend = self.noise_blend(x, y);

        let edge = x.min(y).min(self.width - 1 - x).min(self.height - 1 - y) as f64;
        let edge = edge / (self.width.min(self.height) as f64 / 2.0).max(1.0);
        if edge < c.polar_band {
            return Ok(if blend < 0.75 { BiomeType::Ice } else { BiomeType::Tundra });
        }
        if edge < c.tundra_band {
            return Ok(BiomeType::Tundra);
        }

        if elevation <= c.swamp_elevation && cell.slope <= c.swamp_max_slope {
            return Ok(BiomeType::Swamp);
        }
        if blend >= c.radiation_threshold {
            return Ok(BiomeType::Radiation);
        }
        if blend >= c.hot_spring_threshold {
            return Ok(BiomeType::HotSpring);
        }

        let cx = (self.width as f64 - 1.0) / 2.0;
        let cy = (self.height as f64 - 1.0) / 2.0;
        let max_distance = (cx * cx + cy * cy).sqrt().max(1.0);
        let zone = ((x as f64 - cx).powi(2) + (y as f64 - cy).powi(2)).sqrt() / max_distance;

        let biome = if zone < c.tropical_zone {
            match blend {
                b if b < 0.4 => BiomeType::Rainforest,
                b if b < 0.65 => BiomeType::Forest,
                b if b < 0.85 => BiomeType::Grassland,
                _ => BiomeType::Savanna,
            }
        } else if zone < c.temperate_zone {
            match blend {
                b if b < 0.45 => BiomeType::Forest,
                b if b < 0.75 => BiomeType::Plains,
                _ => BiomeType::Grassland,
            }
        } else {
            match blend {
                b if b < 0.4 => BiomeType::Desert,
                b if b < 0.7 => BiomeType::Savanna,
                _ => BiomeType::Plains,
            }
        };
        Ok(biome)
    }

    /// Classify every cell of the grid from the topology
    pub fn classify_all(&self, topology: &Topology, grid: &mut SpatialGrid) -> Result<()> {
        for coord in grid.coords().collect::<Vec<_>>() {
            let biome = self.classify(topology, coord.x, coord.y)?;
            grid.set_biome(coord, biome);
        }
        Ok(())
    }

    /// Trigger intensities from the 3x3 neighbourhood, each neighbour weighted
    /// by `1/(1+distance)` and normalised by the total weight.
    pub fn trigger_intensities(
        &self,
        biomes: &[BiomeType],
        coord: GridCoord,
        rng: &mut ChaCha8Rng,
    ) -> TriggerIntensities {
        let mut triggers = TriggerIntensities::default();
        let mut total_weight = 0.0;

        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let Some(n) = coord.checked_offset(dx, dy, self.width, self.height) else {
                    continue;
                };
                let weight = 1.0 / (1.0 + ((dx * dx + dy * dy) as f64).sqrt());
                total_weight += weight;

                match biomes[n.y * self.width + n.x] {
                    BiomeType::HotSpring | BiomeType::Volcanic | BiomeType::Radiation => triggers.heat += weight,
                    BiomeType::Water | BiomeType::DeepWater | BiomeType::Swamp => triggers.water += weight,
                    BiomeType::Ice | BiomeType::Tundra => triggers.cold += weight,
                    _ => {}
                }
            }
        }

        if total_weight > 0.0 {
            triggers.heat /= total_weight;
            triggers.water /= total_weight;
            triggers.cold /= total_weight;
        }

        let own = biomes[coord.y * self.width + coord.x];
        if own.is_flammable() && rng.gen::<f64>() < self.config.fire_trigger_chance {
            triggers.fire = 1.0;
        }

        triggers
    }

    /// One scan of the transition automaton over every cell. Triggers are
    /// computed from the biomes as they were at the start of the scan, and a
    /// cell changes at most once per scan.
    pub fn apply_transitions(&self, grid: &mut SpatialGrid, rng: &mut ChaCha8Rng) -> Vec<BiomeTransition> {
        let snapshot = grid.biomes();
        let mut transitions = Vec::new();

        for (index, from) in snapshot.iter().copied().enumerate() {
            let Some(rules) = self.rules_by_biome.get(&from) else {
                continue;
            };
            let coord = grid.index_to_coord(index);
            let triggers = self.trigger_intensities(&snapshot, coord, rng);

            for rule in rules {
                let intensity = triggers.get(rule.trigger);
                if intensity <= 0.0 {
                    continue;
                }
                if rng.gen::<f64>() < rule.base_probability * intensity {
                    grid.set_biome(coord, rule.to);
                    transitions.push(BiomeTransition {
                        coord,
                        from,
                        to: rule.to,
                        trigger: rule.trigger,
                    });
                    break;
                }
            }
        }

        transitions
    }
}

/// Deterministic hash of (seed, cell, salt) to [0,1)
fn hash_unit(seed: u64, x: usize, y: usize, salt: u64) -> f64 {
    let mut z = seed
        ^ (x as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (y as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
        ^ salt.wrapping_mul(0x1656_67B1_9E37_79F9);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 11) as f64 / (1u64 << 53) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use eco_core::WorldConfig;
    use rand::SeedableRng;

    fn grid_of(size: usize, biome: BiomeType) -> SpatialGrid {
        let mut grid = SpatialGrid::new(&WorldConfig {
            grid_width: size,
            grid_height: size,
            world_width: size as f64,
            world_height: size as f64,
        })
        .unwrap();
        for coord in grid.coords().collect::<Vec<_>>() {
            grid.set_biome(coord, biome);
        }
        grid
    }

    fn flat(size: usize, elevation: f64) -> Topology {
        let mut topology = Topology::new(size, size);
        for coord in topology.coords().collect::<Vec<_>>() {
            topology.get_mut(coord).elevation = elevation;
        }
        topology
    }

    #[test]
    fn test_catalog_order_matches_enum() {
        for biome in BiomeType::ALL {
            assert_eq!(BiomeCatalog::profile(biome).biome, biome);
        }
    }

    #[test]
    fn test_unknown_code_falls_back() {
        assert_eq!(BiomeCatalog::profile_for_code(250).biome, BiomeType::Plains);
        assert_eq!(
            BiomeCatalog::profile_for_code(BiomeType::Ice.code()).biome,
            BiomeType::Ice
        );
    }

    #[test]
    fn test_classify_is_repeatable() {
        let classifier = BiomeClassifier::new(BiomeConfig::default(), 20, 20, 42).unwrap();
        let topology = flat(20, 0.1);
        let first = classifier.classify(&topology, 0, 0).unwrap();
        let second = classifier.classify(&topology, 0, 0).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_classify_out_of_range() {
        let classifier = BiomeClassifier::new(BiomeConfig::default(), 20, 20, 42).unwrap();
        assert!(classifier.classify(&flat(20, 0.1), 20, 3).is_err());
    }

    #[test]
    fn test_classify_wider_topology_rejected() {
        let classifier = BiomeClassifier::new(BiomeConfig::default(), 20, 20, 42).unwrap();
        let wide = flat(30, 0.1);
        assert!(matches!(
            classifier.classify(&wide, 25, 3),
            Err(Error::OutOfBounds { x: 25, width: 20, .. })
        ));
        assert!(classifier.classify(&wide, 19, 19).is_ok());
    }

    #[test]
    fn test_elevation_thresholds() {
        let classifier = BiomeClassifier::new(BiomeConfig::default(), 20, 20, 1).unwrap();
        assert_eq!(classifier.classify(&flat(20, -0.45), 10, 10).unwrap(), BiomeType::DeepWater);
        assert_eq!(classifier.classify(&flat(20, -0.2), 10, 10).unwrap(), BiomeType::Water);
        assert_eq!(classifier.classify(&flat(20, 0.8), 10, 10).unwrap(), BiomeType::HighAltitude);
        assert_eq!(classifier.classify(&flat(20, 0.5), 10, 10).unwrap(), BiomeType::Mountain);

        let mut steep = flat(20, 0.5);
        steep.get_mut(GridCoord::new(10, 10)).slope = 0.6;
        assert_eq!(classifier.classify(&steep, 10, 10).unwrap(), BiomeType::Canyon);

        let mut lake = flat(20, 0.1);
        lake.get_mut(GridCoord::new(10, 10)).water_level = 0.2;
        assert_eq!(classifier.classify(&lake, 10, 10).unwrap(), BiomeType::Water);
    }

    #[test]
    fn test_edges_are_polar() {
        let classifier = BiomeClassifier::new(BiomeConfig::default(), 40, 40, 9).unwrap();
        let topology = flat(40, 0.1);
        for x in 0..40 {
            let biome = classifier.classify(&topology, x, 0).unwrap();
            assert!(matches!(biome, BiomeType::Ice | BiomeType::Tundra));
        }
    }

    #[test]
    fn test_noise_blend_in_unit_range() {
        let classifier = BiomeClassifier::new(BiomeConfig::default(), 30, 30, 5).unwrap();
        for y in 0..30 {
            for x in 0..30 {
                let blend = classifier.noise_blend(x, y);
                assert!((0.0..1.0).contains(&blend));
            }
        }
    }

    #[test]
    fn test_heat_melts_adjacent_ice_only() {
        let classifier = BiomeClassifier::new(BiomeConfig::default(), 5, 5, 3).unwrap();
        let mut grid = grid_of(5, BiomeType::Ice);
        grid.set_biome(GridCoord::new(2, 2), BiomeType::HotSpring);
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        let mut melted = 0;
        for _ in 0..300 {
            melted += classifier.apply_transitions(&mut grid, &mut rng).len();
        }

        assert!(melted > 0);
        assert_eq!(grid.biome_at(GridCoord::new(0, 0)), BiomeType::Ice);
        assert_eq!(grid.biome_at(GridCoord::new(4, 4)), BiomeType::Ice);
        assert_eq!(grid.biome_at(GridCoord::new(2, 2)), BiomeType::HotSpring);
    }

    #[test]
    fn test_no_trigger_no_transition() {
        let classifier = BiomeClassifier::new(BiomeConfig::default(), 6, 6, 3).unwrap();
        let mut grid = grid_of(6, BiomeType::Desert);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for _ in 0..50 {
            assert!(classifier.apply_transitions(&mut grid, &mut rng).is_empty());
        }
    }

    #[test]
    fn test_one_transition_per_cell_per_scan() {
        let classifier = BiomeClassifier::new(BiomeConfig::default(), 8, 8, 3).unwrap();
        let mut grid = grid_of(8, BiomeType::Forest);
        for x in 0..8 {
            grid.set_biome(GridCoord::new(x, 3), BiomeType::Water);
            grid.set_biome(GridCoord::new(x, 5), BiomeType::Ice);
        }
        let mut rng = ChaCha8Rng::seed_from_u64(10);

        for _ in 0..20 {
            let transitions = classifier.apply_transitions(&mut grid, &mut rng);
            let mut coords: Vec<_> = transitions.iter().map(|t| t.coord).collect();
            coords.sort();
            coords.dedup();
            assert_eq!(coords.len(), transitions.len());
        }
    }

    #[test]
    fn test_trigger_weights() {
        let classifier = BiomeClassifier::new(BiomeConfig::default(), 3, 3, 3).unwrap();
        let mut biomes = vec![BiomeType::Desert; 9];
        biomes[1] = BiomeType::Water; // orthogonal neighbour of the centre
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let triggers = classifier.trigger_intensities(&biomes, GridCoord::new(1, 1), &mut rng);
        let orth = 0.5;
        let diag = 1.0 / (1.0 + std::f64::consts::SQRT_2);
        let expected = orth / (4.0 * orth + 4.0 * diag);
        assert!((triggers.water - expected).abs() < 1e-12);
        assert_eq!(triggers.heat, 0.0);
        assert_eq!(triggers.fire, 0.0);
    }
}
