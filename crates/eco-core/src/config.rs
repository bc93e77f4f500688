//! Configuration types for the world engine.

use crate::error::{Error, Result};
use crate::types::{BiomeType, EnvironmentalEventType};
use serde::{Deserialize, Serialize};

/// World geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Number of grid cells along x
    pub grid_width: usize,
    /// Number of grid cells along y
    pub grid_height: usize,
    /// Width of the continuous world in world units
    pub world_width: f64,
    /// Height of the continuous world in world units
    pub world_height: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            grid_width: 100,
            grid_height: 100,
            world_width: 1000.0,
            world_height: 1000.0,
        }
    }
}

impl WorldConfig {
    pub fn validate(&self) -> Result<()> {
        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(Error::InvalidConfig(format!(
                "grid dimensions must be positive, got {}x{}",
                self.grid_width, self.grid_height
            )));
        }
        if !(self.world_width.is_finite() && self.world_width > 0.0)
            || !(self.world_height.is_finite() && self.world_height > 0.0)
        {
            return Err(Error::InvalidConfig(format!(
                "world size must be positive and finite, got {}x{}",
                self.world_width, self.world_height
            )));
        }
        Ok(())
    }

    /// World units per grid cell along x and y
    pub fn cell_size(&self) -> (f64, f64) {
        (
            self.world_width / self.grid_width as f64,
            self.world_height / self.grid_height as f64,
        )
    }
}

/// Procedural terrain parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainConfig {
    /// Noise octaves accumulated into the base elevation
    pub octaves: u32,
    /// Amplitude of the first octave
    pub base_amplitude: f64,
    /// Frequency of the first octave, per world unit
    pub base_frequency: f64,
    /// Scale applied after normalising by the amplitude sum
    pub elevation_scale: f64,
    /// Number of mountain ranges (inclusive range)
    pub mountain_range_count: (u32, u32),
    pub mountain_height: (f64, f64),
    /// Gaussian width of a range, in cells
    pub mountain_width: (f64, f64),
    /// Segment length as a fraction of the shorter grid side
    pub feature_length: (f64, f64),
    pub valley_count: (u32, u32),
    pub valley_depth: (f64, f64),
    pub valley_width: (f64, f64),
    pub lake_count: (u32, u32),
    /// Cells sampled when searching for a lake basin
    pub lake_sample_count: u32,
    pub lake_radius: (f64, f64),
    pub lake_depth: (f64, f64),
    pub river_count: (u32, u32),
    /// Cells sampled when searching for a river source
    pub river_source_samples: u32,
    pub river_max_steps: usize,
    /// Rivers shorter than this are discarded
    pub river_min_length: usize,
    pub river_depth: f64,
    pub river_carve: f64,
    pub sea_level: f64,
    /// Multiplier turning the elevation gradient into a [0,1] slope
    pub slope_scale: f64,
    /// Ticks between erosion passes
    pub erosion_interval: u64,
    pub erosion_rate: f64,
    pub erosion_slope_threshold: f64,
    /// Share of eroded material deposited downhill
    pub deposition_fraction: f64,
    /// Accumulated elevation is clamped into this range
    pub elevation_bounds: (f64, f64),
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            octaves: 4,
            base_amplitude: 0.4,
            base_frequency: 0.01,
            elevation_scale: 0.8,
            mountain_range_count: (2, 6),
            mountain_height: (0.2, 0.4),
            mountain_width: (2.0, 5.0),
            feature_length: (0.2, 0.6),
            valley_count: (2, 6),
            valley_depth: (0.1, 0.25),
            valley_width: (1.5, 4.0),
            lake_count: (1, 3),
            lake_sample_count: 100,
            lake_radius: (2.0, 5.0),
            lake_depth: (0.1, 0.2),
            river_count: (2, 5),
            river_source_samples: 50,
            river_max_steps: 100,
            river_min_length: 5,
            river_depth: 0.05,
            river_carve: 0.02,
            sea_level: -0.12,
            slope_scale: 5.0,
            erosion_interval: 10,
            erosion_rate: 0.002,
            erosion_slope_threshold: 0.1,
            deposition_fraction: 0.5,
            elevation_bounds: (-1.0, 1.5),
        }
    }
}

impl TerrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.octaves == 0 {
            return Err(Error::InvalidConfig("terrain needs at least one octave".into()));
        }
        if self.erosion_interval == 0 {
            return Err(Error::InvalidConfig("erosion_interval must be positive".into()));
        }
        if self.elevation_bounds.0 >= self.elevation_bounds.1 {
            return Err(Error::InvalidConfig(format!(
                "elevation bounds {:?} are empty",
                self.elevation_bounds
            )));
        }
        check_range("mountain_range_count", self.mountain_range_count)?;
        check_range("valley_count", self.valley_count)?;
        check_range("lake_count", self.lake_count)?;
        check_range("river_count", self.river_count)?;
        check_float_range("mountain_height", self.mountain_height)?;
        check_float_range("mountain_width", self.mountain_width)?;
        check_float_range("feature_length", self.feature_length)?;
        check_float_range("valley_depth", self.valley_depth)?;
        check_float_range("valley_width", self.valley_width)?;
        check_float_range("lake_radius", self.lake_radius)?;
        if self.lake_radius.0 <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "lake_radius {:?} must be positive",
                self.lake_radius
            )));
        }
        check_float_range("lake_depth", self.lake_depth)?;
        Ok(())
    }
}

/// Trigger that can drive a biome transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionTrigger {
    Heat,
    Water,
    Cold,
    Fire,
}

/// One row of the probabilistic biome transition table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRule {
    pub from: BiomeType,
    pub to: BiomeType,
    pub trigger: TransitionTrigger,
    pub base_probability: f64,
}

impl TransitionRule {
    pub fn new(from: BiomeType, to: BiomeType, trigger: TransitionTrigger, base_probability: f64) -> Self {
        Self {
            from,
            to,
            trigger,
            base_probability,
        }
    }
}

/// Default transition table
pub fn default_transition_rules() -> Vec<TransitionRule> {
    use BiomeType as B;
    use TransitionTrigger as T;

    vec![
        // Water encroachment
        TransitionRule::new(B::Forest, B::Swamp, T::Water, 0.05),
        TransitionRule::new(B::Plains, B::Swamp, T::Water, 0.04),
        TransitionRule::new(B::Grassland, B::Forest, T::Water, 0.03),
        TransitionRule::new(B::Desert, B::Plains, T::Water, 0.03),
        TransitionRule::new(B::Savanna, B::Grassland, T::Water, 0.03),
        TransitionRule::new(B::Wasteland, B::Grassland, T::Water, 0.06),
        TransitionRule::new(B::Volcanic, B::Plains, T::Water, 0.02),
        // Cold spreading from ice and tundra
        TransitionRule::new(B::Tundra, B::Ice, T::Cold, 0.04),
        TransitionRule::new(B::Plains, B::Tundra, T::Cold, 0.02),
        TransitionRule::new(B::Forest, B::Tundra, T::Cold, 0.01),
        TransitionRule::new(B::Water, B::Ice, T::Cold, 0.01),
        // Heat from hot springs, volcanic and irradiated ground
        TransitionRule::new(B::Ice, B::Water, T::Heat, 0.08),
        TransitionRule::new(B::Tundra, B::Plains, T::Heat, 0.05),
        TransitionRule::new(B::Swamp, B::Plains, T::Heat, 0.03),
        TransitionRule::new(B::Forest, B::Savanna, T::Heat, 0.02),
        TransitionRule::new(B::Grassland, B::Desert, T::Heat, 0.02),
        // Spontaneous fire
        TransitionRule::new(B::Forest, B::Plains, T::Fire, 0.4),
        TransitionRule::new(B::Rainforest, B::Forest, T::Fire, 0.3),
        TransitionRule::new(B::Plains, B::Wasteland, T::Fire, 0.2),
        TransitionRule::new(B::Tundra, B::Plains, T::Fire, 0.1),
    ]
}

/// Thresholds and tables driving biome classification and transitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiomeConfig {
    pub deep_water_elevation: f64,
    pub water_elevation: f64,
    /// Cells holding at least this much standing water classify as water
    pub water_level_threshold: f64,
    pub swamp_elevation: f64,
    pub swamp_max_slope: f64,
    pub mountain_elevation: f64,
    pub high_altitude_elevation: f64,
    /// Mountain cells steeper than this become canyon
    pub canyon_slope: f64,
    /// Normalised distance from the edge treated as polar ice
    pub polar_band: f64,
    pub tundra_band: f64,
    /// Normalised distance from the centre treated as tropical
    pub tropical_zone: f64,
    pub temperate_zone: f64,
    /// Blend values above this produce hot springs
    pub hot_spring_threshold: f64,
    pub radiation_threshold: f64,
    pub uniform_weight: f64,
    pub jitter_weight: f64,
    pub regional_weight: f64,
    /// Frequency of the regional sine noise, per cell
    pub regional_frequency: f64,
    /// Ticks between transition scans
    pub transition_interval: u64,
    /// Independent per-scan chance of a fire trigger on flammable biomes
    pub fire_trigger_chance: f64,
    pub transition_rules: Vec<TransitionRule>,
}

impl Default for BiomeConfig {
    fn default() -> Self {
        Self {
            deep_water_elevation: -0.3,
            water_elevation: -0.12,
            water_level_threshold: 0.05,
            swamp_elevation: -0.04,
            swamp_max_slope: 0.15,
            mountain_elevation: 0.45,
            high_altitude_elevation: 0.65,
            canyon_slope: 0.3,
            polar_band: 0.04,
            tundra_band: 0.1,
            tropical_zone: 0.35,
            temperate_zone: 0.7,
            hot_spring_threshold: 0.985,
            radiation_threshold: 0.997,
            uniform_weight: 0.6,
            jitter_weight: 0.1,
            regional_weight: 0.3,
            regional_frequency: 0.05,
            transition_interval: 20,
            fire_trigger_chance: 0.005,
            transition_rules: default_transition_rules(),
        }
    }
}

impl BiomeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.transition_interval == 0 {
            return Err(Error::InvalidConfig("transition_interval must be positive".into()));
        }
        if self.deep_water_elevation > self.water_elevation {
            return Err(Error::InvalidConfig(
                "deep_water_elevation must not exceed water_elevation".into(),
            ));
        }
        if self.mountain_elevation > self.high_altitude_elevation {
            return Err(Error::InvalidConfig(
                "mountain_elevation must not exceed high_altitude_elevation".into(),
            ));
        }
        let weights = self.uniform_weight + self.jitter_weight + self.regional_weight;
        if weights <= 0.0 {
            return Err(Error::InvalidConfig("noise blend weights must sum above zero".into()));
        }
        for rule in &self.transition_rules {
            if !(0.0..=1.0).contains(&rule.base_probability) {
                return Err(Error::InvalidConfig(format!(
                    "transition {} -> {} has probability {} outside [0,1]",
                    rule.from, rule.to, rule.base_probability
                )));
            }
        }
        Ok(())
    }
}

/// How an environmental event moves across the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpreadPattern {
    WindDriven,
    Directional,
    Circular,
}

/// Initial parameter bundle for one event type. Radii and speeds are in cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventTemplate {
    /// Lifetime in ticks (inclusive range)
    pub duration: (u32, u32),
    pub initial_radius: f64,
    pub max_radius: f64,
    /// Radius growth per tick
    pub growth_per_tick: f64,
    pub base_speed: f64,
    pub wind_sensitive: bool,
    pub spread: SpreadPattern,
    pub intensity: (f64, f64),
    /// Per-tick intensity multiplier
    pub intensity_decay: f64,
    /// Energy damage at the centre of the event
    pub energy_damage: f64,
    /// Mutation-rate pressure at the centre of the event
    pub mutation_pressure: f64,
}

/// One template per event type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventTemplates {
    pub wildfire: EventTemplate,
    pub storm: EventTemplate,
    pub volcanic_eruption: EventTemplate,
    pub flood: EventTemplate,
    pub hurricane: EventTemplate,
    pub tornado: EventTemplate,
}

impl EventTemplates {
    pub fn get(&self, kind: EnvironmentalEventType) -> &EventTemplate {
        match kind {
            EnvironmentalEventType::Wildfire => &self.wildfire,
            EnvironmentalEventType::Storm => &self.storm,
            EnvironmentalEventType::VolcanicEruption => &self.volcanic_eruption,
            EnvironmentalEventType::Flood => &self.flood,
            EnvironmentalEventType::Hurricane => &self.hurricane,
            EnvironmentalEventType::Tornado => &self.tornado,
        }
    }
}

impl Default for EventTemplates {
    fn default() -> Self {
        Self {
            wildfire: EventTemplate {
                duration: (20, 40),
                initial_radius: 2.0,
                max_radius: 8.0,
                growth_per_tick: 0.5,
                base_speed: 0.3,
                wind_sensitive: true,
                spread: SpreadPattern::WindDriven,
                intensity: (0.7, 1.0),
                intensity_decay: 1.0,
                energy_damage: 8.0,
                mutation_pressure: 0.01,
            },
            storm: EventTemplate {
                duration: (15, 30),
                initial_radius: 5.0,
                max_radius: 12.0,
                growth_per_tick: 0.5,
                base_speed: 0.5,
                wind_sensitive: true,
                spread: SpreadPattern::Directional,
                intensity: (0.5, 0.9),
                intensity_decay: 0.98,
                energy_damage: 3.0,
                mutation_pressure: 0.0,
            },
            volcanic_eruption: EventTemplate {
                duration: (30, 55),
                initial_radius: 1.0,
                max_radius: 6.0,
                growth_per_tick: 0.25,
                base_speed: 0.0,
                wind_sensitive: false,
                spread: SpreadPattern::Circular,
                intensity: (0.8, 1.0),
                intensity_decay: 0.99,
                energy_damage: 12.0,
                mutation_pressure: 0.05,
            },
            flood: EventTemplate {
                duration: (25, 45),
                initial_radius: 3.0,
                max_radius: 10.0,
                growth_per_tick: 0.4,
                base_speed: 0.0,
                wind_sensitive: false,
                spread: SpreadPattern::Circular,
                intensity: (0.6, 0.9),
                intensity_decay: 0.985,
                energy_damage: 4.0,
                mutation_pressure: 0.0,
            },
            hurricane: EventTemplate {
                duration: (18, 30),
                initial_radius: 6.0,
                max_radius: 15.0,
                growth_per_tick: 0.6,
                base_speed: 0.8,
                wind_sensitive: true,
                spread: SpreadPattern::Directional,
                intensity: (0.7, 1.0),
                intensity_decay: 0.97,
                energy_damage: 6.0,
                mutation_pressure: 0.005,
            },
            tornado: EventTemplate {
                duration: (8, 16),
                initial_radius: 1.5,
                max_radius: 3.0,
                growth_per_tick: 0.3,
                base_speed: 1.5,
                wind_sensitive: true,
                spread: SpreadPattern::Directional,
                intensity: (0.7, 1.0),
                intensity_decay: 0.95,
                energy_damage: 10.0,
                mutation_pressure: 0.0,
            },
        }
    }
}

/// Environmental event engine parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    /// Chance per tick of spawning a new event during daytime
    pub spawn_chance: f64,
    /// Multiplier applied to the spawn chance at night
    pub night_spawn_multiplier: f64,
    pub max_active: usize,
    /// Wildfire intensity multiplier per extinguishing cell in its radius
    pub extinguish_factor: f64,
    /// Events at or below this intensity end
    pub termination_intensity: f64,
    /// Speed gained per unit of wind magnitude
    pub wind_speed_factor: f64,
    pub fire_base_spread: f64,
    /// Spread bonus for cells lying downwind of the fire
    pub fire_wind_bonus: f64,
    pub fire_distance_penalty: f64,
    pub templates: EventTemplates,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            spawn_chance: 0.05,
            night_spawn_multiplier: 0.5,
            max_active: 4,
            extinguish_factor: 0.7,
            termination_intensity: 0.1,
            wind_speed_factor: 0.5,
            fire_base_spread: 0.6,
            fire_wind_bonus: 0.25,
            fire_distance_penalty: 0.3,
            templates: EventTemplates::default(),
        }
    }
}

impl EventConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.spawn_chance) {
            return Err(Error::InvalidConfig(format!(
                "event spawn_chance {} outside [0,1]",
                self.spawn_chance
            )));
        }
        for kind in EnvironmentalEventType::ALL {
            let template = self.templates.get(kind);
            check_range(kind.name(), template.duration)?;
            check_float_range(kind.name(), template.intensity)?;
            if template.initial_radius <= 0.0 || template.max_radius < template.initial_radius {
                return Err(Error::InvalidConfig(format!(
                    "{} radius {} -> {} is invalid",
                    kind, template.initial_radius, template.max_radius
                )));
            }
        }
        Ok(())
    }
}

/// Geological event parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeologyConfig {
    pub spawn_chance: f64,
    pub max_active: usize,
    /// Radius in cells
    pub radius: (f64, f64),
    pub intensity: (f64, f64),
    pub duration: (u32, u32),
    /// Elevation gained per tick at full intensity
    pub uplift_rate: f64,
    pub subsidence_rate: f64,
    pub rift_rate: f64,
    pub earthquake_jitter: f64,
    /// Hardness change per tick at full intensity
    pub hardness_rate: f64,
}

impl Default for GeologyConfig {
    fn default() -> Self {
        Self {
            spawn_chance: 0.01,
            max_active: 3,
            radius: (2.0, 6.0),
            intensity: (0.2, 0.8),
            duration: (10, 30),
            uplift_rate: 0.01,
            subsidence_rate: 0.008,
            rift_rate: 0.012,
            earthquake_jitter: 0.02,
            hardness_rate: 0.005,
        }
    }
}

impl GeologyConfig {
    pub fn validate(&self) -> Result<()> {
        check_float_range("geology radius", self.radius)?;
        check_float_range("geology intensity", self.intensity)?;
        check_range("geology duration", self.duration)
    }
}

/// Entity update scheduling and physiology parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Living entity count above which the worker pool is used
    pub parallel_threshold: usize,
    pub worker_count: usize,
    /// Radius of attraction, in world units
    pub interaction_radius: f64,
    /// Radius inside which entities repel, in world units
    pub repulsion_radius: f64,
    pub attraction_strength: f64,
    pub repulsion_strength: f64,
    pub max_force: f64,
    /// Base energy spent every tick
    pub metabolic_cost: f64,
    /// Energy spent per world unit travelled
    pub movement_cost: f64,
    /// Maximum wander step in world units
    pub max_step: f64,
    /// Maximum heading change per tick, radians
    pub turn_rate: f64,
    pub juvenile_age: u64,
    pub elder_age: u64,
    pub max_age: u64,
    pub night_activity: f64,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 50,
            worker_count: 4,
            interaction_radius: 15.0,
            repulsion_radius: 4.0,
            attraction_strength: 0.02,
            repulsion_strength: 0.2,
            max_force: 1.0,
            metabolic_cost: 0.1,
            movement_cost: 0.02,
            max_step: 1.5,
            turn_rate: 0.5,
            juvenile_age: 50,
            elder_age: 400,
            max_age: 1000,
            night_activity: 0.5,
        }
    }
}

impl UpdaterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(Error::InvalidConfig("worker_count must be positive".into()));
        }
        if self.repulsion_radius > self.interaction_radius {
            return Err(Error::InvalidConfig(
                "repulsion_radius must not exceed interaction_radius".into(),
            ));
        }
        if self.juvenile_age > self.elder_age || self.elder_age > self.max_age {
            return Err(Error::InvalidConfig("life stage ages must be increasing".into()));
        }
        Ok(())
    }
}

/// Plant growth and grazing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantConfig {
    pub initial_biomass: f64,
    pub max_biomass: f64,
    /// Biomass regained per tick at full soil fertility
    pub regrowth_rate: f64,
    /// Biomass an entity eats per tick from a plant in its cell
    pub graze_amount: f64,
    pub energy_per_biomass: f64,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            initial_biomass: 6.0,
            max_biomass: 10.0,
            regrowth_rate: 0.08,
            graze_amount: 0.5,
            energy_per_biomass: 1.0,
        }
    }
}

impl PlantConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.initial_biomass > 0.0 && self.initial_biomass <= self.max_biomass) {
            return Err(Error::InvalidConfig(format!(
                "initial_biomass {} must be in (0, {}]",
                self.initial_biomass, self.max_biomass
            )));
        }
        if self.regrowth_rate < 0.0 || self.graze_amount < 0.0 || self.energy_per_biomass < 0.0 {
            return Err(Error::InvalidConfig("plant rates must not be negative".into()));
        }
        Ok(())
    }
}

/// Full simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Number of ticks `run` advances
    pub num_ticks: u64,
    pub initial_entities: usize,
    pub initial_plants: usize,
    pub initial_energy: f64,
    pub max_energy: f64,
    pub ticks_per_day: u64,
    pub days_per_season: u64,
    /// Ticks between population metric snapshots
    pub metrics_interval: u64,
    pub world: WorldConfig,
    pub terrain: TerrainConfig,
    pub biome: BiomeConfig,
    pub events: EventConfig,
    pub geology: GeologyConfig,
    pub updater: UpdaterConfig,
    pub plants: PlantConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            num_ticks: 1_000,
            initial_entities: 200,
            initial_plants: 300,
            initial_energy: 100.0,
            max_energy: 150.0,
            ticks_per_day: 24,
            days_per_season: 30,
            metrics_interval: 100,
            world: WorldConfig::default(),
            terrain: TerrainConfig::default(),
            biome: BiomeConfig::default(),
            events: EventConfig::default(),
            geology: GeologyConfig::default(),
            updater: UpdaterConfig::default(),
            plants: PlantConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        self.world.validate()?;
        self.terrain.validate()?;
        self.biome.validate()?;
        self.events.validate()?;
        self.geology.validate()?;
        self.updater.validate()?;
        self.plants.validate()?;
        if self.ticks_per_day == 0 || self.days_per_season == 0 {
            return Err(Error::InvalidConfig("day and season lengths must be positive".into()));
        }
        if !(self.initial_energy > 0.0 && self.initial_energy <= self.max_energy) {
            return Err(Error::InvalidConfig(format!(
                "initial_energy {} must be in (0, {}]",
                self.initial_energy, self.max_energy
            )));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

fn check_range(name: &str, range: (u32, u32)) -> Result<()> {
    if range.0 > range.1 {
        return Err(Error::InvalidConfig(format!("{} range {:?} is empty", name, range)));
    }
    Ok(())
}

fn check_float_range(name: &str, range: (f64, f64)) -> Result<()> {
    if !(range.0.is_finite() && range.1.is_finite()) || range.0 > range.1 {
        return Err(Error::InvalidConfig(format!("{} range {:?} is invalid", name, range)));
    }
    Ok(())
}
