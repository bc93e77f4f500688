//! Core type definitions for the world.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a mobile entity. Ids are handed out monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity-{}", self.0)
    }
}

/// Identifier of a plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlantId(pub u32);

impl fmt::Display for PlantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plant-{}", self.0)
    }
}

/// Identifier of an environmental or geological event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub u32);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event-{}", self.0)
    }
}

/// Continuous position in world units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Keep the position inside `[0, width] x [0, height]`
    pub fn clamp_to(&self, width: f64, height: f64) -> Self {
        Self {
            x: self.x.clamp(0.0, width),
            y: self.y.clamp(0.0, height),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Integer cell coordinate on the spatial grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: usize,
    pub y: usize,
}

impl GridCoord {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Apply a signed offset, returning `None` when the result leaves `[0,width) x [0,height)`.
    pub fn checked_offset(&self, dx: i32, dy: i32, width: usize, height: usize) -> Option<Self> {
        let x = self.x as i64 + dx as i64;
        let y = self.y as i64 + dy as i64;
        if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
            None
        } else {
            Some(Self::new(x as usize, y as usize))
        }
    }

    pub fn distance(&self, other: &GridCoord) -> f64 {
        let dx = self.x as f64 - other.x as f64;
        let dy = self.y as f64 - other.y as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// The eight compass directions of a cell's neighbourhood
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Direction {
    pub fn to_delta(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::NorthEast => (1, -1),
            Direction::NorthWest => (-1, -1),
            Direction::SouthEast => (1, 1),
            Direction::SouthWest => (-1, 1),
        }
    }

    /// Euclidean length of the step (1 or sqrt(2))
    pub fn step_length(&self) -> f64 {
        let (dx, dy) = self.to_delta();
        if dx != 0 && dy != 0 {
            std::f64::consts::SQRT_2
        } else {
            1.0
        }
    }

    pub fn all() -> [Direction; 8] {
        [
            Direction::North,
            Direction::South,
            Direction::East,
            Direction::West,
            Direction::NorthEast,
            Direction::NorthWest,
            Direction::SouthEast,
            Direction::SouthWest,
        ]
    }
}

/// Biome assigned to a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BiomeType {
    Plains,
    Grassland,
    Forest,
    Rainforest,
    Savanna,
    Desert,
    Tundra,
    Ice,
    Swamp,
    Water,
    DeepWater,
    Mountain,
    HighAltitude,
    Canyon,
    Cave,
    HotSpring,
    Volcanic,
    Radiation,
    /// Burned-out land left behind by wildfires
    Wasteland,
}

impl BiomeType {
    pub const ALL: [BiomeType; 19] = [
        BiomeType::Plains,
        BiomeType::Grassland,
        BiomeType::Forest,
        BiomeType::Rainforest,
        BiomeType::Savanna,
        BiomeType::Desert,
        BiomeType::Tundra,
        BiomeType::Ice,
        BiomeType::Swamp,
        BiomeType::Water,
        BiomeType::DeepWater,
        BiomeType::Mountain,
        BiomeType::HighAltitude,
        BiomeType::Canyon,
        BiomeType::Cave,
        BiomeType::HotSpring,
        BiomeType::Volcanic,
        BiomeType::Radiation,
        BiomeType::Wasteland,
    ];

    /// Stable numeric code, used by external collaborators that store biomes compactly
    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn is_water(&self) -> bool {
        matches!(self, BiomeType::Water | BiomeType::DeepWater)
    }

    /// Biomes a wildfire can burn through
    pub fn is_flammable(&self) -> bool {
        matches!(
            self,
            BiomeType::Forest | BiomeType::Rainforest | BiomeType::Plains | BiomeType::Tundra
        )
    }

    /// Biomes that attenuate a wildfire
    pub fn extinguishes_fire(&self) -> bool {
        matches!(
            self,
            BiomeType::Water | BiomeType::DeepWater | BiomeType::Ice | BiomeType::Swamp
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            BiomeType::Plains => "plains",
            BiomeType::Grassland => "grassland",
            BiomeType::Forest => "forest",
            BiomeType::Rainforest => "rainforest",
            BiomeType::Savanna => "savanna",
            BiomeType::Desert => "desert",
            BiomeType::Tundra => "tundra",
            BiomeType::Ice => "ice",
            BiomeType::Swamp => "swamp",
            BiomeType::Water => "water",
            BiomeType::DeepWater => "deep_water",
            BiomeType::Mountain => "mountain",
            BiomeType::HighAltitude => "high_altitude",
            BiomeType::Canyon => "canyon",
            BiomeType::Cave => "cave",
            BiomeType::HotSpring => "hot_spring",
            BiomeType::Volcanic => "volcanic",
            BiomeType::Radiation => "radiation",
            BiomeType::Wasteland => "wasteland",
        }
    }
}

impl fmt::Display for BiomeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Season of the year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub fn from_index(index: u64) -> Self {
        match index % 4 {
            0 => Season::Spring,
            1 => Season::Summer,
            2 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    /// Multiplier applied to biome energy drain
    pub fn energy_drain_multiplier(&self) -> f64 {
        match self {
            Season::Spring => 0.9,
            Season::Summer => 1.0,
            Season::Autumn => 1.05,
            Season::Winter => 1.25,
        }
    }
}

/// Transient hazards handled by the environmental event engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EnvironmentalEventType {
    Wildfire,
    Storm,
    VolcanicEruption,
    Flood,
    Hurricane,
    Tornado,
}

impl EnvironmentalEventType {
    pub const ALL: [EnvironmentalEventType; 6] = [
        EnvironmentalEventType::Wildfire,
        EnvironmentalEventType::Storm,
        EnvironmentalEventType::VolcanicEruption,
        EnvironmentalEventType::Flood,
        EnvironmentalEventType::Hurricane,
        EnvironmentalEventType::Tornado,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EnvironmentalEventType::Wildfire => "wildfire",
            EnvironmentalEventType::Storm => "storm",
            EnvironmentalEventType::VolcanicEruption => "volcanic_eruption",
            EnvironmentalEventType::Flood => "flood",
            EnvironmentalEventType::Hurricane => "hurricane",
            EnvironmentalEventType::Tornado => "tornado",
        }
    }
}

impl fmt::Display for EnvironmentalEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Terrain-mutating processes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GeologicalEventType {
    MountainUplift,
    Earthquake,
    Rift,
    VolcanicActivity,
    Subsidence,
}

impl GeologicalEventType {
    pub const ALL: [GeologicalEventType; 5] = [
        GeologicalEventType::MountainUplift,
        GeologicalEventType::Earthquake,
        GeologicalEventType::Rift,
        GeologicalEventType::VolcanicActivity,
        GeologicalEventType::Subsidence,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GeologicalEventType::MountainUplift => "mountain_uplift",
            GeologicalEventType::Earthquake => "earthquake",
            GeologicalEventType::Rift => "rift",
            GeologicalEventType::VolcanicActivity => "volcanic_activity",
            GeologicalEventType::Subsidence => "subsidence",
        }
    }
}

impl fmt::Display for GeologicalEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
