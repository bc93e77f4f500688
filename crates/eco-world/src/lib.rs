//! World tick engine.
//!
//! Terrain, biomes, environmental and geological events and the entity
//! population, advanced together one tick at a time by [`Simulation`].

pub mod biome;
pub mod entity;
pub mod environment;
pub mod events;
pub mod geology;
pub mod grid;
pub mod notifications;
pub mod simulation;
pub mod terrain;
pub mod updater;

pub use biome::{BiomeCatalog, BiomeClassifier, BiomeProfile, BiomeTransition};
pub use entity::{Entity, Plant};
pub use environment::{Clock, ConstantWind, NoiseWind, WindField, WindSample, WorldClock};
pub use events::{EnvironmentalEvent, EventEngine};
pub use geology::{GeologicalEvent, GeologyEngine};
pub use grid::{GridCell, SpatialGrid};
pub use notifications::Notification;
pub use simulation::{Simulation, SimulationResult, TickReport};
pub use terrain::{TerrainGenerator, Topology, TopologyCell};
pub use updater::ConcurrentEntityUpdater;
