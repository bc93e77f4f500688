//! Tick scheduler driving every subsystem in a fixed order.

use crate::biome::BiomeClassifier;
use crate::entity::{find_plant_mut, Entity, Plant};
use crate::environment::{Clock, NoiseWind, WindField, WorldClock};
use crate::events::{exposure_at, EnvironmentalEvent, EventEngine, EventFootprint};
use crate::geology::{GeologicalEvent, GeologyEngine};
use crate::grid::{SoilAttributes, SpatialGrid};
use crate::notifications::{
    GeologicalDetails, Notification, NotificationCounts, TransitionCause, TransitionDetails,
};
use crate::terrain::{TerrainGenerator, Topology};
use crate::updater::{ConcurrentEntityUpdater, TickContext};
use eco_core::{
    BiomeType, EntityId, EnvironmentalEventType, Error, EventId, GeologicalEventType, GridCoord,
    PlantConfig, PlantId, PopulationStats, Position, Result, SimulationConfig, StatsAccumulator,
};
use parking_lot::RwLock;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, event, info, instrument, Level};

/// Everything that happened during one tick
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: u64,
    pub notifications: Vec<Notification>,
    pub stats: PopulationStats,
    /// Whether the worker pool ran the local entity phase
    pub parallel: bool,
    pub interactions: usize,
    pub eroded: f64,
}

/// Summary returned by [`Simulation::run`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub ticks_run: u64,
    pub final_stats: PopulationStats,
    pub accumulated: StatsAccumulator,
    pub biome_counts: BTreeMap<BiomeType, usize>,
    pub notifications: NotificationCounts,
}

pub struct Simulation {
    config: SimulationConfig,
    grid: Arc<RwLock<SpatialGrid>>,
    topology: Topology,
    terrain: TerrainGenerator,
    classifier: BiomeClassifier,
    geology: GeologyEngine,
    events: EventEngine,
    updater: ConcurrentEntityUpdater,
    wind: Box<dyn WindField>,
    clock: WorldClock,
    entities: Vec<Entity>,
    plants: Vec<Plant>,
    next_entity_id: u32,
    next_plant_id: u32,
    /// Notifications raised between ticks by explicit spawns
    pending: Vec<Notification>,
    rng: ChaCha8Rng,
    tick: u64,
    counts: NotificationCounts,
    accumulated: StatsAccumulator,
    last_stats: PopulationStats,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        let mut grid = SpatialGrid::new(&config.world)?;
        let terrain = TerrainGenerator::new(config.terrain.clone(), config.world.clone(), config.seed)?;
        let topology = terrain.generate(&mut rng);

        let classifier = BiomeClassifier::new(
            config.biome.clone(),
            config.world.grid_width,
            config.world.grid_height,
            config.seed,
        )?;
        classifier.classify_all(&topology, &mut grid)?;
        assign_soil(&topology, &mut grid)?;

        let geology = GeologyEngine::new(
            config.geology.clone(),
            config.terrain.elevation_bounds,
            config.terrain.sea_level,
        )?;
        let events = EventEngine::new(config.events.clone())?;
        let updater = ConcurrentEntityUpdater::new(config.updater.clone())?;
        let wind = Box::new(NoiseWind::new(config.seed as u32, 0.004, 2.0, 0.01));
        let clock = WorldClock::new(config.ticks_per_day, config.days_per_season);

        let mut sim = Self {
            config,
            grid: Arc::new(RwLock::new(grid)),
            topology,
            terrain,
            classifier,
            geology,
            events,
            updater,
            wind,
            clock,
            entities: Vec::new(),
            plants: Vec::new(),
            next_entity_id: 0,
            next_plant_id: 0,
            pending: Vec::new(),
            rng,
            tick: 0,
            counts: NotificationCounts::default(),
            accumulated: StatsAccumulator::new(),
            last_stats: PopulationStats::default(),
        };

        let (world_w, world_h) = (sim.config.world.world_width, sim.config.world.world_height);
        for _ in 0..sim.config.initial_entities {
            let position = Position::new(sim.rng.gen_range(0.0..world_w), sim.rng.gen_range(0.0..world_h));
            sim.spawn_entity(position)?;
        }
        for _ in 0..sim.config.initial_plants {
            let position = Position::new(sim.rng.gen_range(0.0..world_w), sim.rng.gen_range(0.0..world_h));
            sim.spawn_plant(position)?;
        }
        rebuild_grid(&mut sim.grid.write(), &sim.entities, &sim.plants);
        sim.last_stats = sim.population_stats();

        info!(
            seed = sim.config.seed,
            grid_width = sim.config.world.grid_width,
            grid_height = sim.config.world.grid_height,
            entities = sim.entities.len(),
            plants = sim.plants.len(),
            "World initialised"
        );

        Ok(sim)
    }

    /// Replace the ambient wind field
    pub fn with_wind(mut self, wind: Box<dyn WindField>) -> Self {
        self.wind = wind;
        self
    }

    /// Run the simulation for the configured number of ticks
    pub fn run(&mut self) -> Result<SimulationResult> {
        self.run_with(|_| {})
    }

    /// Run the configured number of ticks, handing every tick report to `on_tick`
    #[instrument(skip(self, on_tick), fields(num_ticks = self.config.num_ticks))]
    pub fn run_with<F>(&mut self, mut on_tick: F) -> Result<SimulationResult>
    where
        F: FnMut(&TickReport),
    {
        info!("Starting simulation for {} ticks", self.config.num_ticks);

        for _ in 0..self.config.num_ticks {
            let report = self.step()?;
            on_tick(&report);
        }

        self.emit_run_summary();
        Ok(self.collect_results())
    }

    /// Advance the world by exactly one tick
    pub fn step(&mut self) -> Result<TickReport> {
        let tick = self.tick;
        let mut notifications = std::mem::take(&mut self.pending);

        self.clock.advance(tick);
        self.wind.advance(tick);

        let grid_lock = Arc::clone(&self.grid);
        let mut grid = grid_lock.write();

        // Terrain
        if let Some(started) = self.geology.maybe_spawn(&self.topology, tick, &mut self.rng) {
            notifications.push(geological_notification(&started, &grid, tick));
        }
        let geology = self.geology.apply(&mut self.topology, &mut self.rng);
        let erosion_interval = self.config.terrain.erosion_interval;
        let eroded = if erosion_interval > 0 && tick > 0 && tick % erosion_interval == 0 {
            self.terrain.erode(&mut self.topology)
        } else {
            if geology.touched > 0 {
                self.terrain.calculate_slopes(&mut self.topology);
            }
            0.0
        };
        for finished in &geology.finished {
            self.reclassify_around(&mut grid, finished, tick, &mut notifications)?;
        }

        // Environmental events
        if let Some(started) = self.events.maybe_spawn(&grid, &self.clock, tick, &mut self.rng) {
            notifications.push(started);
        }
        notifications.extend(self.events.update(&mut grid, self.wind.as_ref(), tick, &mut self.rng));
        self.events.mark_grid(&mut grid);

        // Biome automaton
        let interval = self.config.biome.transition_interval;
        if interval > 0 && tick > 0 && tick % interval == 0 {
            let transitions = self.classifier.apply_transitions(&mut grid, &mut self.rng);
            if !transitions.is_empty() {
                info!(event = "biome_transitions", tick = tick, count = transitions.len(), "Biome transitions applied");
            }
            for t in transitions {
                notifications.push(Notification::BiomeTransition {
                    tick,
                    position: grid.cell_center(t.coord),
                    details: TransitionDetails {
                        from: t.from,
                        to: t.to,
                        cause: TransitionCause::Rule(t.trigger),
                    },
                });
            }
        }

        // Entities: local phase, rebuild, interaction barrier
        let footprints = self.events.footprints(&grid);
        let ctx = TickContext {
            tick,
            seed: self.config.seed,
            season: self.clock.season(),
            is_night: self.clock.is_night(),
            footprints: &footprints,
        };
        let local = self.updater.update_local(&mut self.entities, &grid, &ctx);
        rebuild_grid(&mut grid, &self.entities, &self.plants);
        let interactions = self.updater.resolve_interactions(&mut self.entities, &grid);

        update_plants(&mut self.plants, &mut self.entities, &grid, &footprints, &self.config.plants);

        self.entities.retain(Entity::is_alive);
        self.plants.retain(Plant::is_alive);
        self.updater.forget_missing(&self.entities);
        rebuild_grid(&mut grid, &self.entities, &self.plants);
        drop(grid);

        let stats = self.population_stats();
        self.accumulated.update(&stats);
        for notification in &notifications {
            self.counts.record(notification);
        }

        let metrics_interval = self.config.metrics_interval;
        if metrics_interval > 0 && tick > 0 && tick % metrics_interval == 0 {
            self.emit_population_metrics(&stats);
        }

        debug!(
            tick = tick,
            living = stats.living,
            plants = stats.plants,
            active_events = stats.active_events,
            parallel = local.parallel,
            notifications = notifications.len(),
            "Tick complete"
        );

        self.last_stats = stats.clone();
        self.tick += 1;

        Ok(TickReport {
            tick,
            notifications,
            stats,
            parallel: local.parallel,
            interactions,
            eroded,
        })
    }

    fn reclassify_around(
        &self,
        grid: &mut SpatialGrid,
        finished: &GeologicalEvent,
        tick: u64,
        notifications: &mut Vec<Notification>,
    ) -> Result<()> {
        let center = (finished.center.x as f64 + 0.5, finished.center.y as f64 + 0.5);
        for coord in grid.cells_within(center, finished.radius) {
            let biome = self.classifier.classify(&self.topology, coord.x, coord.y)?;
            let from = grid.set_biome(coord, biome);
            if from != biome {
                notifications.push(Notification::BiomeTransition {
                    tick,
                    position: grid.cell_center(coord),
                    details: TransitionDetails {
                        from,
                        to: biome,
                        cause: TransitionCause::Terrain(finished.kind),
                    },
                });
            }
        }
        Ok(())
    }

    /// Add an entity at a position, clamped into the world
    pub fn spawn_entity(&mut self, position: Position) -> Result<EntityId> {
        if !position.is_finite() {
            return Err(Error::Other(format!("entity position {:?} is not finite", position)));
        }
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;

        let position = position.clamp_to(self.config.world.world_width, self.config.world.world_height);
        let speed = self.rng.gen_range(0.5..1.5);
        let mut entity = Entity::new(id, position, self.config.initial_energy, self.config.max_energy, speed);
        entity.heading = self.rng.gen_range(0.0..std::f64::consts::TAU);
        self.entities.push(entity);
        Ok(id)
    }

    pub fn spawn_plant(&mut self, position: Position) -> Result<PlantId> {
        if !position.is_finite() {
            return Err(Error::Other(format!("plant position {:?} is not finite", position)));
        }
        let id = PlantId(self.next_plant_id);
        self.next_plant_id += 1;

        let position = position.clamp_to(self.config.world.world_width, self.config.world.world_height);
        let plants = &self.config.plants;
        self.plants
            .push(Plant::new(id, position, plants.initial_biomass, plants.max_biomass));
        Ok(id)
    }

    /// Start an environmental event; its start notification is reported by the next tick
    pub fn spawn_event(&mut self, kind: EnvironmentalEventType, position: Position) -> Result<EventId> {
        if !position.is_finite() {
            return Err(Error::InvalidConfig(format!("event position {:?} is not finite", position)));
        }
        let grid = self.grid.read();
        let (id, notification) = self.events.spawn_at(kind, position, &grid, self.tick, &mut self.rng);
        self.pending.push(notification);
        Ok(id)
    }

    /// Start a geological event; its notification is reported by the next tick
    pub fn trigger_geological_event(
        &mut self,
        kind: GeologicalEventType,
        center: GridCoord,
        radius: f64,
        intensity: f64,
        duration: u32,
    ) -> Result<GeologicalEvent> {
        let grid = self.grid.read();
        grid.cell_at(center.x, center.y)?;
        let started = self
            .geology
            .trigger(kind, center, radius, intensity, duration, self.tick)?;
        self.pending.push(geological_notification(&started, &grid, self.tick));
        Ok(started)
    }

    /// Shared handle to the grid; readers see the state of the last finished tick
    pub fn grid(&self) -> Arc<RwLock<SpatialGrid>> {
        Arc::clone(&self.grid)
    }

    pub fn grid_snapshot(&self) -> SpatialGrid {
        self.grid.read().clone()
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn plants(&self) -> &[Plant] {
        &self.plants
    }

    pub fn active_events(&self) -> &[EnvironmentalEvent] {
        self.events.active()
    }

    pub fn geological_events(&self) -> &[GeologicalEvent] {
        self.geology.active()
    }

    pub fn updater(&self) -> &ConcurrentEntityUpdater {
        &self.updater
    }

    pub fn clock(&self) -> &WorldClock {
        &self.clock
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn stats(&self) -> &PopulationStats {
        &self.last_stats
    }

    pub fn notification_counts(&self) -> NotificationCounts {
        self.counts
    }

    fn population_stats(&self) -> PopulationStats {
        PopulationStats::from_samples(
            self.tick,
            self.entities.iter().filter(|e| e.is_alive()).map(Entity::sample),
            self.plants.len(),
            self.events.active().len(),
        )
    }

    fn emit_population_metrics(&self, stats: &PopulationStats) {
        info!(
            event = "population_metrics",
            tick = stats.tick,
            living = stats.living,
            mean_energy = stats.mean_energy,
            min_energy = stats.min_energy,
            max_energy = stats.max_energy,
            mean_age = stats.mean_age,
            mean_mutation_load = stats.mean_mutation_load,
            plants = stats.plants,
            active_events = stats.active_events,
            geological_events = self.geology.active().len(),
            season = ?self.clock.season(),
            "Population metrics snapshot"
        );

        event!(
            Level::INFO,
            gauge_name = "population_living",
            gauge_value = stats.living,
            tick = stats.tick,
            "Population gauge"
        );

        event!(
            Level::INFO,
            gauge_name = "mean_energy",
            gauge_value = stats.mean_energy,
            tick = stats.tick,
            "Mean energy"
        );

        event!(
            Level::INFO,
            gauge_name = "active_events",
            gauge_value = stats.active_events,
            tick = stats.tick,
            "Active environmental events"
        );
    }

    fn emit_run_summary(&self) {
        let counts = self.counts;
        info!(
            event = "run_summary",
            ticks = self.tick,
            living = self.last_stats.living,
            plants = self.last_stats.plants,
            avg_living = self.accumulated.avg_living,
            avg_mean_energy = self.accumulated.avg_mean_energy,
            peak_living = self.accumulated.peak_living,
            peak_active_events = self.accumulated.peak_active_events,
            events_started = counts.event_start,
            events_ended = counts.event_end,
            biome_transitions = counts.biome_transition,
            geological_events = counts.geological_event,
            "Simulation complete"
        );

        event!(
            Level::INFO,
            gauge_name = "final_population",
            gauge_value = self.last_stats.living,
            "Final population gauge"
        );
    }

    fn collect_results(&self) -> SimulationResult {
        SimulationResult {
            ticks_run: self.tick,
            final_stats: self.last_stats.clone(),
            accumulated: self.accumulated.clone(),
            biome_counts: self.grid.read().biome_counts(),
            notifications: self.counts,
        }
    }
}

/// Clear the per-cell lists and place every living entity and plant again
pub fn rebuild_grid(grid: &mut SpatialGrid, entities: &[Entity], plants: &[Plant]) {
    grid.clear();
    for entity in entities.iter().filter(|e| e.is_alive()) {
        grid.place_entity(entity.id, entity.position);
    }
    for plant in plants.iter().filter(|p| p.is_alive()) {
        grid.place_plant(plant.id, plant.position);
    }
}

/// Event damage, grazing and regrowth
fn update_plants(
    plants: &mut [Plant],
    entities: &mut [Entity],
    grid: &SpatialGrid,
    footprints: &[EventFootprint],
    config: &PlantConfig,
) {
    for plant in plants.iter_mut() {
        let exposure = exposure_at(footprints, grid.to_cell_space(plant.position));
        if exposure.energy_damage > 0.0 {
            plant.damage(exposure.energy_damage);
        }
        plant.regrow(config.regrowth_rate, grid.cell_for(plant.position).soil.fertility);
    }

    for entity in entities.iter_mut().filter(|e| e.is_alive() && e.energy < e.max_energy) {
        for plant_id in &grid.cell_for(entity.position).plants {
            let Some(plant) = find_plant_mut(plants, *plant_id).filter(|p| p.is_alive()) else {
                continue;
            };
            let eaten = plant.graze(config.graze_amount);
            entity.add_energy(eaten * config.energy_per_biomass);
            break;
        }
    }
}

/// Soil fertility and moisture from depth, drainage and standing water
fn assign_soil(topology: &Topology, grid: &mut SpatialGrid) -> Result<()> {
    for coord in topology.coords() {
        let cell = topology.get(coord);
        let moisture = (cell.water_level * 5.0 + (1.0 - cell.drainage) * 0.5).clamp(0.0, 1.0);
        let fertility = (cell.soil_depth * 0.7 + moisture * 0.3).clamp(0.0, 1.0);
        grid.cell_at_mut(coord.x, coord.y)?.soil = SoilAttributes { fertility, moisture };
    }
    Ok(())
}

fn geological_notification(event: &GeologicalEvent, grid: &SpatialGrid, tick: u64) -> Notification {
    Notification::GeologicalEvent {
        tick,
        event_type: event.kind,
        position: grid.cell_center(event.center),
        details: GeologicalDetails {
            radius: event.radius,
            intensity: event.intensity,
            duration: event.duration,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::ConstantWind;
    use eco_core::WorldConfig;

    fn small_config(seed: u64) -> SimulationConfig {
        let mut config = SimulationConfig {
            seed,
            num_ticks: 30,
            initial_entities: 30,
            initial_plants: 40,
            world: WorldConfig {
                grid_width: 24,
                grid_height: 24,
                world_width: 240.0,
                world_height: 240.0,
            },
            ..Default::default()
        };
        config.metrics_interval = 10;
        config
    }

    #[test]
    fn test_simulation_creation() {
        let sim = Simulation::new(small_config(1)).unwrap();
        assert_eq!(sim.entities().len(), 30);
        assert_eq!(sim.plants().len(), 40);
        assert_eq!(sim.tick(), 0);

        let grid = sim.grid_snapshot();
        let placed: usize = grid.iter().map(|(_, cell)| cell.entities.len()).sum();
        assert_eq!(placed, 30);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = small_config(1);
        config.world.grid_width = 0;
        assert!(matches!(Simulation::new(config), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_step_advances_tick() {
        let mut sim = Simulation::new(small_config(2)).unwrap();
        let report = sim.step().unwrap();
        assert_eq!(report.tick, 0);
        assert_eq!(sim.tick(), 1);
        assert!(!report.parallel);
    }

    #[test]
    fn test_run_collects_results() {
        let mut sim = Simulation::new(small_config(3)).unwrap();
        let result = sim.run().unwrap();
        assert_eq!(result.ticks_run, 30);
        assert_eq!(result.accumulated.samples, 30);
        assert_eq!(result.biome_counts.values().sum::<usize>(), 24 * 24);
    }

    #[test]
    fn test_spawned_event_is_reported_next_tick() {
        let mut config = small_config(4);
        config.events.spawn_chance = 0.0;
        let mut sim = Simulation::new(config)
            .unwrap()
            .with_wind(Box::new(ConstantWind::new(0.0, 0.0)));
        let id = sim
            .spawn_event(EnvironmentalEventType::Flood, Position::new(120.0, 120.0))
            .unwrap();
        let report = sim.step().unwrap();

        assert!(report.notifications.iter().any(|n| matches!(
            n,
            Notification::EventStart { event_id, .. } if *event_id == id
        )));
        assert_eq!(sim.notification_counts().event_start, 1);
    }

    #[test]
    fn test_geological_trigger_out_of_grid() {
        let mut sim = Simulation::new(small_config(5)).unwrap();
        let result = sim.trigger_geological_event(
            GeologicalEventType::Rift,
            GridCoord::new(100, 0),
            3.0,
            0.5,
            5,
        );
        assert!(matches!(result, Err(Error::OutOfBounds { .. })));
    }

    #[test]
    fn test_non_finite_spawn_rejected() {
        let mut sim = Simulation::new(small_config(6)).unwrap();
        assert!(sim.spawn_entity(Position::new(f64::NAN, 1.0)).is_err());
        assert!(sim.spawn_plant(Position::new(1.0, f64::INFINITY)).is_err());
    }

    #[test]
    fn test_non_finite_event_rejected() {
        let mut config = small_config(6);
        config.events.spawn_chance = 0.0;
        config.geology.spawn_chance = 0.0;
        let mut sim = Simulation::new(config).unwrap();
        let living = sim.entities().len();

        let result = sim.spawn_event(EnvironmentalEventType::Storm, Position::new(f64::NAN, 10.0));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
        assert!(sim.active_events().is_empty());

        let report = sim.step().unwrap();
        assert!(!report
            .notifications
            .iter()
            .any(|n| matches!(n, Notification::EventStart { .. })));
        assert_eq!(sim.entities().len(), living);
        assert!(sim.entities().iter().all(|e| e.energy.is_finite()));
    }

    #[test]
    fn test_soil_assigned() {
        let sim = Simulation::new(small_config(7)).unwrap();
        let grid = sim.grid_snapshot();
        assert!(grid
            .iter()
            .all(|(_, cell)| (0.0..=1.0).contains(&cell.soil.fertility)));
    }
}
