//! Environmental event engine.
//!
//! Events move through `spawned -> active -> expired | extinguished`. Each tick
//! an active event loses one tick of duration, follows the wind if it is wind
//! sensitive, grows toward its maximum radius and rewrites the biomes it
//! spreads over. Radii and speeds are in cells, positions in world units.

use crate::environment::{Clock, WindField, WindSample};
use crate::grid::SpatialGrid;
use crate::notifications::{
    EndReason, EventEndDetails, EventStartDetails, Notification, TransitionCause, TransitionDetails,
};
use eco_core::{
    BiomeType, EnvironmentalEventType, Error, EventConfig, EventId, GridCoord, Position, Result,
    SpreadPattern,
};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Entity-facing effect magnitudes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EventEffects {
    pub energy_damage: f64,
    pub mutation_pressure: f64,
}

impl EventEffects {
    fn scaled(&self, factor: f64) -> Self {
        Self {
            energy_damage: self.energy_damage * factor,
            mutation_pressure: self.mutation_pressure * factor,
        }
    }

    fn accumulate(&mut self, other: EventEffects) {
        self.energy_damage += other.energy_damage;
        self.mutation_pressure += other.mutation_pressure;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentalEvent {
    pub id: EventId,
    pub kind: EnvironmentalEventType,
    pub position: Position,
    pub radius: f64,
    pub max_radius: f64,
    pub growth_per_tick: f64,
    /// [0,1]
    pub intensity: f64,
    pub intensity_decay: f64,
    /// Heading in radians
    pub direction: f64,
    pub speed: f64,
    pub base_speed: f64,
    pub wind_sensitive: bool,
    pub spread: SpreadPattern,
    /// Ticks remaining
    pub duration: i64,
    pub start_tick: u64,
    /// Cells whose biome this event changed, with the biome they had before
    pub affected_cells: BTreeMap<GridCoord, BiomeType>,
    pub effects: EventEffects,
}

impl EnvironmentalEvent {
    /// Linear falloff `1 - d/r` inside the radius, zero outside
    pub fn falloff(&self, distance: f64) -> f64 {
        if self.radius <= 0.0 || !distance.is_finite() || distance > self.radius {
            0.0
        } else {
            1.0 - distance / self.radius
        }
    }

    fn end_reason(&self, termination_intensity: f64) -> Option<EndReason> {
        if self.duration <= 0 {
            Some(EndReason::Expired)
        } else if self.intensity <= termination_intensity {
            Some(EndReason::Extinguished)
        } else {
            None
        }
    }
}

/// Snapshot of an event's reach, shared read-only with the entity workers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventFootprint {
    pub id: EventId,
    pub kind: EnvironmentalEventType,
    /// Cell space
    pub center: (f64, f64),
    pub radius: f64,
    pub effects: EventEffects,
}

impl EventFootprint {
    /// Effects felt at a cell-space point, falling off linearly to the edge
    pub fn exposure(&self, point: (f64, f64)) -> EventEffects {
        let distance = ((point.0 - self.center.0).powi(2) + (point.1 - self.center.1).powi(2)).sqrt();
        if self.radius <= 0.0 || !distance.is_finite() || distance > self.radius {
            return EventEffects::default();
        }
        self.effects.scaled(1.0 - distance / self.radius)
    }
}

/// Summed exposure from every footprint
pub fn exposure_at(footprints: &[EventFootprint], point: (f64, f64)) -> EventEffects {
    let mut total = EventEffects::default();
    for footprint in footprints {
        total.accumulate(footprint.exposure(point));
    }
    total
}

struct SpreadRule {
    from: BiomeType,
    to: BiomeType,
    probability: f64,
}

const fn rule(from: BiomeType, to: BiomeType, probability: f64) -> SpreadRule {
    SpreadRule { from, to, probability }
}

const WILDFIRE_RULES: &[SpreadRule] = &[
    rule(BiomeType::Forest, BiomeType::Wasteland, 1.0),
    rule(BiomeType::Rainforest, BiomeType::Wasteland, 1.0),
    rule(BiomeType::Plains, BiomeType::Wasteland, 1.0),
    rule(BiomeType::Tundra, BiomeType::Wasteland, 1.0),
];

const STORM_RULES: &[SpreadRule] = &[
    rule(BiomeType::Desert, BiomeType::Savanna, 0.08),
    rule(BiomeType::Savanna, BiomeType::Grassland, 0.06),
    rule(BiomeType::Wasteland, BiomeType::Plains, 0.1),
];

const ERUPTION_RULES: &[SpreadRule] = &[
    rule(BiomeType::Plains, BiomeType::Volcanic, 0.25),
    rule(BiomeType::Grassland, BiomeType::Volcanic, 0.25),
    rule(BiomeType::Forest, BiomeType::Volcanic, 0.2),
    rule(BiomeType::Savanna, BiomeType::Volcanic, 0.25),
    rule(BiomeType::Desert, BiomeType::Volcanic, 0.3),
    rule(BiomeType::Tundra, BiomeType::Volcanic, 0.2),
    rule(BiomeType::Mountain, BiomeType::Volcanic, 0.3),
    rule(BiomeType::Ice, BiomeType::Water, 0.4),
];

const FLOOD_RULES: &[SpreadRule] = &[
    rule(BiomeType::Plains, BiomeType::Swamp, 0.2),
    rule(BiomeType::Grassland, BiomeType::Swamp, 0.15),
    rule(BiomeType::Forest, BiomeType::Swamp, 0.1),
    rule(BiomeType::Savanna, BiomeType::Swamp, 0.1),
    rule(BiomeType::Wasteland, BiomeType::Swamp, 0.15),
];

const HURRICANE_RULES: &[SpreadRule] = &[
    rule(BiomeType::Plains, BiomeType::Swamp, 0.1),
    rule(BiomeType::Grassland, BiomeType::Swamp, 0.08),
    rule(BiomeType::Forest, BiomeType::Plains, 0.05),
    rule(BiomeType::Savanna, BiomeType::Swamp, 0.05),
];

const TORNADO_RULES: &[SpreadRule] = &[
    rule(BiomeType::Forest, BiomeType::Plains, 0.3),
    rule(BiomeType::Rainforest, BiomeType::Forest, 0.2),
];

fn spread_rules(kind: EnvironmentalEventType) -> &'static [SpreadRule] {
    match kind {
        EnvironmentalEventType::Wildfire => WILDFIRE_RULES,
        EnvironmentalEventType::Storm => STORM_RULES,
        EnvironmentalEventType::VolcanicEruption => ERUPTION_RULES,
        EnvironmentalEventType::Flood => FLOOD_RULES,
        EnvironmentalEventType::Hurricane => HURRICANE_RULES,
        EnvironmentalEventType::Tornado => TORNADO_RULES,
    }
}

pub struct EventEngine {
    config: EventConfig,
    events: Vec<EnvironmentalEvent>,
    next_id: u32,
}

impl EventEngine {
    pub fn new(config: EventConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            events: Vec::new(),
            next_id: 0,
        })
    }

    pub fn config(&self) -> &EventConfig {
        &self.config
    }

    /// Currently active events in spawn order
    pub fn active(&self) -> &[EnvironmentalEvent] {
        &self.events
    }

    pub fn get(&self, id: EventId) -> Option<&EnvironmentalEvent> {
        self.events.iter().find(|event| event.id == id)
    }

    /// Roll for a new random event. The chance is scaled down at night.
    pub fn maybe_spawn(
        &mut self,
        grid: &SpatialGrid,
        clock: &dyn Clock,
        tick: u64,
        rng: &mut ChaCha8Rng,
    ) -> Option<Notification> {
        if self.events.len() >= self.config.max_active {
            return None;
        }

        let mut chance = self.config.spawn_chance;
        if clock.is_night() {
            chance *= self.config.night_spawn_multiplier;
        }
        if rng.gen::<f64>() >= chance {
            return None;
        }

        let kind = *EnvironmentalEventType::ALL.choose(rng)?;
        let position = Position::new(
            rng.gen_range(0.0..grid.world_width()),
            rng.gen_range(0.0..grid.world_height()),
        );
        let (_, notification) = self.spawn_at(kind, position, grid, tick, rng);
        Some(notification)
    }

    /// Start an event of the given kind at a position, using the kind's template
    pub fn spawn_at(
        &mut self,
        kind: EnvironmentalEventType,
        position: Position,
        grid: &SpatialGrid,
        tick: u64,
        rng: &mut ChaCha8Rng,
    ) -> (EventId, Notification) {
        let template = self.config.templates.get(kind).clone();
        let id = EventId(self.next_id);
        self.next_id += 1;

        let event = EnvironmentalEvent {
            id,
            kind,
            position: position.clamp_to(grid.world_width(), grid.world_height()),
            radius: template.initial_radius,
            max_radius: template.max_radius,
            growth_per_tick: template.growth_per_tick,
            intensity: rng.gen_range(template.intensity.0..=template.intensity.1),
            intensity_decay: template.intensity_decay,
            direction: rng.gen_range(0.0..std::f64::consts::TAU),
            speed: template.base_speed,
            base_speed: template.base_speed,
            wind_sensitive: template.wind_sensitive,
            spread: template.spread,
            duration: i64::from(rng.gen_range(template.duration.0..=template.duration.1)),
            start_tick: tick,
            affected_cells: BTreeMap::new(),
            effects: EventEffects {
                energy_damage: template.energy_damage,
                mutation_pressure: template.mutation_pressure,
            },
        };

        info!(
            event = "event_start",
            event_id = id.0,
            kind = kind.name(),
            x = event.position.x,
            y = event.position.y,
            radius = event.radius,
            intensity = event.intensity,
            duration = event.duration,
            tick = tick,
            "Environmental event started"
        );

        let notification = Notification::EventStart {
            tick,
            event_id: id,
            event_type: kind,
            position: event.position,
            details: EventStartDetails {
                radius: event.radius,
                max_radius: event.max_radius,
                intensity: event.intensity,
                duration: event.duration,
                wind_sensitive: event.wind_sensitive,
            },
        };

        self.events.push(event);
        (id, notification)
    }

    /// Advance every active event by one tick and drop the ones that ended
    pub fn update(
        &mut self,
        grid: &mut SpatialGrid,
        wind: &dyn WindField,
        tick: u64,
        rng: &mut ChaCha8Rng,
    ) -> Vec<Notification> {
        let mut notifications = Vec::new();
        let mut events = std::mem::take(&mut self.events);

        for event in &mut events {
            self.advance(event, grid, wind, tick, rng, &mut notifications);
        }

        let termination = self.config.termination_intensity;
        events.retain(|event| match event.end_reason(termination) {
            None => true,
            Some(reason) => {
                info!(
                    event = "event_end",
                    event_id = event.id.0,
                    kind = event.kind.name(),
                    reason = ?reason,
                    intensity = event.intensity,
                    affected_cells = event.affected_cells.len(),
                    tick = tick,
                    "Environmental event ended"
                );
                notifications.push(Notification::EventEnd {
                    tick,
                    event_id: event.id,
                    event_type: event.kind,
                    position: event.position,
                    details: EventEndDetails {
                        reason,
                        final_intensity: event.intensity,
                        final_radius: event.radius,
                        affected_cells: event.affected_cells.len(),
                        ticks_active: tick.saturating_sub(event.start_tick) + 1,
                    },
                });
                false
            }
        });

        self.events = events;
        notifications
    }

    fn advance(
        &self,
        event: &mut EnvironmentalEvent,
        grid: &mut SpatialGrid,
        wind: &dyn WindField,
        tick: u64,
        rng: &mut ChaCha8Rng,
        notifications: &mut Vec<Notification>,
    ) {
        event.duration -= 1;

        let sample = if event.wind_sensitive {
            let sample = wind.wind_at(event.position);
            if sample.magnitude > 0.0 {
                let (wx, wy) = sample.components();
                event.direction = wy.atan2(wx);
            }
            event.speed = event.base_speed + sample.magnitude * self.config.wind_speed_factor;
            let (cell_w, cell_h) = (
                grid.world_width() / grid.width() as f64,
                grid.world_height() / grid.height() as f64,
            );
            event.position = event
                .position
                .offset(
                    event.speed * cell_w * event.direction.cos(),
                    event.speed * cell_h * event.direction.sin(),
                )
                .clamp_to(grid.world_width(), grid.world_height());
            sample
        } else {
            WindSample::calm()
        };

        event.radius = (event.radius + event.growth_per_tick).min(event.max_radius);

        match event.spread {
            SpreadPattern::WindDriven => self.spread_fire(event, grid, sample, tick, rng, notifications),
            SpreadPattern::Directional | SpreadPattern::Circular => {
                self.spread_by_rules(event, grid, tick, rng, notifications)
            }
        }

        event.intensity *= event.intensity_decay;
    }

    /// Burn flammable cells inside the radius; every extinguishing cell in
    /// reach attenuates the fire.
    fn spread_fire(
        &self,
        event: &mut EnvironmentalEvent,
        grid: &mut SpatialGrid,
        wind: WindSample,
        tick: u64,
        rng: &mut ChaCha8Rng,
        notifications: &mut Vec<Notification>,
    ) {
        let center = grid.to_cell_space(event.position);
        let (wx, wy) = wind.components();

        for coord in grid.cells_within(center, event.radius) {
            let biome = grid.biome_at(coord);
            if biome.extinguishes_fire() {
                event.intensity *= self.config.extinguish_factor;
                continue;
            }
            let Some(rule) = spread_rules(event.kind).iter().find(|r| r.from == biome) else {
                continue;
            };

            let dx = coord.x as f64 + 0.5 - center.0;
            let dy = coord.y as f64 + 0.5 - center.1;
            let distance = (dx * dx + dy * dy).sqrt();
            let alignment = if wind.magnitude > 0.0 && distance > 0.0 {
                ((dx * wx + dy * wy) / (distance * wind.magnitude)).max(0.0)
            } else {
                0.0
            };
            let probability = self.config.fire_base_spread + self.config.fire_wind_bonus * alignment
                - (distance / event.radius) * self.config.fire_distance_penalty;

            if rng.gen::<f64>() < probability {
                convert_cell(event, grid, coord, rule.to, tick, notifications);
            }
        }
    }

    fn spread_by_rules(
        &self,
        event: &mut EnvironmentalEvent,
        grid: &mut SpatialGrid,
        tick: u64,
        rng: &mut ChaCha8Rng,
        notifications: &mut Vec<Notification>,
    ) {
        let center = grid.to_cell_space(event.position);
        let rules = spread_rules(event.kind);

        for coord in grid.cells_within(center, event.radius) {
            let biome = grid.biome_at(coord);
            let Some(rule) = rules.iter().find(|r| r.from == biome) else {
                continue;
            };

            let dx = coord.x as f64 + 0.5 - center.0;
            let dy = coord.y as f64 + 0.5 - center.1;
            let distance = (dx * dx + dy * dy).sqrt();
            let mut probability = rule.probability * event.intensity * event.falloff(distance);

            // Directional events hit hardest along their leading edge
            if event.spread == SpreadPattern::Directional && distance > 0.0 {
                let heading = (dx * event.direction.cos() + dy * event.direction.sin()) / distance;
                probability *= 0.5 + 0.5 * heading.max(0.0);
            }

            if rng.gen::<f64>() < probability {
                convert_cell(event, grid, coord, rule.to, tick, notifications);
            }
        }
    }

    /// Record the active event id on every cell inside an event's radius
    pub fn mark_grid(&self, grid: &mut SpatialGrid) {
        grid.clear_events();
        for event in &self.events {
            let center = grid.to_cell_space(event.position);
            for coord in grid.cells_within(center, event.radius) {
                grid.mark_event(coord, event.id);
            }
        }
    }

    pub fn footprints(&self, grid: &SpatialGrid) -> Vec<EventFootprint> {
        self.events
            .iter()
            .map(|event| EventFootprint {
                id: event.id,
                kind: event.kind,
                center: grid.to_cell_space(event.position),
                radius: event.radius,
                effects: event.effects,
            })
            .collect()
    }

    /// Drop an event immediately without a completion record
    pub fn cancel(&mut self, id: EventId) -> Result<EnvironmentalEvent> {
        let index = self
            .events
            .iter()
            .position(|event| event.id == id)
            .ok_or_else(|| Error::NotFound(format!("event {}", id)))?;
        Ok(self.events.remove(index))
    }
}

fn convert_cell(
    event: &mut EnvironmentalEvent,
    grid: &mut SpatialGrid,
    coord: GridCoord,
    to: BiomeType,
    tick: u64,
    notifications: &mut Vec<Notification>,
) {
    let from = grid.set_biome(coord, to);
    event.affected_cells.entry(coord).or_insert(from);
    debug!(event_id = event.id.0, x = coord.x, y = coord.y, from = %from, to = %to, "Event changed biome");
    notifications.push(Notification::BiomeTransition {
        tick,
        position: grid.cell_center(coord),
        details: TransitionDetails {
            from,
            to,
            cause: TransitionCause::Event(event.kind),
        },
    });
}
