//! Two-phase entity update.
//!
//! Phase 1 runs everything that only touches the entity itself (biome drain,
//! event damage, ageing, wandering). Above the configured population threshold
//! it fans out over a fixed rayon pool; `install` returns only once every
//! entity has been processed, which is the barrier. Phase 2 accumulates
//! pairwise attraction and repulsion into the physics table and applies it,
//! always on the calling thread.

use crate::biome::BiomeCatalog;
use crate::entity::{find_entity, Entity, PhysicsState};
use crate::events::{exposure_at, EventFootprint};
use crate::grid::SpatialGrid;
use dashmap::DashMap;
use eco_core::{EntityId, Error, Result, Season, UpdaterConfig};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::f64::consts::PI;
use tracing::trace;

/// Per-tick inputs shared read-only by all workers
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub tick: u64,
    pub seed: u64,
    pub season: Season,
    pub is_night: bool,
    pub footprints: &'a [EventFootprint],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseReport {
    /// Whether the worker pool ran the phase
    pub parallel: bool,
    pub processed: usize,
    pub died: usize,
}

pub struct ConcurrentEntityUpdater {
    config: UpdaterConfig,
    pool: ThreadPool,
    physics: DashMap<EntityId, PhysicsState>,
}

impl ConcurrentEntityUpdater {
    pub fn new(config: UpdaterConfig) -> Result<Self> {
        config.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.worker_count)
            .thread_name(|index| format!("eco-worker-{}", index))
            .build()
            .map_err(|e| Error::ThreadPool(e.to_string()))?;

        Ok(Self {
            config,
            pool,
            physics: DashMap::new(),
        })
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn uses_pool(&self, living: usize) -> bool {
        living > self.config.parallel_threshold
    }

    pub fn physics(&self, id: EntityId) -> Option<PhysicsState> {
        self.physics.get(&id).map(|slot| *slot)
    }

    /// Phase 1: entity-local updates
    pub fn update_local(&self, entities: &mut [Entity], grid: &SpatialGrid, ctx: &TickContext<'_>) -> PhaseReport {
        let living = entities.iter().filter(|e| e.is_alive()).count();
        let parallel = self.uses_pool(living);

        if parallel {
            self.pool.install(|| {
                entities
                    .par_iter_mut()
                    .filter(|entity| entity.is_alive())
                    .for_each(|entity| self.update_entity(entity, grid, ctx));
            });
        } else {
            for entity in entities.iter_mut().filter(|e| e.is_alive()) {
                self.update_entity(entity, grid, ctx);
            }
        }

        let died = living - entities.iter().filter(|e| e.is_alive()).count();
        trace!(tick = ctx.tick, living, parallel, died, "Local entity phase complete");

        PhaseReport {
            parallel,
            processed: living,
            died,
        }
    }

    fn update_entity(&self, entity: &mut Entity, grid: &SpatialGrid, ctx: &TickContext<'_>) {
        let mut rng = ChaCha8Rng::seed_from_u64(entity_seed(ctx.seed, ctx.tick, entity.id));
        let profile = BiomeCatalog::profile(grid.cell_for(entity.position).biome);
        let exposure = exposure_at(ctx.footprints, grid.to_cell_space(entity.position));

        entity.mutation_load += profile.mutation_rate + exposure.mutation_pressure;
        let drain = profile.energy_drain * ctx.season.energy_drain_multiplier()
            + self.config.metabolic_cost
            + exposure.energy_damage;
        if !entity.consume_energy(drain) {
            self.physics.remove(&entity.id);
            return;
        }

        entity.tick(self.config.juvenile_age, self.config.elder_age);
        if entity.age >= self.config.max_age {
            entity.die();
            self.physics.remove(&entity.id);
            return;
        }

        let activity = if ctx.is_night { self.config.night_activity } else { 1.0 };
        entity.heading += rng.gen_range(-self.config.turn_rate..=self.config.turn_rate);
        let step = (entity.speed * profile.traits.speed * entity.life_stage.activity() * activity)
            .clamp(0.0, self.config.max_step);
        let (dx, dy) = (step * entity.heading.cos(), step * entity.heading.sin());

        let wanted = entity.position.offset(dx, dy);
        let target = wanted.clamp_to(grid.world_width(), grid.world_height());
        if target != wanted {
            // Turn around at the world edge
            entity.heading += PI;
        }
        entity.move_to(target);
        entity.consume_energy(step * self.config.movement_cost);

        self.physics.insert(
            entity.id,
            PhysicsState {
                velocity: (dx, dy),
                force: (0.0, 0.0),
            },
        );
    }

    /// Phase 2: pairwise forces. Forces are accumulated for every entity
    /// before any position changes. Returns the number of interacting pairs seen.
    pub fn resolve_interactions(&self, entities: &mut [Entity], grid: &SpatialGrid) -> usize {
        let c = &self.config;
        let cell = (grid.world_width() / grid.width() as f64).min(grid.world_height() / grid.height() as f64);
        let reach = (c.interaction_radius / cell).ceil().max(1.0) as i32;
        let mut pairs = 0;

        for entity in entities.iter().filter(|e| e.is_alive()) {
            let mut slot = self.physics.entry(entity.id).or_default();
            slot.force = (0.0, 0.0);

            for other_id in grid.entities_near(grid.coord_for(entity.position), reach) {
                if other_id == entity.id {
                    continue;
                }
                let Some(other) = find_entity(entities, other_id).filter(|o| o.is_alive()) else {
                    continue;
                };

                let dx = other.position.x - entity.position.x;
                let dy = other.position.y - entity.position.y;
                let distance = (dx * dx + dy * dy).sqrt();
                if distance <= 0.0 || distance > c.interaction_radius {
                    continue;
                }
                pairs += 1;

                let (ux, uy) = (dx / distance, dy / distance);
                if distance < c.repulsion_radius {
                    let push = c.repulsion_strength * (1.0 - distance / c.repulsion_radius);
                    slot.add_force(-ux * push, -uy * push);
                } else {
                    slot.add_force(ux * c.attraction_strength, uy * c.attraction_strength);
                }
            }
        }

        for entity in entities.iter_mut().filter(|e| e.is_alive()) {
            let Some((fx, fy)) = self.physics.get(&entity.id).map(|slot| slot.clamped_force(c.max_force)) else {
                continue;
            };
            let magnitude = (fx * fx + fy * fy).sqrt();
            if magnitude == 0.0 {
                continue;
            }
            let target = entity
                .position
                .offset(fx, fy)
                .clamp_to(grid.world_width(), grid.world_height());
            entity.move_to(target);
            entity.consume_energy(magnitude * c.movement_cost);
        }

        pairs
    }

    /// Drop physics slots of entities no longer in the arena
    pub fn forget_missing(&self, entities: &[Entity]) {
        self.physics.retain(|id, _| find_entity(entities, *id).is_some());
    }
}

/// Per-entity RNG seed, so results do not depend on which worker ran the entity
fn entity_seed(seed: u64, tick: u64, id: EntityId) -> u64 {
    let mut z = seed ^ tick.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ u64::from(id.0).wrapping_mul(0xD6E8_FEB8_6659_FD93);
    z = (z ^ (z >> 32)).wrapping_mul(0xD6E8_FEB8_6659_FD93);
    z ^ (z >> 32)
}
