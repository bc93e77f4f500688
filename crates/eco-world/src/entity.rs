//! Entity and plant state.

use eco_core::{EntityId, EntitySample, PlantId, Position};
use serde::{Deserialize, Serialize};

/// Age bracket of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifeStage {
    Juvenile,
    Adult,
    Elder,
}

impl LifeStage {
    pub fn for_age(age: u64, juvenile_age: u64, elder_age: u64) -> Self {
        if age < juvenile_age {
            LifeStage::Juvenile
        } else if age < elder_age {
            LifeStage::Adult
        } else {
            LifeStage::Elder
        }
    }

    /// Multiplier on wander speed
    pub fn activity(&self) -> f64 {
        match self {
            LifeStage::Juvenile => 0.8,
            LifeStage::Adult => 1.0,
            LifeStage::Elder => 0.6,
        }
    }
}

/// A mobile entity in the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub position: Position,
    pub energy: f64,
    pub max_energy: f64,
    pub age: u64,
    pub life_stage: LifeStage,
    /// Heading in radians
    pub heading: f64,
    /// Base wander speed in world units per tick
    pub speed: f64,
    /// Accumulated mutation pressure
    pub mutation_load: f64,
    pub alive: bool,
}

impl Entity {
    pub fn new(id: EntityId, position: Position, energy: f64, max_energy: f64, speed: f64) -> Self {
        Self {
            id,
            position,
            energy,
            max_energy,
            age: 0,
            life_stage: LifeStage::Juvenile,
            heading: 0.0,
            speed,
            mutation_load: 0.0,
            alive: true,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive && self.energy > 0.0
    }

    pub fn add_energy(&mut self, amount: f64) {
        self.energy = (self.energy + amount).min(self.max_energy);
    }

    /// Spend energy; returns false and kills the entity when it runs out
    pub fn consume_energy(&mut self, amount: f64) -> bool {
        if self.energy > amount {
            self.energy -= amount;
            true
        } else {
            self.die();
            false
        }
    }

    pub fn die(&mut self) {
        self.energy = 0.0;
        self.alive = false;
    }

    pub fn move_to(&mut self, position: Position) {
        self.position = position;
    }

    pub fn tick(&mut self, juvenile_age: u64, elder_age: u64) {
        self.age += 1;
        self.life_stage = LifeStage::for_age(self.age, juvenile_age, elder_age);
    }

    pub fn sample(&self) -> EntitySample {
        EntitySample {
            energy: self.energy,
            age: self.age,
            mutation_load: self.mutation_load,
        }
    }
}

/// Per-entity physics slot, keyed by entity id in the updater's table
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicsState {
    /// Displacement from the local movement phase
    pub velocity: (f64, f64),
    /// Interaction force accumulated in the barrier phase
    pub force: (f64, f64),
}

impl PhysicsState {
    pub fn add_force(&mut self, fx: f64, fy: f64) {
        self.force.0 += fx;
        self.force.1 += fy;
    }

    /// Accumulated force limited to `max` in magnitude
    pub fn clamped_force(&self, max: f64) -> (f64, f64) {
        let magnitude = (self.force.0 * self.force.0 + self.force.1 * self.force.1).sqrt();
        if magnitude > max && magnitude > 0.0 {
            let scale = max / magnitude;
            (self.force.0 * scale, self.force.1 * scale)
        } else {
            self.force
        }
    }
}

/// A stationary food source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub id: PlantId,
    pub position: Position,
    pub biomass: f64,
    pub max_biomass: f64,
}

impl Plant {
    pub fn new(id: PlantId, position: Position, biomass: f64, max_biomass: f64) -> Self {
        Self {
            id,
            position,
            biomass: biomass.min(max_biomass),
            max_biomass,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.biomass > 0.0
    }

    pub fn damage(&mut self, amount: f64) {
        self.biomass = (self.biomass - amount).max(0.0);
    }

    /// Remove up to `amount` biomass, returning what was taken
    pub fn graze(&mut self, amount: f64) -> f64 {
        let taken = amount.min(self.biomass).max(0.0);
        self.biomass -= taken;
        taken
    }

    /// Grow by `rate` scaled by soil fertility
    pub fn regrow(&mut self, rate: f64, fertility: f64) {
        if self.is_alive() {
            self.biomass = (self.biomass + rate * fertility.clamp(0.0, 1.0)).min(self.max_biomass);
        }
    }
}

/// Binary search an id-ordered arena
pub fn find_entity(entities: &[Entity], id: EntityId) -> Option<&Entity> {
    entities
        .binary_search_by_key(&id, |e| e.id)
        .ok()
        .map(|index| &entities[index])
}

pub fn find_plant_mut(plants: &mut [Plant], id: PlantId) -> Option<&mut Plant> {
    match plants.binary_search_by_key(&id, |p| p.id) {
        Ok(index) => Some(&mut plants[index]),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_creation() {
        let entity = Entity::new(EntityId(1), Position::new(5.0, 5.0), 100.0, 150.0, 1.0);
        assert_eq!(entity.id, EntityId(1));
        assert_eq!(entity.life_stage, LifeStage::Juvenile);
        assert!(entity.is_alive());
    }

    #[test]
    fn test_energy_management() {
        let mut entity = Entity::new(EntityId(1), Position::default(), 100.0, 150.0, 1.0);

        assert!(entity.consume_energy(50.0));
        assert_eq!(entity.energy, 50.0);

        entity.add_energy(500.0);
        assert_eq!(entity.energy, 150.0);

        assert!(!entity.consume_energy(200.0));
        assert_eq!(entity.energy, 0.0);
        assert!(!entity.is_alive());
    }

    #[test]
    fn test_life_stages() {
        let mut entity = Entity::new(EntityId(1), Position::default(), 100.0, 150.0, 1.0);
        for _ in 0..50 {
            entity.tick(50, 400);
        }
        assert_eq!(entity.life_stage, LifeStage::Adult);
        entity.age = 399;
        entity.tick(50, 400);
        assert_eq!(entity.life_stage, LifeStage::Elder);
    }

    #[test]
    fn test_force_clamp() {
        let mut physics = PhysicsState::default();
        physics.add_force(3.0, 4.0);
        let (fx, fy) = physics.clamped_force(1.0);
        assert!(((fx * fx + fy * fy).sqrt() - 1.0).abs() < 1e-12);
        assert_eq!(physics.clamped_force(10.0), (3.0, 4.0));
    }

    #[test]
    fn test_plant_lifecycle() {
        let mut plant = Plant::new(PlantId(0), Position::default(), 5.0, 10.0);
        assert_eq!(plant.graze(2.0), 2.0);
        plant.regrow(1.0, 0.5);
        assert!((plant.biomass - 3.5).abs() < 1e-12);
        plant.damage(10.0);
        assert!(!plant.is_alive());
        plant.regrow(1.0, 1.0);
        assert_eq!(plant.biomass, 0.0);
    }

    #[test]
    fn test_arena_lookup() {
        let entities: Vec<Entity> = (0..5)
            .map(|i| Entity::new(EntityId(i * 2), Position::default(), 10.0, 10.0, 1.0))
            .collect();
        assert_eq!(find_entity(&entities, EntityId(4)).map(|e| e.id), Some(EntityId(4)));
        assert!(find_entity(&entities, EntityId(3)).is_none());
    }
}
