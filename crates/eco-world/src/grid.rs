//! Spatial grid partitioning the continuous world into cells.
//!
//! Cells only hold ids; the entity and plant arenas stay authoritative and the
//! per-cell lists are cleared and repopulated every tick.

use eco_core::{BiomeType, EntityId, Error, EventId, GridCoord, PlantId, Position, Result, WorldConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Soil state of a cell, derived from the topology when the world is built
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SoilAttributes {
    /// Plant regrowth multiplier, [0,1]
    pub fertility: f64,
    /// [0,1]
    pub moisture: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridCell {
    pub biome: BiomeType,
    pub entities: Vec<EntityId>,
    pub plants: Vec<PlantId>,
    pub active_event: Option<EventId>,
    pub soil: SoilAttributes,
}

impl GridCell {
    fn new() -> Self {
        Self {
            biome: BiomeType::Plains,
            entities: Vec::new(),
            plants: Vec::new(),
            active_event: None,
            soil: SoilAttributes::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.plants.is_empty()
    }
}

/// Fixed W x H partition of a rectangular world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialGrid {
    width: usize,
    height: usize,
    world_width: f64,
    world_height: f64,
    cells: Vec<GridCell>,
}

impl SpatialGrid {
    pub fn new(config: &WorldConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            width: config.grid_width,
            height: config.grid_height,
            world_width: config.world_width,
            world_height: config.world_height,
            cells: vec![GridCell::new(); config.grid_width * config.grid_height],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn world_width(&self) -> f64 {
        self.world_width
    }

    pub fn world_height(&self) -> f64 {
        self.world_height
    }

    /// Empty every cell's entity and plant list, keeping their allocations
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.entities.clear();
            cell.plants.clear();
        }
    }

    /// Map a continuous position to its cell, clamping to the grid edges
    pub fn coord_for(&self, pos: Position) -> GridCoord {
        GridCoord::new(
            clamp_axis(pos.x, self.world_width, self.width),
            clamp_axis(pos.y, self.world_height, self.height),
        )
    }

    /// Position expressed in fractional cell units
    pub fn to_cell_space(&self, pos: Position) -> (f64, f64) {
        (
            pos.x / self.world_width * self.width as f64,
            pos.y / self.world_height * self.height as f64,
        )
    }

    /// Centre of a cell in world units
    pub fn cell_center(&self, coord: GridCoord) -> Position {
        Position::new(
            (coord.x as f64 + 0.5) * self.world_width / self.width as f64,
            (coord.y as f64 + 0.5) * self.world_height / self.height as f64,
        )
    }

    pub fn place_entity(&mut self, id: EntityId, pos: Position) -> GridCoord {
        let coord = self.coord_for(pos);
        let index = self.index(coord);
        self.cells[index].entities.push(id);
        coord
    }

    pub fn place_plant(&mut self, id: PlantId, pos: Position) -> GridCoord {
        let coord = self.coord_for(pos);
        let index = self.index(coord);
        self.cells[index].plants.push(id);
        coord
    }

    /// Look up a cell; coordinates outside the grid are rejected
    pub fn cell_at(&self, x: usize, y: usize) -> Result<&GridCell> {
        self.check_bounds(x, y)?;
        Ok(&self.cells[y * self.width + x])
    }

    pub fn cell_at_mut(&mut self, x: usize, y: usize) -> Result<&mut GridCell> {
        self.check_bounds(x, y)?;
        let width = self.width;
        Ok(&mut self.cells[y * width + x])
    }

    /// Cell containing a continuous position
    pub fn cell_for(&self, pos: Position) -> &GridCell {
        &self.cells[self.index(self.coord_for(pos))]
    }

    pub(crate) fn cell(&self, coord: GridCoord) -> &GridCell {
        &self.cells[self.index(coord)]
    }

    pub(crate) fn cell_mut(&mut self, coord: GridCoord) -> &mut GridCell {
        let index = self.index(coord);
        &mut self.cells[index]
    }

    pub fn biome_at(&self, coord: GridCoord) -> BiomeType {
        self.cell(coord).biome
    }

    /// Replace a cell's biome, returning the previous one
    pub fn set_biome(&mut self, coord: GridCoord, biome: BiomeType) -> BiomeType {
        std::mem::replace(&mut self.cell_mut(coord).biome, biome)
    }

    /// In-grid cells of the square neighbourhood, excluding the centre
    pub fn neighbors(&self, coord: GridCoord, radius: i32) -> Vec<GridCoord> {
        let mut neighbors = Vec::new();

        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx == 0 && dy == 0 {
                    continue;
                }
                if let Some(neighbor) = coord.checked_offset(dx, dy, self.width, self.height) {
                    neighbors.push(neighbor);
                }
            }
        }

        neighbors
    }

    /// Cells whose centre lies within `radius` cells of a cell-space point
    pub fn cells_within(&self, center: (f64, f64), radius: f64) -> Vec<GridCoord> {
        let mut cells = Vec::new();
        if !(center.0.is_finite() && center.1.is_finite()) || radius < 0.0 {
            return cells;
        }

        let min_x = (center.0 - radius - 0.5).floor().max(0.0) as usize;
        let min_y = (center.1 - radius - 0.5).floor().max(0.0) as usize;
        let max_x = ((center.0 + radius).ceil().max(0.0) as usize).min(self.width - 1);
        let max_y = ((center.1 + radius).ceil().max(0.0) as usize).min(self.height - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = x as f64 + 0.5 - center.0;
                let dy = y as f64 + 0.5 - center.1;
                if (dx * dx + dy * dy).sqrt() <= radius {
                    cells.push(GridCoord::new(x, y));
                }
            }
        }

        cells
    }

    /// Ids of entities in the cell and the ring of cells around it
    pub fn entities_near(&self, coord: GridCoord, radius: i32) -> impl Iterator<Item = EntityId> + '_ {
        let mut coords = self.neighbors(coord, radius);
        coords.push(coord);
        coords
            .into_iter()
            .flat_map(move |c| self.cell(c).entities.iter().copied())
    }

    pub fn clear_events(&mut self) {
        for cell in &mut self.cells {
            cell.active_event = None;
        }
    }

    pub fn mark_event(&mut self, coord: GridCoord, id: EventId) {
        self.cell_mut(coord).active_event = Some(id);
    }

    pub fn index_to_coord(&self, index: usize) -> GridCoord {
        GridCoord::new(index % self.width, index / self.width)
    }

    /// Iterator over all coordinates in row-major order
    pub fn coords(&self) -> impl Iterator<Item = GridCoord> + '_ {
        (0..self.cells.len()).map(move |i| self.index_to_coord(i))
    }

    /// Iterator over all cells with their coordinates
    pub fn iter(&self) -> impl Iterator<Item = (GridCoord, &GridCell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (self.index_to_coord(i), cell))
    }

    pub fn biomes(&self) -> Vec<BiomeType> {
        self.cells.iter().map(|cell| cell.biome).collect()
    }

    pub fn biome_counts(&self) -> BTreeMap<BiomeType, usize> {
        let mut counts = BTreeMap::new();
        for cell in &self.cells {
            *counts.entry(cell.biome).or_insert(0) += 1;
        }
        counts
    }

    fn check_bounds(&self, x: usize, y: usize) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    fn index(&self, coord: GridCoord) -> usize {
        debug_assert!(coord.x < self.width && coord.y < self.height);
        coord.y * self.width + coord.x
    }
}

/// `clamp(floor(v / extent * cells), 0, cells - 1)`
fn clamp_axis(value: f64, extent: f64, cells: usize) -> usize {
    let scaled = (value / extent * cells as f64).floor();
    if scaled.is_nan() || scaled < 0.0 {
        0
    } else {
        (scaled as usize).min(cells - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid(width: usize, height: usize, world: f64) -> SpatialGrid {
        SpatialGrid::new(&WorldConfig {
            grid_width: width,
            grid_height: height,
            world_width: world,
            world_height: world,
        })
        .unwrap()
    }

    #[test]
    fn test_grid_creation() {
        let grid = grid(10, 8, 100.0);
        assert_eq!(grid.width(), 10);
        assert_eq!(grid.height(), 8);
        assert_eq!(grid.cells.len(), 80);
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let config = WorldConfig {
            grid_width: 0,
            ..Default::default()
        };
        assert!(SpatialGrid::new(&config).is_err());
    }

    #[test]
    fn test_boundary_positions_clamp() {
        let grid = grid(10, 10, 100.0);
        assert_eq!(grid.coord_for(Position::new(100.0, 100.0)), GridCoord::new(9, 9));
        assert_eq!(grid.coord_for(Position::new(-0.001, 5.0)), GridCoord::new(0, 0));
        assert_eq!(grid.coord_for(Position::new(55.0, 19.9)), GridCoord::new(5, 1));
        assert_eq!(grid.coord_for(Position::new(f64::NAN, 1e12)), GridCoord::new(0, 9));
    }

    #[test]
    fn test_out_of_range_lookup_rejected() {
        let grid = grid(10, 10, 100.0);
        assert!(grid.cell_at(9, 9).is_ok());
        assert!(matches!(
            grid.cell_at(10, 0),
            Err(Error::OutOfBounds { x: 10, y: 0, .. })
        ));
        assert!(grid.cell_at(0, 10).is_err());
    }

    #[test]
    fn test_place_and_clear() {
        let mut grid = grid(10, 10, 100.0);
        let coord = grid.place_entity(EntityId(1), Position::new(12.0, 34.0));
        grid.place_entity(EntityId(2), Position::new(13.0, 35.0));
        grid.place_plant(PlantId(7), Position::new(12.0, 34.0));

        let cell = grid.cell_at(coord.x, coord.y).unwrap();
        assert_eq!(cell.entities, vec![EntityId(1), EntityId(2)]);
        assert_eq!(cell.plants, vec![PlantId(7)]);

        grid.set_biome(coord, BiomeType::Forest);
        grid.clear();
        let cell = grid.cell_at(coord.x, coord.y).unwrap();
        assert!(cell.is_empty());
        assert_eq!(cell.biome, BiomeType::Forest);
    }

    #[test]
    fn test_neighbors() {
        let grid = grid(10, 10, 100.0);
        assert_eq!(grid.neighbors(GridCoord::new(5, 5), 1).len(), 8);
        assert_eq!(grid.neighbors(GridCoord::new(0, 0), 1).len(), 3);
        assert_eq!(grid.neighbors(GridCoord::new(9, 5), 1).len(), 5);
    }

    #[test]
    fn test_cells_within() {
        let grid = grid(20, 20, 20.0);
        let cells = grid.cells_within((10.0, 10.0), 2.0);
        assert!(cells.contains(&GridCoord::new(10, 10)));
        assert!(cells.contains(&GridCoord::new(9, 9)));
        assert!(!cells.contains(&GridCoord::new(12, 12)));
        for coord in &cells {
            let center = grid.cell_center(*coord);
            assert!(((center.x - 10.0).powi(2) + (center.y - 10.0).powi(2)).sqrt() <= 2.0);
        }

        let corner = grid.cells_within((0.0, 0.0), 1.0);
        assert_eq!(corner, vec![GridCoord::new(0, 0)]);
    }

    #[test]
    fn test_entities_near() {
        let mut grid = grid(10, 10, 10.0);
        grid.place_entity(EntityId(1), Position::new(5.5, 5.5));
        grid.place_entity(EntityId(2), Position::new(6.5, 5.5));
        grid.place_entity(EntityId(3), Position::new(9.5, 9.5));

        let mut near: Vec<_> = grid.entities_near(GridCoord::new(5, 5), 1).collect();
        near.sort();
        assert_eq!(near, vec![EntityId(1), EntityId(2)]);
    }

    proptest! {
        #[test]
        fn test_mapping_formula(x in -50.0f64..150.0, y in -50.0f64..150.0) {
            let grid = grid(16, 9, 100.0);
            let coord = grid.coord_for(Position::new(x, y));
            let expected_x = ((x / 100.0 * 16.0).floor()).clamp(0.0, 15.0) as usize;
            let expected_y = ((y / 100.0 * 9.0).floor()).clamp(0.0, 8.0) as usize;
            prop_assert_eq!(coord, GridCoord::new(expected_x, expected_y));
        }
    }
}
