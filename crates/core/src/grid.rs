//! Grid module - the 8x8 playfield
//!
//! Uses a flat array for cache locality and zero-allocation access.
//! Coordinates: (x, y) with x ranging 0..7 left to right and y ranging 0..7
//! top to bottom, row-major storage.
//!
//! A cell holds either a property tile or an obstacle, never both; the enum
//! makes it impossible for an obstacle to carry a special attribute.

use crate::types::{Coord, ObstacleKind, SpecialKind, TileKind, GRID_CELLS, GRID_SIZE};

/// A property tile occupying one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub kind: TileKind,
    pub special: Option<SpecialKind>,
    /// Flagged by the detector mid-cascade; cleared by settling.
    pub matched: bool,
    /// Set on refilled tiles for presentation; cleared next settle.
    pub fresh: bool,
}

impl Tile {
    pub fn new(kind: TileKind) -> Self {
        Self {
            kind,
            special: None,
            matched: false,
            fresh: false,
        }
    }

    pub fn fresh(kind: TileKind) -> Self {
        Self {
            kind,
            special: None,
            matched: false,
            fresh: true,
        }
    }

    pub fn with_special(kind: TileKind, special: SpecialKind) -> Self {
        Self {
            kind,
            special: Some(special),
            matched: false,
            fresh: false,
        }
    }
}

/// An obstacle occupying one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Obstacle {
    LockedGate,
    FoundationBlock { hit_points: u8 },
    LockedCard { moves_to_unlock: u8 },
}

impl Obstacle {
    pub fn kind(&self) -> ObstacleKind {
        match self {
            Obstacle::LockedGate => ObstacleKind::LockedGate,
            Obstacle::FoundationBlock { .. } => ObstacleKind::FoundationBlock,
            Obstacle::LockedCard { .. } => ObstacleKind::LockedCard,
        }
    }

    /// The remaining counter shown to the player, if the kind has one.
    pub fn counter(&self) -> Option<u8> {
        match self {
            Obstacle::LockedGate => None,
            Obstacle::FoundationBlock { hit_points } => Some(*hit_points),
            Obstacle::LockedCard { moves_to_unlock } => Some(*moves_to_unlock),
        }
    }
}

/// One grid position: a tile or an obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Tile(Tile),
    Obstacle(Obstacle),
}

impl Cell {
    pub fn tile(&self) -> Option<&Tile> {
        match self {
            Cell::Tile(t) => Some(t),
            Cell::Obstacle(_) => None,
        }
    }

    pub fn tile_mut(&mut self) -> Option<&mut Tile> {
        match self {
            Cell::Tile(t) => Some(t),
            Cell::Obstacle(_) => None,
        }
    }

    pub fn is_obstacle(&self) -> bool {
        matches!(self, Cell::Obstacle(_))
    }
}

/// The playfield - 8x8 cells in flat row-major storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    cells: [Cell; GRID_CELLS],
}

impl Grid {
    /// Create a grid uniformly filled with one tile kind.
    ///
    /// Real boards come from the generator; this is the seed state for
    /// restores and tests.
    pub fn filled(kind: TileKind) -> Self {
        Self {
            cells: [Cell::Tile(Tile::new(kind)); GRID_CELLS],
        }
    }

    /// Calculate flat index from (x, y) coordinates
    #[inline(always)]
    pub fn index(x: i8, y: i8) -> Option<usize> {
        if x < 0 || x >= GRID_SIZE as i8 || y < 0 || y >= GRID_SIZE as i8 {
            return None;
        }
        Some((y as usize) * (GRID_SIZE as usize) + (x as usize))
    }

    pub fn size(&self) -> u8 {
        GRID_SIZE
    }

    /// Get cell at position (x, y); `None` when out of bounds.
    pub fn get(&self, x: i8, y: i8) -> Option<&Cell> {
        Self::index(x, y).map(|idx| &self.cells[idx])
    }

    pub fn get_mut(&mut self, x: i8, y: i8) -> Option<&mut Cell> {
        Self::index(x, y).map(move |idx| &mut self.cells[idx])
    }

    pub fn at(&self, coord: Coord) -> Option<&Cell> {
        self.get(coord.x as i8, coord.y as i8)
    }

    pub fn at_mut(&mut self, coord: Coord) -> Option<&mut Cell> {
        self.get_mut(coord.x as i8, coord.y as i8)
    }

    /// Set cell at position (x, y); returns false when out of bounds.
    pub fn set(&mut self, x: i8, y: i8, cell: Cell) -> bool {
        match Self::index(x, y) {
            Some(idx) => {
                self.cells[idx] = cell;
                true
            }
            None => false,
        }
    }

    /// Tile kind at (x, y); `None` for obstacles or out-of-bounds cells.
    pub fn tile_kind(&self, x: i8, y: i8) -> Option<TileKind> {
        self.get(x, y).and_then(|c| c.tile()).map(|t| t.kind)
    }

    pub fn is_obstacle(&self, x: i8, y: i8) -> bool {
        matches!(self.get(x, y), Some(Cell::Obstacle(_)))
    }

    /// Swap the contents of two cells. Returns false when either is out of
    /// bounds; the caller decides whether obstacles may move.
    pub fn swap(&mut self, a: Coord, b: Coord) -> bool {
        let (Some(ia), Some(ib)) = (a.index(), b.index()) else {
            return false;
        };
        self.cells.swap(ia, ib);
        true
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Iterate all coordinates in row-major order.
    pub fn coords() -> impl Iterator<Item = Coord> {
        (0..GRID_SIZE).flat_map(|y| (0..GRID_SIZE).map(move |x| Coord::new(x, y)))
    }

    /// Build a grid from per-row kind arrays for testing.
    #[cfg(test)]
    pub fn from_kinds(rows: [[TileKind; GRID_SIZE as usize]; GRID_SIZE as usize]) -> Self {
        let mut grid = Grid::filled(TileKind::House);
        for (y, row) in rows.iter().enumerate() {
            for (x, kind) in row.iter().enumerate() {
                grid.set(x as i8, y as i8, Cell::Tile(Tile::new(*kind)));
            }
        }
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_index_calculation() {
        assert_eq!(Grid::index(0, 0), Some(0));
        assert_eq!(Grid::index(7, 0), Some(7));
        assert_eq!(Grid::index(0, 1), Some(8));
        assert_eq!(Grid::index(7, 7), Some(63));
        assert_eq!(Grid::index(-1, 0), None);
        assert_eq!(Grid::index(8, 0), None);
        assert_eq!(Grid::index(0, 8), None);
    }

    #[test]
    fn test_grid_set_and_get() {
        let mut grid = Grid::filled(TileKind::House);

        assert!(grid.set(5, 2, Cell::Tile(Tile::new(TileKind::Villa))));
        assert_eq!(grid.tile_kind(5, 2), Some(TileKind::Villa));

        assert!(grid.set(0, 0, Cell::Obstacle(Obstacle::LockedGate)));
        assert!(grid.is_obstacle(0, 0));
        assert_eq!(grid.tile_kind(0, 0), None);
    }

    #[test]
    fn test_grid_out_of_bounds() {
        let mut grid = Grid::filled(TileKind::House);
        assert!(grid.get(-1, 0).is_none());
        assert!(grid.get(0, 8).is_none());
        assert!(!grid.set(8, 0, Cell::Tile(Tile::new(TileKind::Condo))));
    }

    #[test]
    fn test_swap_round_trip_restores_grid() {
        let mut grid = Grid::filled(TileKind::House);
        grid.set(2, 3, Cell::Tile(Tile::new(TileKind::Condo)));
        let before = grid.clone();

        let a = Coord::new(2, 3);
        let b = Coord::new(3, 3);
        assert!(grid.swap(a, b));
        assert_eq!(grid.tile_kind(3, 3), Some(TileKind::Condo));
        assert!(grid.swap(a, b));
        assert_eq!(grid, before);
    }

    #[test]
    fn test_obstacle_counter() {
        assert_eq!(Obstacle::LockedGate.counter(), None);
        assert_eq!(
            Obstacle::FoundationBlock { hit_points: 2 }.counter(),
            Some(2)
        );
        assert_eq!(
            Obstacle::LockedCard { moves_to_unlock: 3 }.counter(),
            Some(3)
        );
    }

    #[test]
    fn test_obstacle_never_carries_special() {
        // Structural: an obstacle cell has no tile to attach a special to.
        let cell = Cell::Obstacle(Obstacle::LockedGate);
        assert!(cell.tile().is_none());
    }
}
