//! Plain-data snapshots of a running session.
//!
//! A snapshot is everything a renderer or a sync peer needs and nothing it
//! does not: no methods that mutate game state, no references back into
//! the engine. Capturing into a caller-owned snapshot allocates nothing.

use crate::grid::{Cell, Grid, Obstacle, Tile};
use crate::types::{
    GameStatus, GravityDirection, ObstacleKind, Resources, SpecialKind, TileKind, UpgradeFlags,
    CARD_UNLOCK_MIN, FOUNDATION_HIT_POINTS, GRID_CELLS, RESOURCE_KINDS,
};

/// One grid cell, flattened for copying and wire encoding.
///
/// Exactly one of `kind` and `obstacle` is `Some`; `counter` is 0 for
/// cells without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellSnapshot {
    pub kind: Option<TileKind>,
    pub special: Option<SpecialKind>,
    pub obstacle: Option<ObstacleKind>,
    pub counter: u8,
    pub fresh: bool,
}

impl From<&Cell> for CellSnapshot {
    fn from(cell: &Cell) -> Self {
        match cell {
            Cell::Tile(Tile {
                kind,
                special,
                fresh,
                ..
            }) => Self {
                kind: Some(*kind),
                special: *special,
                obstacle: None,
                counter: 0,
                fresh: *fresh,
            },
            Cell::Obstacle(obstacle) => Self {
                kind: None,
                special: None,
                obstacle: Some(obstacle.kind()),
                counter: obstacle.counter().unwrap_or(0),
                fresh: false,
            },
        }
    }
}

impl CellSnapshot {
    /// Rebuild the grid cell; `None` when the snapshot is inconsistent.
    pub fn to_cell(&self) -> Option<Cell> {
        match (self.kind, self.obstacle) {
            (Some(kind), None) => {
                let mut tile = Tile::new(kind);
                tile.special = self.special;
                tile.fresh = self.fresh;
                Some(Cell::Tile(tile))
            }
            (None, Some(ObstacleKind::LockedGate)) => Some(Cell::Obstacle(Obstacle::LockedGate)),
            (None, Some(ObstacleKind::FoundationBlock)) => {
                let hit_points = if self.counter == 0 {
                    FOUNDATION_HIT_POINTS
                } else {
                    self.counter
                };
                Some(Cell::Obstacle(Obstacle::FoundationBlock { hit_points }))
            }
            (None, Some(ObstacleKind::LockedCard)) => {
                let moves_to_unlock = if self.counter == 0 {
                    CARD_UNLOCK_MIN
                } else {
                    self.counter
                };
                Some(Cell::Obstacle(Obstacle::LockedCard { moves_to_unlock }))
            }
            _ => None,
        }
    }
}

/// Full session state in plain data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub cells: [CellSnapshot; GRID_CELLS],
    pub level: u32,
    pub score: u32,
    pub target_score: u32,
    pub moves_remaining: u32,
    pub status: GameStatus,
    pub gravity: GravityDirection,
    pub resources: [u32; RESOURCE_KINDS],
    pub rng_state: u32,
    pub flags: UpgradeFlags,
}

impl SessionSnapshot {
    pub fn clear(&mut self) {
        self.cells = [CellSnapshot::default(); GRID_CELLS];
        self.level = 0;
        self.score = 0;
        self.target_score = 0;
        self.moves_remaining = 0;
        self.status = GameStatus::Playing;
        self.gravity = GravityDirection::Down;
        self.resources = [0; RESOURCE_KINDS];
        self.rng_state = 0;
        self.flags = UpgradeFlags::default();
    }

    /// Copy the grid into `cells`, row-major.
    pub fn capture_grid(&mut self, grid: &Grid) {
        for (slot, cell) in self.cells.iter_mut().zip(grid.cells()) {
            *slot = CellSnapshot::from(cell);
        }
    }

    /// Rebuild the grid; `None` when any cell is inconsistent.
    pub fn rebuild_grid(&self) -> Option<Grid> {
        let mut grid = Grid::filled(TileKind::House);
        for (i, snap) in self.cells.iter().enumerate() {
            let x = (i % 8) as i8;
            let y = (i / 8) as i8;
            grid.set(x, y, snap.to_cell()?);
        }
        Some(grid)
    }

    pub fn resources(&self) -> Resources {
        Resources::from_totals(self.resources)
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        let mut s = Self {
            cells: [CellSnapshot::default(); GRID_CELLS],
            level: 0,
            score: 0,
            target_score: 0,
            moves_remaining: 0,
            status: GameStatus::Playing,
            gravity: GravityDirection::Down,
            resources: [0; RESOURCE_KINDS],
            rng_state: 0,
            flags: UpgradeFlags::default(),
        };
        s.clear();
        s
    }
}
