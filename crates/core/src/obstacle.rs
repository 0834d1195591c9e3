//! Obstacle damage resolution.
//!
//! A resolving pass damages every obstacle orthogonally adjacent to at
//! least one matched cell. Each obstacle takes at most one hit per pass,
//! enforced with a per-call visited set, no matter how many matched
//! neighbors touch it.

use arrayvec::ArrayVec;

use crate::detect::CoordSet;
use crate::grid::{Cell, Grid, Obstacle, Tile};
use crate::rng::SimpleRng;
use crate::types::{Coord, ObstacleKind, GRID_CELLS};

/// One obstacle hit applied during a resolving pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObstacleHit {
    pub coord: Coord,
    pub kind: ObstacleKind,
    /// True when the hit removed the obstacle from the grid.
    pub cleared: bool,
}

const NEIGHBOR_OFFSETS: [(i8, i8); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

/// Damage every obstacle adjacent to the matched set, once each.
///
/// Returns the hits in row-major order of the matched cells that first
/// touched them.
pub fn resolve(
    grid: &mut Grid,
    matched: &CoordSet,
    rng: &mut SimpleRng,
) -> ArrayVec<ObstacleHit, GRID_CELLS> {
    let mut hits = ArrayVec::new();
    let mut visited = CoordSet::default();

    for coord in matched.iter() {
        for (dx, dy) in NEIGHBOR_OFFSETS {
            let nx = coord.x as i8 + dx;
            let ny = coord.y as i8 + dy;
            if Grid::index(nx, ny).is_none() {
                continue;
            }
            let neighbor = Coord::new(nx as u8, ny as u8);
            if visited.contains(neighbor) {
                continue;
            }
            let Some(Cell::Obstacle(obstacle)) = grid.get(nx, ny).copied() else {
                continue;
            };
            visited.insert(neighbor);
            hits.push(apply_hit(grid, neighbor, obstacle, rng));
        }
    }

    hits
}

fn apply_hit(
    grid: &mut Grid,
    coord: Coord,
    obstacle: Obstacle,
    rng: &mut SimpleRng,
) -> ObstacleHit {
    let kind = obstacle.kind();
    let x = coord.x as i8;
    let y = coord.y as i8;
    let cleared = match obstacle {
        Obstacle::LockedGate => {
            grid.set(x, y, Cell::Tile(Tile::fresh(rng.tile_kind())));
            true
        }
        Obstacle::FoundationBlock { hit_points } => {
            if hit_points <= 1 {
                grid.set(x, y, Cell::Tile(Tile::fresh(rng.tile_kind())));
                true
            } else {
                grid.set(
                    x,
                    y,
                    Cell::Obstacle(Obstacle::FoundationBlock {
                        hit_points: hit_points - 1,
                    }),
                );
                false
            }
        }
        Obstacle::LockedCard { moves_to_unlock } => {
            if moves_to_unlock <= 1 {
                // An unlocked card reveals a fresh tile carrying a random special.
                let mut tile = Tile::fresh(rng.tile_kind());
                tile.special = Some(rng.special_kind());
                grid.set(x, y, Cell::Tile(tile));
                true
            } else {
                grid.set(
                    x,
                    y,
                    Cell::Obstacle(Obstacle::LockedCard {
                        moves_to_unlock: moves_to_unlock - 1,
                    }),
                );
                false
            }
        }
    };
    ObstacleHit { coord, kind, cleared }
}
