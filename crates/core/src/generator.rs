//! Board generator - initial grids with no pre-existing matches
//!
//! Fills all 64 cells with uniformly random property kinds, then repairs in
//! row-major order: a cell that completes a run of three with its two left or
//! two upper neighbors is redrawn until it differs from the offending kinds.
//! Repairs only look backward, so a single pass terminates.
//!
//! Obstacles are placed after repair (levels above 1 only) by rejection
//! sampling over random coordinates; exhausting the attempts cap fails fast
//! with a typed configuration error instead of looping forever.

use crate::campaign::LevelConfig;
use crate::error::ConfigError;
use crate::grid::{Cell, Grid, Obstacle, Tile};
use crate::rng::SimpleRng;
use crate::types::{ObstacleKind, GRID_CELLS, GRID_SIZE, CARD_UNLOCK_MAX, CARD_UNLOCK_MIN, FOUNDATION_HIT_POINTS};

/// Rejection-sampling budget for one obstacle.
const PLACEMENT_ATTEMPTS: u32 = (GRID_CELLS as u32) * 10;

/// Produce a stable starting grid for a level attempt.
pub fn generate(config: &LevelConfig, rng: &mut SimpleRng) -> Result<Grid, ConfigError> {
    let requested = config.locked_gates as usize
        + config.foundation_blocks as usize
        + config.locked_cards as usize;
    if requested >= GRID_CELLS {
        return Err(ConfigError::TooManyObstacles {
            requested,
            capacity: GRID_CELLS,
        });
    }

    let mut grid = Grid::filled(rng.tile_kind());
    for y in 0..GRID_SIZE as i8 {
        for x in 0..GRID_SIZE as i8 {
            grid.set(x, y, Cell::Tile(Tile::new(rng.tile_kind())));
        }
    }
    repair(&mut grid, rng);

    // The tutorial board stays obstacle-free.
    if config.number > 1 {
        place_obstacles(&mut grid, ObstacleKind::LockedGate, config.locked_gates, rng)?;
        place_obstacles(
            &mut grid,
            ObstacleKind::FoundationBlock,
            config.foundation_blocks,
            rng,
        )?;
        place_obstacles(&mut grid, ObstacleKind::LockedCard, config.locked_cards, rng)?;
    }

    Ok(grid)
}

/// Backward-looking repair pass removing generated 3-runs.
fn repair(grid: &mut Grid, rng: &mut SimpleRng) {
    for y in 0..GRID_SIZE as i8 {
        for x in 0..GRID_SIZE as i8 {
            loop {
                let kind = match grid.tile_kind(x, y) {
                    Some(k) => k,
                    None => break,
                };
                let left_run = grid.tile_kind(x - 1, y) == Some(kind)
                    && grid.tile_kind(x - 2, y) == Some(kind);
                let up_run = grid.tile_kind(x, y - 1) == Some(kind)
                    && grid.tile_kind(x, y - 2) == Some(kind);
                if !left_run && !up_run {
                    break;
                }
                grid.set(x, y, Cell::Tile(Tile::new(rng.tile_kind())));
            }
        }
    }
}

fn place_obstacles(
    grid: &mut Grid,
    kind: ObstacleKind,
    count: u8,
    rng: &mut SimpleRng,
) -> Result<(), ConfigError> {
    for _ in 0..count {
        let mut placed = false;
        for _ in 0..PLACEMENT_ATTEMPTS {
            let x = rng.next_range(GRID_SIZE as u32) as i8;
            let y = rng.next_range(GRID_SIZE as u32) as i8;
            if grid.is_obstacle(x, y) {
                continue;
            }
            let obstacle = match kind {
                ObstacleKind::LockedGate => Obstacle::LockedGate,
                ObstacleKind::FoundationBlock => Obstacle::FoundationBlock {
                    hit_points: FOUNDATION_HIT_POINTS,
                },
                ObstacleKind::LockedCard => Obstacle::LockedCard {
                    moves_to_unlock: rng
                        .next_between(CARD_UNLOCK_MIN as u32, CARD_UNLOCK_MAX as u32)
                        as u8,
                },
            };
            grid.set(x, y, Cell::Obstacle(obstacle));
            placed = true;
            break;
        }
        if !placed {
            return Err(ConfigError::PlacementExhausted {
                attempts: PLACEMENT_ATTEMPTS,
            });
        }
    }
    Ok(())
}
