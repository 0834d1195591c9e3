//! Settling - clear matched tiles, slide survivors, refill vacancies.
//!
//! Gravity can point any of the four compass directions; the direction is
//! drawn once per player move. Each line parallel to gravity is processed
//! independently, split into segments at obstacle cells. Obstacles never
//! move. Within a segment the surviving tiles pack toward the gravity edge
//! in their original relative order and the remaining cells refill with
//! fresh random tiles.

use arrayvec::ArrayVec;

use crate::detect::CoordSet;
use crate::grid::{Cell, Grid, Tile};
use crate::rng::SimpleRng;
use crate::types::{Coord, GravityDirection, GRID_SIZE};

/// Clear `matched` cells and settle `grid` toward `direction`.
///
/// Returns the number of fresh tiles spawned.
pub fn settle(
    grid: &mut Grid,
    matched: &CoordSet,
    direction: GravityDirection,
    rng: &mut SimpleRng,
) -> u32 {
    let mut spawned = 0;
    for lane in 0..GRID_SIZE as i8 {
        let mut segment: ArrayVec<(i8, i8), { GRID_SIZE as usize }> = ArrayVec::new();
        let mut survivors: ArrayVec<Tile, { GRID_SIZE as usize }> = ArrayVec::new();

        for step in 0..GRID_SIZE as i8 {
            let (x, y) = lane_position(direction, lane, step);
            match grid.get(x, y).copied() {
                Some(Cell::Obstacle(_)) => {
                    spawned += flush_segment(grid, &mut segment, &mut survivors, rng);
                }
                Some(Cell::Tile(mut tile)) => {
                    segment.push((x, y));
                    if !matched.contains(Coord::new(x as u8, y as u8)) {
                        tile.matched = false;
                        tile.fresh = false;
                        survivors.push(tile);
                    }
                }
                None => {}
            }
        }
        spawned += flush_segment(grid, &mut segment, &mut survivors, rng);
    }
    spawned
}

/// Position of `step` cells in from the gravity edge, along lane `lane`.
fn lane_position(direction: GravityDirection, lane: i8, step: i8) -> (i8, i8) {
    let last = GRID_SIZE as i8 - 1;
    match direction {
        GravityDirection::Down => (lane, last - step),
        GravityDirection::Up => (lane, step),
        GravityDirection::Right => (last - step, lane),
        GravityDirection::Left => (step, lane),
    }
}

fn flush_segment(
    grid: &mut Grid,
    segment: &mut ArrayVec<(i8, i8), { GRID_SIZE as usize }>,
    survivors: &mut ArrayVec<Tile, { GRID_SIZE as usize }>,
    rng: &mut SimpleRng,
) -> u32 {
    let mut spawned = 0;
    for (i, &(x, y)) in segment.iter().enumerate() {
        let cell = if let Some(tile) = survivors.get(i) {
            Cell::Tile(*tile)
        } else {
            spawned += 1;
            Cell::Tile(Tile::fresh(rng.tile_kind()))
        };
        grid.set(x, y, cell);
    }
    segment.clear();
    survivors.clear();
    spawned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Obstacle;
    use crate::types::TileKind;

    fn matched_at(coords: &[(u8, u8)]) -> CoordSet {
        let mut set = CoordSet::default();
        for &(x, y) in coords {
            set.insert(Coord::new(x, y));
        }
        set
    }

    #[test]
    fn test_tiles_fall_down_preserving_order() {
        let mut grid = Grid::filled(TileKind::House);
        grid.set(2, 5, Cell::Tile(Tile::new(TileKind::Villa)));
        grid.set(2, 6, Cell::Tile(Tile::new(TileKind::Condo)));
        let mut rng = SimpleRng::new(3);

        // Clearing the bottom cell drops the two above by one.
        let spawned = settle(&mut grid, &matched_at(&[(2, 7)]), GravityDirection::Down, &mut rng);
        assert_eq!(spawned, 1);
        assert_eq!(grid.tile_kind(2, 7), Some(TileKind::Condo));
        assert_eq!(grid.tile_kind(2, 6), Some(TileKind::Villa));
        assert!(grid.get(2, 0).unwrap().tile().unwrap().fresh);
    }

    #[test]
    fn test_obstacle_splits_the_lane() {
        let mut grid = Grid::filled(TileKind::House);
        grid.set(4, 4, Cell::Obstacle(Obstacle::LockedGate));
        grid.set(4, 2, Cell::Tile(Tile::new(TileKind::Villa)));
        let mut rng = SimpleRng::new(3);

        // A clear below the obstacle must not pull tiles from above it.
        settle(&mut grid, &matched_at(&[(4, 7)]), GravityDirection::Down, &mut rng);
        assert_eq!(grid.tile_kind(4, 2), Some(TileKind::Villa));
        assert!(grid.is_obstacle(4, 4));
        // The vacancy refilled at the top of the lower segment.
        assert!(grid.get(4, 5).unwrap().tile().unwrap().fresh);
    }

    #[test]
    fn test_left_gravity_packs_rows() {
        let mut grid = Grid::filled(TileKind::House);
        grid.set(5, 1, Cell::Tile(Tile::new(TileKind::Villa)));
        let mut rng = SimpleRng::new(3);

        settle(&mut grid, &matched_at(&[(0, 1), (1, 1)]), GravityDirection::Left, &mut rng);
        // Villa slides from x=5 to x=3; fresh tiles appear on the right.
        assert_eq!(grid.tile_kind(3, 1), Some(TileKind::Villa));
        assert!(grid.get(6, 1).unwrap().tile().unwrap().fresh);
        assert!(grid.get(7, 1).unwrap().tile().unwrap().fresh);
    }

    #[test]
    fn test_up_gravity_rises() {
        let mut grid = Grid::filled(TileKind::House);
        grid.set(0, 5, Cell::Tile(Tile::new(TileKind::Villa)));
        let mut rng = SimpleRng::new(3);

        settle(&mut grid, &matched_at(&[(0, 0)]), GravityDirection::Up, &mut rng);
        assert_eq!(grid.tile_kind(0, 4), Some(TileKind::Villa));
        assert!(grid.get(0, 7).unwrap().tile().unwrap().fresh);
    }

    #[test]
    fn test_survivor_count_is_conserved() {
        let mut grid = Grid::filled(TileKind::House);
        grid.set(6, 3, Cell::Tile(Tile::new(TileKind::Villa)));
        grid.set(6, 1, Cell::Tile(Tile::new(TileKind::Villa)));
        let mut rng = SimpleRng::new(3);

        let matched = matched_at(&[(6, 5), (6, 6), (6, 7)]);
        let spawned = settle(&mut grid, &matched, GravityDirection::Down, &mut rng);
        assert_eq!(spawned, 3);
        let villas = (0..8)
            .filter(|&y| grid.tile_kind(6, y) == Some(TileKind::Villa))
            .count();
        assert_eq!(villas, 2);
    }

    #[test]
    fn test_settle_clears_transient_flags() {
        let mut grid = Grid::filled(TileKind::House);
        let tile = grid.get_mut(1, 1).unwrap().tile_mut().unwrap();
        tile.fresh = true;
        tile.matched = true;
        let mut rng = SimpleRng::new(3);

        settle(&mut grid, &CoordSet::default(), GravityDirection::Down, &mut rng);
        let tile = grid.get(1, 1).unwrap().tile().unwrap();
        assert!(!tile.fresh);
        assert!(!tile.matched);
    }

    #[test]
    fn test_fresh_count_matches_matched_count_without_obstacles() {
        let mut grid = Grid::filled(TileKind::House);
        let mut rng = SimpleRng::new(9);
        let matched = matched_at(&[(0, 0), (3, 3), (3, 4), (7, 7)]);

        let spawned = settle(&mut grid, &matched, GravityDirection::Right, &mut rng);
        assert_eq!(spawned, 4);
        let fresh = Grid::coords()
            .filter(|&c| {
                grid.at(c)
                    .and_then(|cell| cell.tile())
                    .is_some_and(|t| t.fresh)
            })
            .count();
        assert_eq!(fresh, 4);
    }
}
