//! Special tile creation and activation.
//!
//! Creation looks only at the cluster of runs connected to the swap
//! destination, so at most one special is born per player move. Shape
//! classification, highest priority first:
//!
//!   * single straight run of exactly 4: renovation bomb
//!   * two perpendicular runs sharing one cell, 5 cells total: market mixer
//!   * straight run of 5 or more: skyscraper leveller
//!   * cluster of 6 or more with a crossing cell: urban redevelopment
//!
//! The special-threshold upgrade lowers every size requirement by one; the
//! special-chance upgrade gives a plain 3-run a 15 percent shot at a bomb.

use arrayvec::ArrayVec;

use crate::detect::{CoordSet, MatchScan, Run, MAX_RUNS};
use crate::grid::Grid;
use crate::rng::SimpleRng;
use crate::types::{
    Coord, SpecialKind, UpgradeFlags, GRID_SIZE, MIN_RUN, SPECIAL_BONUS_PERCENT,
};

/// A special tile the resolving pass should leave behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedSpecial {
    pub coord: Coord,
    pub special: SpecialKind,
}

/// Decide whether the scan creates a special, and where.
///
/// `destination` is the cell the player's swap moved a tile into; only
/// runs transitively connected to it are considered.
pub fn plan(
    scan: &MatchScan,
    destination: Coord,
    flags: &UpgradeFlags,
    rng: &mut SimpleRng,
) -> Option<PlannedSpecial> {
    let cluster = cluster_around(scan, destination);
    if cluster.is_empty() {
        return None;
    }

    let lower = u8::from(flags.special_threshold) as usize;
    let bomb_len = 4 - lower;
    let mixer_cells = 5 - lower;
    let leveller_len = 5 - lower;
    let redevelopment_cells = 6 - lower;

    let mut union = CoordSet::new();
    for run in &cluster {
        union = union.union(&run.coord_set());
    }

    if cluster.len() == 1 && cluster[0].len() == bomb_len {
        return Some(PlannedSpecial {
            coord: destination,
            special: SpecialKind::RenovationBomb,
        });
    }

    if cluster.len() == 2 && cluster[0].horizontal != cluster[1].horizontal {
        let shared = cluster[0].coord_set().intersection_len(&cluster[1].coord_set());
        if shared == 1 && union.len() >= mixer_cells && union.len() < redevelopment_cells {
            let pivot = pivot_of(&cluster)?;
            return Some(PlannedSpecial {
                coord: pivot,
                special: SpecialKind::MarketMixer,
            });
        }
    }

    if cluster.iter().any(|run| run.len() >= leveller_len) {
        return Some(PlannedSpecial {
            coord: destination,
            special: SpecialKind::SkyscraperLeveller,
        });
    }

    if union.len() >= redevelopment_cells {
        if let Some(crossing) = crossing_cell(&union) {
            return Some(PlannedSpecial {
                coord: crossing,
                special: SpecialKind::UrbanRedevelopment,
            });
        }
    }

    if cluster.len() == 1
        && cluster[0].len() == MIN_RUN as usize
        && flags.special_chance
        && rng.chance_percent(SPECIAL_BONUS_PERCENT)
    {
        return Some(PlannedSpecial {
            coord: destination,
            special: SpecialKind::RenovationBomb,
        });
    }

    None
}

/// Runs transitively connected, via shared cells, to the run(s) holding
/// `destination`.
fn cluster_around<'a>(scan: &'a MatchScan, destination: Coord) -> ArrayVec<&'a Run, MAX_RUNS> {
    let mut member = [false; MAX_RUNS];
    let mut reach = CoordSet::new();
    reach.insert(destination);

    loop {
        let mut grew = false;
        for (i, run) in scan.runs.iter().enumerate() {
            if member[i] {
                continue;
            }
            if run.coord_set().intersects(&reach) {
                member[i] = true;
                reach = reach.union(&run.coord_set());
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }

    let mut cluster = ArrayVec::new();
    for (i, run) in scan.runs.iter().enumerate() {
        if member[i] {
            cluster.push(run);
        }
    }
    cluster
}

fn pivot_of(cluster: &[&Run]) -> Option<Coord> {
    let b = cluster[1].coord_set();
    cluster[0].cells.iter().copied().find(|&c| b.contains(c))
}

/// A cell with at least 3 contiguous cluster cells through it both
/// horizontally and vertically; ties broken toward the cluster centroid.
fn crossing_cell(union: &CoordSet) -> Option<Coord> {
    let n = union.len() as i32;
    let (mut sum_x, mut sum_y) = (0i32, 0i32);
    for c in union.iter() {
        sum_x += c.x as i32;
        sum_y += c.y as i32;
    }

    let mut best: Option<(Coord, i32)> = None;
    for c in union.iter() {
        if contiguous_span(union, c, true) < MIN_RUN as usize
            || contiguous_span(union, c, false) < MIN_RUN as usize
        {
            continue;
        }
        // Manhattan distance to the centroid, scaled by n to stay integral.
        let dist = (c.x as i32 * n - sum_x).abs() + (c.y as i32 * n - sum_y).abs();
        match best {
            Some((_, d)) if d <= dist => {}
            _ => best = Some((c, dist)),
        }
    }
    best.map(|(c, _)| c)
}

fn contiguous_span(union: &CoordSet, at: Coord, horizontal: bool) -> usize {
    let mut span = 1;
    for step in [-1i8, 1] {
        let (mut x, mut y) = (at.x as i8, at.y as i8);
        loop {
            if horizontal {
                x += step;
            } else {
                y += step;
            }
            if x < 0 || x >= GRID_SIZE as i8 || y < 0 || y >= GRID_SIZE as i8 {
                break;
            }
            if !union.contains(Coord::new(x as u8, y as u8)) {
                break;
            }
            span += 1;
        }
    }
    span
}

/// Cells removed when the special at `coord` fires. Includes the
/// special's own cell; obstacle cells are never included.
pub fn activation_cells(grid: &Grid, coord: Coord, special: SpecialKind) -> CoordSet {
    let mut cells = CoordSet::new();
    let add = |x: i8, y: i8, cells: &mut CoordSet| {
        if grid.tile_kind(x, y).is_some() {
            cells.insert(Coord::new(x as u8, y as u8));
        }
    };

    match special {
        SpecialKind::RenovationBomb => {
            for x in 0..GRID_SIZE as i8 {
                add(x, coord.y as i8, &mut cells);
            }
        }
        SpecialKind::SkyscraperLeveller => {
            for y in 0..GRID_SIZE as i8 {
                add(coord.x as i8, y, &mut cells);
            }
        }
        SpecialKind::MarketMixer => {
            for dy in -1i8..=1 {
                for dx in -1i8..=1 {
                    add(coord.x as i8 + dx, coord.y as i8 + dy, &mut cells);
                }
            }
        }
        SpecialKind::UrbanRedevelopment => {
            for x in 0..GRID_SIZE as i8 {
                add(x, coord.y as i8, &mut cells);
            }
            for y in 0..GRID_SIZE as i8 {
                add(coord.x as i8, y, &mut cells);
            }
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect;
    use crate::grid::{Cell, Obstacle};
    use crate::types::TileKind;

    fn no_flags() -> UpgradeFlags {
        UpgradeFlags::default()
    }

    /// Alternating House/Condo pairs never line up three in a row or column,
    /// and leave Villa free for painted runs.
    fn stable_rows() -> [[TileKind; 8]; 8] {
        let mut rows = [[TileKind::House; 8]; 8];
        for (y, row) in rows.iter_mut().enumerate() {
            for (x, cell) in row.iter_mut().enumerate() {
                *cell = if (x / 2 + y) % 2 == 0 {
                    TileKind::House
                } else {
                    TileKind::Condo
                };
            }
        }
        rows
    }

    fn paint(rows: &mut [[TileKind; 8]; 8], cells: &[(usize, usize)], kind: TileKind) {
        for &(x, y) in cells {
            rows[y][x] = kind;
        }
    }

    #[test]
    fn test_plain_three_run_makes_nothing() {
        let mut rows = stable_rows();
        paint(&mut rows, &[(0, 7), (1, 7), (2, 7)], TileKind::Villa);
        let grid = Grid::from_kinds(rows);
        let scan = detect::detect(&grid);
        let mut rng = SimpleRng::new(1);
        assert!(plan(&scan, Coord::new(1, 7), &no_flags(), &mut rng).is_none());
    }

    #[test]
    fn test_four_run_makes_bomb_at_destination() {
        let mut rows = stable_rows();
        paint(&mut rows, &[(2, 7), (3, 7), (4, 7), (5, 7)], TileKind::Villa);
        let grid = Grid::from_kinds(rows);
        let scan = detect::detect(&grid);
        let mut rng = SimpleRng::new(1);
        let planned = plan(&scan, Coord::new(3, 7), &no_flags(), &mut rng).unwrap();
        assert_eq!(planned.special, SpecialKind::RenovationBomb);
        assert_eq!(planned.coord, Coord::new(3, 7));
    }

    #[test]
    fn test_five_run_makes_leveller() {
        let mut rows = stable_rows();
        paint(
            &mut rows,
            &[(1, 7), (2, 7), (3, 7), (4, 7), (5, 7)],
            TileKind::Villa,
        );
        let grid = Grid::from_kinds(rows);
        let scan = detect::detect(&grid);
        let mut rng = SimpleRng::new(1);
        let planned = plan(&scan, Coord::new(3, 7), &no_flags(), &mut rng).unwrap();
        assert_eq!(planned.special, SpecialKind::SkyscraperLeveller);
    }

    #[test]
    fn test_l_shape_makes_mixer_at_pivot() {
        let mut rows = stable_rows();
        // Horizontal 3-run and vertical 3-run sharing the corner (2, 5).
        paint(&mut rows, &[(2, 5), (3, 5), (4, 5)], TileKind::Villa);
        paint(&mut rows, &[(2, 3), (2, 4)], TileKind::Villa);
        let grid = Grid::from_kinds(rows);
        let scan = detect::detect(&grid);
        let mut rng = SimpleRng::new(1);
        let planned = plan(&scan, Coord::new(4, 5), &no_flags(), &mut rng).unwrap();
        assert_eq!(planned.special, SpecialKind::MarketMixer);
        assert_eq!(planned.coord, Coord::new(2, 5));
    }

    #[test]
    fn test_six_cross_makes_redevelopment_at_intersection() {
        let mut rows = stable_rows();
        // Horizontal 4-run through (3, 4) crossed by a vertical 3-run.
        paint(&mut rows, &[(1, 4), (2, 4), (3, 4), (4, 4)], TileKind::Villa);
        paint(&mut rows, &[(3, 3), (3, 5)], TileKind::Villa);
        let grid = Grid::from_kinds(rows);
        let scan = detect::detect(&grid);
        let mut rng = SimpleRng::new(1);
        let planned = plan(&scan, Coord::new(1, 4), &no_flags(), &mut rng).unwrap();
        assert_eq!(planned.special, SpecialKind::UrbanRedevelopment);
        assert_eq!(planned.coord, Coord::new(3, 4));
    }

    #[test]
    fn test_leveller_outranks_redevelopment() {
        let mut rows = stable_rows();
        // A horizontal 5-run crossed by a vertical 3-run qualifies both as a
        // leveller and as a redevelopment cross; the leveller wins.
        paint(
            &mut rows,
            &[(1, 4), (2, 4), (3, 4), (4, 4), (5, 4)],
            TileKind::Villa,
        );
        paint(&mut rows, &[(3, 3), (3, 5)], TileKind::Villa);
        let grid = Grid::from_kinds(rows);
        let scan = detect::detect(&grid);
        let mut rng = SimpleRng::new(1);
        let planned = plan(&scan, Coord::new(1, 4), &no_flags(), &mut rng).unwrap();
        assert_eq!(planned.special, SpecialKind::SkyscraperLeveller);
        assert_eq!(planned.coord, Coord::new(1, 4));
    }

    #[test]
    fn test_disconnected_runs_are_ignored() {
        let mut rows = stable_rows();
        paint(&mut rows, &[(0, 7), (1, 7), (2, 7)], TileKind::Villa);
        paint(&mut rows, &[(4, 0), (5, 0), (6, 0), (7, 0)], TileKind::Villa);
        let grid = Grid::from_kinds(rows);
        let scan = detect::detect(&grid);
        let mut rng = SimpleRng::new(1);
        // The destination sits in the 3-run; the distant 4-run cannot create.
        assert!(plan(&scan, Coord::new(1, 7), &no_flags(), &mut rng).is_none());
    }

    #[test]
    fn test_threshold_upgrade_lowers_bomb_to_three() {
        let mut rows = stable_rows();
        paint(&mut rows, &[(0, 7), (1, 7), (2, 7)], TileKind::Villa);
        let grid = Grid::from_kinds(rows);
        let scan = detect::detect(&grid);
        let mut rng = SimpleRng::new(1);
        let flags = UpgradeFlags {
            special_threshold: true,
            ..UpgradeFlags::default()
        };
        let planned = plan(&scan, Coord::new(1, 7), &flags, &mut rng).unwrap();
        assert_eq!(planned.special, SpecialKind::RenovationBomb);
    }

    #[test]
    fn test_chance_upgrade_is_seed_dependent() {
        let mut rows = stable_rows();
        paint(&mut rows, &[(0, 7), (1, 7), (2, 7)], TileKind::Villa);
        let grid = Grid::from_kinds(rows);
        let scan = detect::detect(&grid);
        let flags = UpgradeFlags {
            special_chance: true,
            ..UpgradeFlags::default()
        };
        // Over many seeds the 15 percent roll must land both ways.
        let mut hits = 0;
        for seed in 1..=100 {
            let mut rng = SimpleRng::new(seed);
            if plan(&scan, Coord::new(1, 7), &flags, &mut rng).is_some() {
                hits += 1;
            }
        }
        assert!(hits > 0 && hits < 100);
    }

    #[test]
    fn test_bomb_activation_spans_row() {
        let grid = Grid::filled(TileKind::House);
        let cells = activation_cells(&grid, Coord::new(3, 2), SpecialKind::RenovationBomb);
        assert_eq!(cells.len(), 8);
        assert!(cells.contains(Coord::new(0, 2)));
        assert!(cells.contains(Coord::new(3, 2)));
        assert!(!cells.contains(Coord::new(3, 3)));
    }

    #[test]
    fn test_mixer_activation_clips_at_edges() {
        let grid = Grid::filled(TileKind::House);
        let cells = activation_cells(&grid, Coord::new(0, 0), SpecialKind::MarketMixer);
        assert_eq!(cells.len(), 4);
    }

    #[test]
    fn test_redevelopment_counts_cross_once() {
        let grid = Grid::filled(TileKind::House);
        let cells = activation_cells(&grid, Coord::new(4, 4), SpecialKind::UrbanRedevelopment);
        assert_eq!(cells.len(), 15);
    }

    #[test]
    fn test_activation_skips_obstacles() {
        let mut grid = Grid::filled(TileKind::House);
        grid.set(5, 2, Cell::Obstacle(Obstacle::LockedGate));
        let cells = activation_cells(&grid, Coord::new(3, 2), SpecialKind::RenovationBomb);
        assert_eq!(cells.len(), 7);
        assert!(!cells.contains(Coord::new(5, 2)));
    }
}
