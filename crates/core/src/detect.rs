//! Match detector - row/column scans for runs of identical tiles
//!
//! Two independent linear passes (per row left-to-right, per column
//! top-to-bottom). Within a line a running streak of identical kind is
//! flushed on kind change, on an obstacle cell, and at end of line; a flushed
//! streak of length >= 3 records a run. Obstacles never participate and
//! forcibly terminate the streak.
//!
//! The detector takes the grid immutably so callers can probe hypothetical
//! post-swap grids for legality checks. All buffers are stack-allocated.

use arrayvec::ArrayVec;

use crate::grid::Grid;
use crate::types::{Coord, TileKind, GRID_SIZE, MIN_RUN};

/// Upper bound on runs in one pass: each of 8 lines can hold at most two
/// disjoint runs of length >= 3.
pub const MAX_RUNS: usize = 32;

/// A set of grid coordinates backed by a 64-bit mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoordSet {
    bits: u64,
}

impl CoordSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn insert(&mut self, coord: Coord) {
        if let Some(idx) = coord.index() {
            self.bits |= 1u64 << idx;
        }
    }

    #[inline(always)]
    pub fn remove(&mut self, coord: Coord) {
        if let Some(idx) = coord.index() {
            self.bits &= !(1u64 << idx);
        }
    }

    #[inline(always)]
    pub fn contains(&self, coord: Coord) -> bool {
        match coord.index() {
            Some(idx) => self.bits & (1u64 << idx) != 0,
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn union(&self, other: &CoordSet) -> CoordSet {
        CoordSet {
            bits: self.bits | other.bits,
        }
    }

    pub fn intersects(&self, other: &CoordSet) -> bool {
        self.bits & other.bits != 0
    }

    pub fn intersection_len(&self, other: &CoordSet) -> usize {
        (self.bits & other.bits).count_ones() as usize
    }

    /// Iterate members in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = Coord> + '_ {
        let bits = self.bits;
        (0..64u8).filter_map(move |idx| {
            if bits & (1u64 << idx) != 0 {
                Some(Coord::new(idx % GRID_SIZE, idx / GRID_SIZE))
            } else {
                None
            }
        })
    }
}

/// A maximal run of >= 3 identical tiles in one row or column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub kind: TileKind,
    pub horizontal: bool,
    /// Ordered member coordinates (left-to-right or top-to-bottom).
    pub cells: ArrayVec<Coord, { GRID_SIZE as usize }>,
}

impl Run {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn coord_set(&self) -> CoordSet {
        let mut set = CoordSet::new();
        for &c in &self.cells {
            set.insert(c);
        }
        set
    }
}

/// Result of one detection pass.
///
/// A cell shared by a horizontal and a vertical run appears once in
/// `matched` but in both entries of `runs`.
#[derive(Debug, Clone, Default)]
pub struct MatchScan {
    pub runs: ArrayVec<Run, MAX_RUNS>,
    pub matched: CoordSet,
}

impl MatchScan {
    pub fn has_match(&self) -> bool {
        !self.matched.is_empty()
    }
}

/// Scan the grid for all current matches.
pub fn detect(grid: &Grid) -> MatchScan {
    let mut scan = MatchScan::default();

    // Horizontal pass.
    for y in 0..GRID_SIZE as i8 {
        let mut streak_start = 0i8;
        let mut streak_kind: Option<TileKind> = None;
        for x in 0..=GRID_SIZE as i8 {
            let kind = if x < GRID_SIZE as i8 {
                grid.tile_kind(x, y)
            } else {
                None
            };
            if kind != streak_kind || kind.is_none() {
                if let Some(k) = streak_kind {
                    flush(&mut scan, k, true, streak_start, x, y);
                }
                streak_start = x;
                streak_kind = kind;
            }
        }
    }

    // Vertical pass.
    for x in 0..GRID_SIZE as i8 {
        let mut streak_start = 0i8;
        let mut streak_kind: Option<TileKind> = None;
        for y in 0..=GRID_SIZE as i8 {
            let kind = if y < GRID_SIZE as i8 {
                grid.tile_kind(x, y)
            } else {
                None
            };
            if kind != streak_kind || kind.is_none() {
                if let Some(k) = streak_kind {
                    flush(&mut scan, k, false, streak_start, y, x);
                }
                streak_start = y;
                streak_kind = kind;
            }
        }
    }

    scan
}

/// Record a flushed streak `[start, end)` along `line` if long enough.
fn flush(scan: &mut MatchScan, kind: TileKind, horizontal: bool, start: i8, end: i8, line: i8) {
    if end - start < MIN_RUN as i8 {
        return;
    }
    let mut cells = ArrayVec::new();
    for i in start..end {
        let coord = if horizontal {
            Coord::new(i as u8, line as u8)
        } else {
            Coord::new(line as u8, i as u8)
        };
        cells.push(coord);
        scan.matched.insert(coord);
    }
    let _ = scan.runs.try_push(Run {
        kind,
        horizontal,
        cells,
    });
}

/// Cheap probe used for swap legality: stops at the first run.
pub fn has_match(grid: &Grid) -> bool {
    for y in 0..GRID_SIZE as i8 {
        let mut streak = 1u8;
        for x in 1..GRID_SIZE as i8 {
            let here = grid.tile_kind(x, y);
            if here.is_some() && here == grid.tile_kind(x - 1, y) {
                streak += 1;
                if streak >= MIN_RUN {
                    return true;
                }
            } else {
                streak = 1;
            }
        }
    }
    for x in 0..GRID_SIZE as i8 {
        let mut streak = 1u8;
        for y in 1..GRID_SIZE as i8 {
            let here = grid.tile_kind(x, y);
            if here.is_some() && here == grid.tile_kind(x, y - 1) {
                streak += 1;
                if streak >= MIN_RUN {
                    return true;
                }
            } else {
                streak = 1;
            }
        }
    }
    false
}
