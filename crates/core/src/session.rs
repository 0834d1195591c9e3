//! Session orchestration - one level attempt from first swap to terminal.
//!
//! The session owns the grid, the rng, the score and the move budget, and
//! drives the resolve/settle cascade until the board is quiet. Every player
//! action costs exactly one move, charged once when its cascade finishes;
//! rejected actions (out of bounds, not adjacent, obstacle) cost nothing.
//! An adjacent swap that produces no run is put back and still charged.

use crate::campaign::{self, LevelConfig, LevelResult};
use crate::detect::{self, CoordSet, MatchScan};
use crate::error::{ConfigError, MoveError, RestoreError};
use crate::generator;
use crate::grid::{Cell, Grid, Tile};
use crate::obstacle;
use crate::rng::SimpleRng;
use crate::scoring;
use crate::settle;
use crate::snapshot::SessionSnapshot;
use crate::special::{self, PlannedSpecial};
use crate::types::{Coord, GameStatus, GravityDirection, Resources, UpgradeFlags, GRID_SIZE};

/// What a player action turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The swap matched and the cascade ran.
    Swapped,
    /// The swap was adjacent but matched nothing; it was undone and charged.
    Reverted,
    /// A special tile fired.
    Activated,
}

/// One resolving pass inside a cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassDetail {
    /// Cells cleared in this pass.
    pub matched: u32,
    /// Score credited by this pass.
    pub score: u32,
    /// Fresh tiles spawned by the settle that followed.
    pub spawned: u32,
}

/// Everything that happened during one player action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReport {
    pub outcome: MoveOutcome,
    pub score_delta: u32,
    pub passes: Vec<PassDetail>,
    pub special_created: Option<PlannedSpecial>,
    /// Obstacle hits landed across the whole cascade.
    pub obstacle_hits: u32,
    /// Hits that removed the obstacle outright.
    pub obstacles_cleared: u32,
    pub status: GameStatus,
    /// Gravity used for this action's settles.
    pub gravity: GravityDirection,
}

/// A running level attempt.
#[derive(Debug, Clone)]
pub struct Session {
    grid: Grid,
    rng: SimpleRng,
    config: LevelConfig,
    flags: UpgradeFlags,
    score: u32,
    moves_remaining: u32,
    status: GameStatus,
    gravity: GravityDirection,
    resources: Resources,
}

impl Session {
    /// Start a campaign level from a seed.
    pub fn new(level: u32, flags: UpgradeFlags, seed: u32) -> Result<Self, ConfigError> {
        let config = *campaign::level(level).ok_or(ConfigError::UnknownLevel(level))?;
        let mut rng = SimpleRng::new(seed);
        let grid = generator::generate(&config, &mut rng)?;
        Ok(Self {
            grid,
            rng,
            config,
            flags,
            score: 0,
            moves_remaining: config.move_budget(flags.extra_moves),
            status: GameStatus::Playing,
            gravity: GravityDirection::Down,
            resources: Resources::default(),
        })
    }

    pub fn level(&self) -> &LevelConfig {
        &self.config
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn moves_remaining(&self) -> u32 {
        self.moves_remaining
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn gravity(&self) -> GravityDirection {
        self.gravity
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    pub fn flags(&self) -> &UpgradeFlags {
        &self.flags
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Completion summary; `None` until the level is complete.
    pub fn result(&self) -> Option<LevelResult> {
        if self.status != GameStatus::LevelComplete {
            return None;
        }
        Some(campaign::level_result(
            self.score,
            self.config.target_score,
            self.moves_remaining,
        ))
    }

    /// Swap the tiles at `a` and `b` and run the cascade.
    pub fn swap(&mut self, a: Coord, b: Coord) -> Result<MoveReport, MoveError> {
        if self.status != GameStatus::Playing {
            return Err(MoveError::Finished);
        }
        if self.grid.at(a).is_none() {
            return Err(MoveError::OutOfBounds(a));
        }
        if self.grid.at(b).is_none() {
            return Err(MoveError::OutOfBounds(b));
        }
        if !a.is_adjacent(b) {
            return Err(MoveError::NotAdjacent);
        }
        if self.grid.is_obstacle(a.x as i8, a.y as i8) || self.grid.is_obstacle(b.x as i8, b.y as i8)
        {
            return Err(MoveError::ObstacleCell);
        }

        self.grid.swap(a, b);
        let scan = detect::detect(&self.grid);
        if !scan.has_match() {
            self.grid.swap(a, b);
            self.charge_move();
            return Ok(self.report(MoveOutcome::Reverted, 0, Vec::new(), None, 0, 0));
        }

        self.gravity = self.rng.gravity_direction();
        let report = self.cascade(scan, Some(b));
        self.charge_move();
        Ok(self.finish_report(MoveOutcome::Swapped, report))
    }

    /// Fire the special tile at `coord` and run the cascade.
    pub fn activate(&mut self, coord: Coord) -> Result<MoveReport, MoveError> {
        if self.status != GameStatus::Playing {
            return Err(MoveError::Finished);
        }
        let Some(cell) = self.grid.at(coord) else {
            return Err(MoveError::OutOfBounds(coord));
        };
        let special = match cell.tile().and_then(|t| t.special) {
            Some(s) => s,
            None => return Err(MoveError::NoSpecial(coord)),
        };

        self.gravity = self.rng.gravity_direction();

        // The special is spent before its cells clear so it cannot re-fire.
        if let Some(tile) = self.grid.at_mut(coord).and_then(|c| c.tile_mut()) {
            tile.special = None;
        }

        let cleared = special::activation_cells(&self.grid, coord, special);
        let score = scoring::activation_score(cleared.len() as u32, self.flags.score_boost);
        let mut partial = CascadeTally::default();
        partial.apply_pass(self, &cleared, &cleared, score);

        let scan = detect::detect(&self.grid);
        let mut tally = self.run_cascade(scan, None, partial);
        tally.special_created = None;
        self.charge_move();
        Ok(self.finish_report(MoveOutcome::Activated, tally))
    }

    /// Regenerate the board and reset the attempt. Banked resources stay.
    pub fn restart(&mut self) -> Result<(), ConfigError> {
        self.grid = generator::generate(&self.config, &mut self.rng)?;
        self.score = 0;
        self.moves_remaining = self.config.move_budget(self.flags.extra_moves);
        self.status = GameStatus::Playing;
        self.gravity = GravityDirection::Down;
        Ok(())
    }

    /// Advance to the next campaign level after a completion.
    pub fn next_level(&mut self) -> Result<(), ConfigError> {
        let next = self.config.number + 1;
        let config = *campaign::level(next).ok_or(ConfigError::UnknownLevel(next))?;
        self.config = config;
        self.restart()
    }

    /// Capture the full session into a caller-owned snapshot.
    pub fn snapshot_into(&self, out: &mut SessionSnapshot) {
        out.capture_grid(&self.grid);
        out.level = self.config.number;
        out.score = self.score;
        out.target_score = self.config.target_score;
        out.moves_remaining = self.moves_remaining;
        out.status = self.status;
        out.gravity = self.gravity;
        out.resources = *self.resources.totals();
        out.rng_state = self.rng.state();
        out.flags = self.flags;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let mut snap = SessionSnapshot::default();
        self.snapshot_into(&mut snap);
        snap
    }

    /// Rebuild a running session from a snapshot.
    pub fn from_snapshot(snap: &SessionSnapshot) -> Result<Self, RestoreError> {
        let config =
            *campaign::level(snap.level).ok_or(RestoreError::UnknownLevel(snap.level))?;
        let mut grid = Grid::filled(crate::types::TileKind::House);
        for (index, cell_snap) in snap.cells.iter().enumerate() {
            let cell = cell_snap
                .to_cell()
                .ok_or(RestoreError::CorruptCell { index })?;
            let x = (index % GRID_SIZE as usize) as i8;
            let y = (index / GRID_SIZE as usize) as i8;
            grid.set(x, y, cell);
        }
        Ok(Self {
            grid,
            rng: SimpleRng::from_state(snap.rng_state),
            config,
            flags: snap.flags,
            score: snap.score,
            moves_remaining: snap.moves_remaining,
            status: snap.status,
            gravity: snap.gravity,
            resources: snap.resources(),
        })
    }

    fn cascade(&mut self, scan: MatchScan, destination: Option<Coord>) -> CascadeTally {
        self.run_cascade(scan, destination, CascadeTally::default())
    }

    /// Resolve and settle until no run remains. A special can only be born
    /// from the first pass, and only when a swap supplied a destination.
    fn run_cascade(
        &mut self,
        mut scan: MatchScan,
        destination: Option<Coord>,
        mut tally: CascadeTally,
    ) -> CascadeTally {
        let mut first = destination.is_some();
        while scan.has_match() {
            let matched = scan.matched;
            let mut cleared = matched;

            if first {
                first = false;
                if let Some(dest) = destination {
                    if let Some(planned) = special::plan(&scan, dest, &self.flags, &mut self.rng)
                    {
                        cleared.remove(planned.coord);
                        self.place_special(planned);
                        tally.special_created = Some(planned);
                    }
                }
            }

            let score = scoring::match_score(matched.len() as u32, self.flags.score_boost);
            tally.apply_pass(self, &matched, &cleared, score);
            scan = detect::detect(&self.grid);
        }
        tally
    }

    fn place_special(&mut self, planned: PlannedSpecial) {
        let x = planned.coord.x as i8;
        let y = planned.coord.y as i8;
        if let Some(kind) = self.grid.tile_kind(x, y) {
            self.grid
                .set(x, y, Cell::Tile(Tile::with_special(kind, planned.special)));
        }
    }

    fn charge_move(&mut self) {
        self.moves_remaining = self.moves_remaining.saturating_sub(1);
        if self.score >= self.config.target_score {
            self.status = GameStatus::LevelComplete;
        } else if self.moves_remaining == 0 {
            self.status = GameStatus::GameOver;
        }
    }

    fn report(
        &self,
        outcome: MoveOutcome,
        score_delta: u32,
        passes: Vec<PassDetail>,
        special_created: Option<PlannedSpecial>,
        obstacle_hits: u32,
        obstacles_cleared: u32,
    ) -> MoveReport {
        MoveReport {
            outcome,
            score_delta,
            passes,
            special_created,
            obstacle_hits,
            obstacles_cleared,
            status: self.status,
            gravity: self.gravity,
        }
    }

    fn finish_report(&self, outcome: MoveOutcome, tally: CascadeTally) -> MoveReport {
        self.report(
            outcome,
            tally.score,
            tally.passes,
            tally.special_created,
            tally.obstacle_hits,
            tally.obstacles_cleared,
        )
    }
}

/// Running totals across one action's cascade.
#[derive(Debug, Default)]
struct CascadeTally {
    score: u32,
    passes: Vec<PassDetail>,
    special_created: Option<PlannedSpecial>,
    obstacle_hits: u32,
    obstacles_cleared: u32,
}

impl CascadeTally {
    /// Score, bank resources, damage obstacles, and settle one pass.
    ///
    /// `matched` drives obstacle damage; `cleared` is what actually leaves
    /// the board (a freshly-born special stays put).
    fn apply_pass(&mut self, session: &mut Session, matched: &CoordSet, cleared: &CoordSet, score: u32) {
        session.score += score;
        self.score += score;

        for coord in cleared.iter() {
            if let Some(kind) = session.grid.tile_kind(coord.x as i8, coord.y as i8) {
                let (resource, units) =
                    scoring::yield_for(kind, session.flags.resource_yield);
                session.resources.credit(resource, units);
            }
        }

        let hits = obstacle::resolve(&mut session.grid, matched, &mut session.rng);
        self.obstacle_hits += hits.len() as u32;
        self.obstacles_cleared += hits.iter().filter(|h| h.cleared).count() as u32;

        let spawned = settle::settle(
            &mut session.grid,
            cleared,
            session.gravity,
            &mut session.rng,
        );
        self.passes.push(PassDetail {
            matched: cleared.len() as u32,
            score,
            spawned,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::CellSnapshot;
    use crate::types::{SpecialKind, TileKind};

    /// Snapshot with an alternating-pair board, level 1, ready to play.
    fn base_snapshot() -> SessionSnapshot {
        let mut snap = SessionSnapshot {
            level: 1,
            target_score: 100,
            moves_remaining: 20,
            rng_state: 42,
            ..SessionSnapshot::default()
        };
        for (i, slot) in snap.cells.iter_mut().enumerate() {
            let (x, y) = (i % 8, i / 8);
            slot.kind = Some(if (x / 2 + y) % 2 == 0 {
                TileKind::House
            } else {
                TileKind::Condo
            });
        }
        snap
    }

    fn set_kind(snap: &mut SessionSnapshot, x: usize, y: usize, kind: TileKind) {
        snap.cells[y * 8 + x] = CellSnapshot {
            kind: Some(kind),
            ..CellSnapshot::default()
        };
    }

    #[test]
    fn test_new_session_starts_playing() {
        let session = Session::new(1, UpgradeFlags::default(), 77).unwrap();
        assert_eq!(session.status(), GameStatus::Playing);
        assert_eq!(session.moves_remaining(), 20);
        assert_eq!(session.score(), 0);
        assert!(!detect::has_match(session.grid()));
    }

    #[test]
    fn test_unknown_level_rejected() {
        assert_eq!(
            Session::new(99, UpgradeFlags::default(), 1).unwrap_err(),
            ConfigError::UnknownLevel(99)
        );
    }

    #[test]
    fn test_extra_moves_upgrade_extends_budget() {
        let flags = UpgradeFlags {
            extra_moves: true,
            ..UpgradeFlags::default()
        };
        let session = Session::new(1, flags, 77).unwrap();
        assert_eq!(session.moves_remaining(), 22);
    }

    #[test]
    fn test_non_adjacent_swap_costs_nothing() {
        let mut session = Session::new(1, UpgradeFlags::default(), 77).unwrap();
        let err = session.swap(Coord::new(0, 0), Coord::new(2, 0)).unwrap_err();
        assert_eq!(err, MoveError::NotAdjacent);
        assert_eq!(session.moves_remaining(), 20);
    }

    #[test]
    fn test_out_of_bounds_swap_rejected() {
        let mut session = Session::new(1, UpgradeFlags::default(), 77).unwrap();
        let err = session.swap(Coord::new(0, 0), Coord::new(0, 8)).unwrap_err();
        assert_eq!(err, MoveError::OutOfBounds(Coord::new(0, 8)));
    }

    /// Villas at (0,7) (1,7) and (2,6); swapping (2,6) down completes the
    /// run. (2,7) is pinned to Condo so the displaced tile matches nothing.
    fn one_match_snapshot() -> SessionSnapshot {
        let mut snap = base_snapshot();
        set_kind(&mut snap, 0, 7, TileKind::Villa);
        set_kind(&mut snap, 1, 7, TileKind::Villa);
        set_kind(&mut snap, 2, 6, TileKind::Villa);
        set_kind(&mut snap, 2, 7, TileKind::Condo);
        snap
    }

    #[test]
    fn test_fruitless_swap_reverts_and_charges() {
        // (0,0)<->(1,0) matches nothing: the board alternates in pairs.
        let mut session = Session::from_snapshot(&base_snapshot()).unwrap();
        let before = session.grid().clone();
        let report = session.swap(Coord::new(0, 0), Coord::new(1, 0)).unwrap();
        assert_eq!(report.outcome, MoveOutcome::Reverted);
        assert_eq!(report.score_delta, 0);
        assert_eq!(session.moves_remaining(), 19);
        assert_eq!(*session.grid(), before);
    }

    #[test]
    fn test_matching_swap_scores_and_charges_once() {
        let mut session = Session::from_snapshot(&one_match_snapshot()).unwrap();

        let report = session.swap(Coord::new(2, 6), Coord::new(2, 7)).unwrap();
        assert_eq!(report.outcome, MoveOutcome::Swapped);
        assert!(report.score_delta >= 10);
        assert!(!report.passes.is_empty());
        assert_eq!(report.passes[0].matched, 3);
        assert_eq!(report.passes[0].score, 10);
        assert_eq!(session.moves_remaining(), 19);
        assert_eq!(session.score(), report.score_delta);
        // Three villas pay three units of glass.
        assert!(session.resources().get(crate::types::ResourceKind::Glass) >= 3);
    }

    #[test]
    fn test_activation_consumes_special_and_move() {
        let mut snap = base_snapshot();
        snap.cells[3 * 8 + 4].special = Some(SpecialKind::MarketMixer);
        let mut session = Session::from_snapshot(&snap).unwrap();

        let report = session.activate(Coord::new(4, 3)).unwrap();
        assert_eq!(report.outcome, MoveOutcome::Activated);
        // 3x3 clear: round(10 + 9 * 2) = 28 at minimum.
        assert!(report.score_delta >= 28);
        assert_eq!(session.moves_remaining(), 19);
        assert!(report.special_created.is_none());
    }

    #[test]
    fn test_activation_requires_a_special() {
        let mut session = Session::from_snapshot(&base_snapshot()).unwrap();
        let err = session.activate(Coord::new(4, 3)).unwrap_err();
        assert_eq!(err, MoveError::NoSpecial(Coord::new(4, 3)));
        assert_eq!(session.moves_remaining(), 20);
    }

    #[test]
    fn test_reaching_target_completes_level() {
        let mut snap = one_match_snapshot();
        snap.score = 95;
        let mut session = Session::from_snapshot(&snap).unwrap();

        let report = session.swap(Coord::new(2, 6), Coord::new(2, 7)).unwrap();
        assert_eq!(report.status, GameStatus::LevelComplete);
        assert_eq!(session.status(), GameStatus::LevelComplete);
        let result = session.result().unwrap();
        assert!(result.stars >= 1);
        assert_eq!(result.move_bonus, session.moves_remaining() * 50);
    }

    #[test]
    fn test_running_out_of_moves_ends_the_game() {
        let mut snap = base_snapshot();
        snap.moves_remaining = 1;
        let mut session = Session::from_snapshot(&snap).unwrap();

        let report = session.swap(Coord::new(0, 0), Coord::new(1, 0)).unwrap();
        assert_eq!(report.outcome, MoveOutcome::Reverted);
        assert_eq!(session.status(), GameStatus::GameOver);
        assert_eq!(
            session.swap(Coord::new(0, 0), Coord::new(1, 0)).unwrap_err(),
            MoveError::Finished
        );
    }

    #[test]
    fn test_snapshot_round_trip_replays_identically() {
        let mut original = Session::from_snapshot(&one_match_snapshot()).unwrap();
        let mut restored = Session::from_snapshot(&original.snapshot()).unwrap();

        let a = original.swap(Coord::new(2, 6), Coord::new(2, 7)).unwrap();
        let b = restored.swap(Coord::new(2, 6), Coord::new(2, 7)).unwrap();
        assert_eq!(a, b);
        assert_eq!(original.snapshot(), restored.snapshot());
    }

    #[test]
    fn test_restart_keeps_resources() {
        let mut session = Session::from_snapshot(&one_match_snapshot()).unwrap();
        session.swap(Coord::new(2, 6), Coord::new(2, 7)).unwrap();
        let banked = *session.resources().totals();

        session.restart().unwrap();
        assert_eq!(session.score(), 0);
        assert_eq!(session.moves_remaining(), 20);
        assert_eq!(session.status(), GameStatus::Playing);
        assert_eq!(*session.resources().totals(), banked);
    }

    #[test]
    fn test_next_level_advances_config() {
        let mut session = Session::new(1, UpgradeFlags::default(), 5).unwrap();
        session.next_level().unwrap();
        assert_eq!(session.level().number, 2);
        assert_eq!(session.level().target_score, 150);
        assert_eq!(session.moves_remaining(), 18);
    }

    #[test]
    fn test_last_level_has_no_successor() {
        let mut session = Session::new(15, UpgradeFlags::default(), 5).unwrap();
        assert_eq!(
            session.next_level().unwrap_err(),
            ConfigError::UnknownLevel(16)
        );
    }
}
