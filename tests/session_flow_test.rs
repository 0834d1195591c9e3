//! End-to-end session scenarios through the public snapshot API.
//!
//! Boards are hand-crafted as snapshots and loaded with
//! `Session::from_snapshot`, so every test drives the same code paths a
//! restored save would.

use tui_estates::core::snapshot::{CellSnapshot, SessionSnapshot};
use tui_estates::core::{detect, MoveError, MoveOutcome, Session};
use tui_estates::types::{
    Coord, GameStatus, ObstacleKind, ResourceKind, SpecialKind, TileKind, UpgradeFlags,
};

/// A board with no matches: kinds alternate in horizontal pairs.
fn stable_snapshot() -> SessionSnapshot {
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

/// Swapping (2,6) down into (2,7) completes a Villa run on the bottom row.
fn one_match_snapshot() -> SessionSnapshot {
    let mut snap = stable_snapshot();
    set_kind(&mut snap, 0, 7, TileKind::Villa);
    set_kind(&mut snap, 1, 7, TileKind::Villa);
    set_kind(&mut snap, 2, 6, TileKind::Villa);
    set_kind(&mut snap, 2, 7, TileKind::Condo);
    snap
}

#[test]
fn test_disjoint_runs_score_as_one_pass() {
    // Swapping (2,0) and (2,1) completes two separate 3-runs at once: the
    // Villa row through (2,0) and the Townhouse column through (2,1).
    let mut snap = stable_snapshot();
    set_kind(&mut snap, 0, 0, TileKind::Villa);
    set_kind(&mut snap, 1, 0, TileKind::Villa);
    set_kind(&mut snap, 2, 0, TileKind::Townhouse);
    set_kind(&mut snap, 2, 1, TileKind::Villa);
    set_kind(&mut snap, 2, 2, TileKind::Townhouse);
    set_kind(&mut snap, 2, 3, TileKind::Townhouse);

    let mut session = Session::from_snapshot(&snap).unwrap();
    assert!(!detect::has_match(session.grid()));

    let report = session.swap(Coord::new(2, 0), Coord::new(2, 1)).unwrap();
    assert_eq!(report.outcome, MoveOutcome::Swapped);
    // Six matched tiles score as one pass: 10 + (6 - 3) * 5.
    assert_eq!(report.passes[0].matched, 6);
    assert_eq!(report.passes[0].score, 25);
}

#[test]
fn test_stable_board_loads_without_matches() {
    let session = Session::from_snapshot(&stable_snapshot()).unwrap();
    assert!(!detect::has_match(session.grid()));
    assert_eq!(session.status(), GameStatus::Playing);
}

#[test]
fn test_non_adjacent_swap_is_free() {
    let mut session = Session::from_snapshot(&stable_snapshot()).unwrap();
    let err = session.swap(Coord::new(0, 0), Coord::new(2, 0)).unwrap_err();
    assert_eq!(err, MoveError::NotAdjacent);
    assert_eq!(session.moves_remaining(), 20);
}

#[test]
fn test_swap_into_obstacle_is_free() {
    let mut snap = stable_snapshot();
    snap.cells[0] = CellSnapshot {
        obstacle: Some(ObstacleKind::LockedGate),
        ..CellSnapshot::default()
    };
    let mut session = Session::from_snapshot(&snap).unwrap();
    let err = session.swap(Coord::new(0, 0), Coord::new(1, 0)).unwrap_err();
    assert_eq!(err, MoveError::ObstacleCell);
    assert_eq!(session.moves_remaining(), 20);
}

#[test]
fn test_match_yields_resources_and_leaves_full_board() {
    let mut session = Session::from_snapshot(&one_match_snapshot()).unwrap();

    let report = session.swap(Coord::new(2, 6), Coord::new(2, 7)).unwrap();
    assert_eq!(report.outcome, MoveOutcome::Swapped);
    assert!(report.score_delta >= 10);
    assert_eq!(session.moves_remaining(), 19);

    // Villas pay out in glass.
    assert!(session.resources().get(ResourceKind::Glass) >= 1);

    // The cascade ran to quiescence and refilled every vacancy.
    assert!(!detect::has_match(session.grid()));
    let after = session.snapshot();
    assert!(after
        .cells
        .iter()
        .all(|c| c.kind.is_some() || c.obstacle.is_some()));
}

#[test]
fn test_gate_next_to_match_is_cleared() {
    let mut snap = one_match_snapshot();
    snap.cells[7 * 8 + 3] = CellSnapshot {
        obstacle: Some(ObstacleKind::LockedGate),
        ..CellSnapshot::default()
    };
    let mut session = Session::from_snapshot(&snap).unwrap();

    let report = session.swap(Coord::new(2, 6), Coord::new(2, 7)).unwrap();
    assert_eq!(report.obstacle_hits, 1);
    assert_eq!(report.obstacles_cleared, 1);

    let after = session.snapshot();
    assert!(after.cells.iter().all(|c| c.obstacle.is_none()));
}

#[test]
fn test_reaching_target_completes_level() {
    let mut snap = one_match_snapshot();
    snap.score = 95;
    snap.moves_remaining = 1;
    let mut session = Session::from_snapshot(&snap).unwrap();

    let report = session.swap(Coord::new(2, 6), Coord::new(2, 7)).unwrap();
    assert_eq!(report.status, GameStatus::LevelComplete);
    assert_eq!(session.status(), GameStatus::LevelComplete);

    let result = session.result().expect("completed level has a result");
    assert!(result.stars >= 1);
}

#[test]
fn test_running_out_of_moves_ends_game() {
    let mut snap = stable_snapshot();
    snap.moves_remaining = 1;
    let mut session = Session::from_snapshot(&snap).unwrap();

    // A fruitless swap still burns the last move.
    let report = session.swap(Coord::new(0, 0), Coord::new(1, 0)).unwrap();
    assert_eq!(report.outcome, MoveOutcome::Reverted);
    assert_eq!(session.status(), GameStatus::GameOver);

    let err = session.swap(Coord::new(0, 0), Coord::new(1, 0)).unwrap_err();
    assert_eq!(err, MoveError::Finished);
}

#[test]
fn test_activation_clears_row() {
    let mut snap = stable_snapshot();
    snap.cells[4 * 8 + 3] = CellSnapshot {
        kind: Some(TileKind::Villa),
        special: Some(SpecialKind::RenovationBomb),
        ..CellSnapshot::default()
    };
    let mut session = Session::from_snapshot(&snap).unwrap();

    let report = session.activate(Coord::new(3, 4)).unwrap();
    assert_eq!(report.outcome, MoveOutcome::Activated);
    // Eight row cells at 2 points each on top of the base value.
    assert!(report.score_delta >= 26);
    assert_eq!(session.moves_remaining(), 19);

    let err = session.activate(Coord::new(0, 0)).unwrap_err();
    assert_eq!(err, MoveError::NoSpecial(Coord::new(0, 0)));
}

#[test]
fn test_restart_keeps_banked_resources() {
    let mut session = Session::from_snapshot(&one_match_snapshot()).unwrap();
    session.swap(Coord::new(2, 6), Coord::new(2, 7)).unwrap();
    let glass = session.resources().get(ResourceKind::Glass);
    assert!(glass >= 1);

    session.restart().unwrap();
    assert_eq!(session.score(), 0);
    assert_eq!(session.moves_remaining(), 20);
    assert_eq!(session.status(), GameStatus::Playing);
    assert_eq!(session.resources().get(ResourceKind::Glass), glass);
    assert!(!detect::has_match(session.grid()));
}

#[test]
fn test_snapshot_round_trip_preserves_session() {
    let session = Session::from_snapshot(&one_match_snapshot()).unwrap();
    let snap = session.snapshot();
    let restored = Session::from_snapshot(&snap).unwrap();
    assert_eq!(restored.snapshot(), snap);
}

#[test]
fn test_upgrade_flags_survive_restore() {
    let flags = UpgradeFlags {
        extra_moves: true,
        score_boost: true,
        ..UpgradeFlags::default()
    };
    let mut snap = stable_snapshot();
    snap.flags = flags;
    let session = Session::from_snapshot(&snap).unwrap();
    assert_eq!(*session.flags(), flags);
}
