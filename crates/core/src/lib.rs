//! Core rules engine - pure, deterministic, and testable
//!
//! This crate contains all the puzzle rules, the campaign table, and the
//! session orchestration. It has **zero dependencies** on UI, networking, or
//! I/O, making it:
//!
//! - **Deterministic**: a session replays identically from its seed
//! - **Testable**: every rule is exercised without a terminal
//! - **Portable**: runs headless, under a TUI, or behind a sync service
//! - **Fast**: zero-allocation hot paths for detection and settling
//!
//! # Module Structure
//!
//! - [`grid`]: 8x8 playfield of property tiles and obstacles
//! - [`generator`]: initial boards guaranteed free of pre-made runs
//! - [`detect`]: row/column scans for runs of three or more
//! - [`special`]: special tile creation from match shapes, and activation
//! - [`obstacle`]: damage to locked gates, foundation blocks, locked cards
//! - [`settle`]: four-direction gravity with obstacle-split lanes
//! - [`scoring`]: score and resource formulas
//! - [`campaign`]: the fifteen-level table and star grading
//! - [`session`]: one level attempt from first swap to terminal state
//! - [`snapshot`]: plain-data captures for rendering and sync
//! - [`rng`]: the single seeded generator everything draws from
//!
//! # Game Rules
//!
//! - **Swaps**: two adjacent tiles trade places; a swap that produces no run
//!   of three is undone but still costs the move
//! - **Cascades**: matched tiles clear, survivors slide toward the gravity
//!   edge, fresh tiles fill in, and new runs resolve until the board is quiet
//! - **Gravity**: one of four compass directions, drawn per player action
//! - **Specials**: larger match shapes leave behind a tile that clears a row,
//!   a column, a 3x3 block, or a full cross when activated
//! - **Obstacles**: never match and never move; matches alongside them chip
//!   them away
//!
//! # Example
//!
//! ```
//! use tui_estates_core::session::Session;
//! use tui_estates_core::types::{Coord, GameStatus, UpgradeFlags};
//!
//! let mut session = Session::new(1, UpgradeFlags::default(), 12345).unwrap();
//! assert_eq!(session.status(), GameStatus::Playing);
//!
//! // Reject a non-adjacent swap without charging a move.
//! assert!(session.swap(Coord::new(0, 0), Coord::new(3, 0)).is_err());
//! assert_eq!(session.moves_remaining(), 20);
//! ```

pub mod campaign;
pub mod detect;
pub mod error;
pub mod generator;
pub mod grid;
pub mod obstacle;
pub mod rng;
pub mod scoring;
pub mod session;
pub mod settle;
pub mod snapshot;
pub mod special;

pub use tui_estates_types as types;

// Re-export commonly used types for convenience
pub use campaign::{level, LevelConfig, LevelResult, Region, CAMPAIGN};
pub use detect::{detect, has_match, CoordSet, MatchScan, Run};
pub use error::{ConfigError, MoveError, RestoreError};
pub use grid::{Cell, Grid, Obstacle, Tile};
pub use rng::SimpleRng;
pub use session::{MoveOutcome, MoveReport, PassDetail, Session};
pub use snapshot::{CellSnapshot, SessionSnapshot};
pub use special::PlannedSpecial;
