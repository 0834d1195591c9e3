//! Typed errors for level configuration and move handling.

use thiserror::Error;

use crate::types::Coord;

/// Malformed level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("requested {requested} obstacles but the grid only has {capacity} cells")]
    TooManyObstacles { requested: usize, capacity: usize },

    #[error("obstacle placement gave up after {attempts} attempts")]
    PlacementExhausted { attempts: u32 },

    #[error("unknown campaign level {0}")]
    UnknownLevel(u32),
}

/// A player action the session cannot carry out.
///
/// These are ordinary values; a rejected move leaves the session untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("coordinate ({}, {}) is outside the grid", .0.x, .0.y)]
    OutOfBounds(Coord),

    #[error("swap cells must be two distinct adjacent coordinates")]
    NotAdjacent,

    #[error("obstacle cells cannot be swapped")]
    ObstacleCell,

    #[error("no special tile at ({}, {})", .0.x, .0.y)]
    NoSpecial(Coord),

    #[error("the level attempt is already finished")]
    Finished,
}

/// A snapshot that cannot be turned back into a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RestoreError {
    #[error("snapshot names unknown campaign level {0}")]
    UnknownLevel(u32),

    #[error("snapshot cell {index} is neither a tile nor an obstacle")]
    CorruptCell { index: usize },
}
