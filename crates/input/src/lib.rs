//! Terminal input module (engine-facing).
//!
//! This module is intentionally independent of any UI framework. It maps
//! `crossterm` key events into [`crate::types::GameAction`] values the game
//! loop consumes. Cursor movement is discrete, so no key-repeat handling is
//! needed beyond what the terminal already provides.

pub mod map;

pub use tui_estates_types as types;

pub use map::{handle_key_event, should_quit};
