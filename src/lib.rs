//! TUI Estates (workspace facade crate).
//!
//! This package keeps the `tui_estates::{core,adapter,term,input,types}`
//! public API stable while the implementation lives in dedicated crates
//! under `crates/`.

pub use tui_estates_adapter as adapter;
pub use tui_estates_core as core;
pub use tui_estates_input as input;
pub use tui_estates_term as term;
pub use tui_estates_types as types;

pub mod observe;
