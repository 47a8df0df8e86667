//! Canonical types for the Reclaim lost & found tracker.
//!
//! Item and match lifecycles are one-way state machines shared by every
//! crate; the enums here are the single definition of those states.

pub mod naming;
pub mod types;

pub use naming::display_name;
pub use types::{ItemKind, ItemStatus, MatchStatus};
