//! Error types for the workflow engine.

use reclaim_protocol::{ItemKind, ItemStatus};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Engine error type.
///
/// Duplicate match creation is deliberately NOT represented here: a
/// uniqueness conflict on the (lost_item, found_item) pair is treated as
/// success with nothing to do.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("match {0} not found")]
    MatchNotFound(i64),

    #[error("{kind} item {id} not found")]
    ItemNotFound { kind: ItemKind, id: i64 },

    #[error("match {0} is already claimed")]
    AlreadyClaimed(i64),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: ItemStatus, to: ItemStatus },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
