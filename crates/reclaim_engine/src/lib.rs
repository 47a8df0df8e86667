//! Reclaim workflow engine.
//!
//! Connects owners of lost items with finders: when a new report's serial
//! number matches an open counterpart report, a deduplicated match with a
//! point-in-time contact snapshot is recorded and both parties are
//! notified; a later claim finalizes the match, moves both items to their
//! terminal status, and records the return — all in one transaction.

pub mod claim;
pub mod db;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod notify;

pub use claim::ClaimCoordinator;
pub use db::{
    ContactUpdate, FoundItem, ItemSearch, ItemStore, LostItem, MatchRecord, MatchStore,
    NewFoundItem, NewLostItem, NewMatch, ReturnRecord, ReturnStore,
};
pub use engine::{Engine, EngineConfig, DEFAULT_DATABASE_URL};
pub use error::EngineError;
pub use matcher::Matcher;
pub use notify::{LogNotifier, MemoryNotifier, Notifier, OutboundMessage};
