//! Database layer for the workflow engine.
//!
//! SQLite via sqlx. Every multi-record write path goes through a single
//! transaction; single-statement status updates rely on
//! `UPDATE ... WHERE <status guard>` compare-and-set.

pub mod items;
pub mod matches;
pub mod models;
pub mod returns;
pub mod schema;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

pub use items::{ContactUpdate, ItemSearch, ItemStore};
pub use matches::MatchStore;
pub use models::{
    FoundItem, LostItem, MatchRecord, NewFoundItem, NewLostItem, NewMatch, ReturnRecord,
};
pub use returns::ReturnStore;
pub use schema::init_schema;

/// Open a connection pool for the given SQLite URL, creating the database
/// file if it does not exist yet.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    SqlitePoolOptions::new().connect_with(options).await
}
