//! Match store.
//!
//! Pair creation is "insert, treat conflict as already-matched": the
//! UNIQUE(lost_item_id, found_item_id) constraint is the authority on
//! deduplication, so concurrent scans of the same pair can both attempt the
//! insert and exactly one wins. Check-then-insert would race.

use chrono::Utc;
use reclaim_protocol::MatchStatus;
use sqlx::sqlite::SqlitePool;

use super::models::{MatchRecord, NewMatch};
use crate::error::Result;

#[derive(Clone)]
pub struct MatchStore {
    pool: SqlitePool,
}

impl MatchStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a match for the pair unless one already exists.
    ///
    /// Returns the freshly created record, or `None` when the pair was
    /// already matched (silent no-op, including under concurrent creators).
    pub async fn insert_if_absent(&self, new: &NewMatch) -> Result<Option<MatchRecord>> {
        let res = sqlx::query(
            r#"
            INSERT INTO matches
                (lost_item_id, found_item_id, match_status, match_date,
                 loster_name, loster_phone, loster_email,
                 founder_name, founder_phone, founder_email,
                 device_name, serial_number)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(lost_item_id, found_item_id) DO NOTHING
            "#,
        )
        .bind(new.lost_item_id)
        .bind(new.found_item_id)
        .bind(MatchStatus::Unclaimed.as_str())
        .bind(Utc::now())
        .bind(&new.loster_name)
        .bind(&new.loster_phone)
        .bind(&new.loster_email)
        .bind(&new.founder_name)
        .bind(&new.founder_phone)
        .bind(&new.founder_email)
        .bind(&new.device_name)
        .bind(&new.serial_number)
        .execute(&self.pool)
        .await?;

        if res.rows_affected() == 0 {
            return Ok(None);
        }

        let record = sqlx::query_as("SELECT * FROM matches WHERE id = ?")
            .bind(res.last_insert_rowid())
            .fetch_one(&self.pool)
            .await?;
        Ok(Some(record))
    }

    pub async fn get(&self, id: i64) -> Result<Option<MatchRecord>> {
        let record = sqlx::query_as("SELECT * FROM matches WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    pub async fn for_pair(&self, lost_item_id: i64, found_item_id: i64) -> Result<Option<MatchRecord>> {
        let record =
            sqlx::query_as("SELECT * FROM matches WHERE lost_item_id = ? AND found_item_id = ?")
                .bind(lost_item_id)
                .bind(found_item_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(record)
    }

    /// List matches, most recent first.
    pub async fn list(&self, limit: i64) -> Result<Vec<MatchRecord>> {
        let records = sqlx::query_as(
            "SELECT * FROM matches ORDER BY match_date DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}
