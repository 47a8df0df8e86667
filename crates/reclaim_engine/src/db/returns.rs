//! Return store: read access to the handover audit trail.
//!
//! Rows are written only by the claim transaction; this store never updates
//! or deletes them.

use sqlx::sqlite::SqlitePool;

use super::models::ReturnRecord;
use crate::error::Result;

#[derive(Clone)]
pub struct ReturnStore {
    pool: SqlitePool,
}

impl ReturnStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List returns, most recent first.
    pub async fn list(&self, limit: i64) -> Result<Vec<ReturnRecord>> {
        let records = sqlx::query_as(
            "SELECT * FROM returns ORDER BY claimed_at DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    pub async fn for_pair(
        &self,
        lost_item_id: i64,
        found_item_id: i64,
    ) -> Result<Vec<ReturnRecord>> {
        let records =
            sqlx::query_as("SELECT * FROM returns WHERE lost_item_id = ? AND found_item_id = ?")
                .bind(lost_item_id)
                .bind(found_item_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(records)
    }

    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM returns")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
