//! Claim coordinator.
//!
//! The only code path allowed to finalize a match. The status guard and all
//! writes (match, both items, the return row) run in one transaction;
//! concurrent claims on the same match are decided by
//! `UPDATE ... WHERE match_status = 'unclaimed'` — exactly one caller sees
//! a row change, everyone else gets `AlreadyClaimed`. Notifications go out
//! after commit and never affect the outcome.

use std::sync::Arc;

use chrono::Utc;
use reclaim_protocol::ItemKind;
use sqlx::sqlite::SqlitePool;
use tracing::info;

use crate::db::models::MatchRecord;
use crate::error::{EngineError, Result};
use crate::notify::{self, subject, Notifier};

pub struct ClaimCoordinator {
    pool: SqlitePool,
    notifier: Arc<dyn Notifier>,
}

impl ClaimCoordinator {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn Notifier>) -> Self {
        Self { pool, notifier }
    }

    /// Finalize a match: mark it claimed, move both items to their terminal
    /// status, and record the return. All-or-nothing.
    pub async fn claim(
        &self,
        match_id: i64,
        acting_user: i64,
        notes: Option<String>,
    ) -> Result<MatchRecord> {
        let mut tx = self.pool.begin().await?;

        let record: Option<MatchRecord> = sqlx::query_as("SELECT * FROM matches WHERE id = ?")
            .bind(match_id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(record) = record else {
            return Err(EngineError::MatchNotFound(match_id));
        };

        let now = Utc::now();

        // Compare-and-set on the match status decides the winner under
        // concurrent claims; the transaction extends that decision over the
        // item and return writes.
        let rows = sqlx::query(
            "UPDATE matches SET match_status = 'claimed', claimed_at = ? WHERE id = ? AND match_status = 'unclaimed'",
        )
        .bind(now)
        .bind(match_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(EngineError::AlreadyClaimed(match_id));
        }

        sqlx::query("UPDATE lost_items SET status = 'claimed', updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(record.lost_item_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE found_items SET status = 'claimed', updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(record.found_item_id)
            .execute(&mut *tx)
            .await?;

        let owner_user_id: Option<i64> =
            sqlx::query_scalar("SELECT user_id FROM lost_items WHERE id = ?")
                .bind(record.lost_item_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(EngineError::ItemNotFound {
                    kind: ItemKind::Lost,
                    id: record.lost_item_id,
                })?;
        let finder_user_id: Option<i64> =
            sqlx::query_scalar("SELECT user_id FROM found_items WHERE id = ?")
                .bind(record.found_item_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(EngineError::ItemNotFound {
                    kind: ItemKind::Found,
                    id: record.found_item_id,
                })?;

        sqlx::query(
            r#"
            INSERT INTO returns
                (lost_item_id, found_item_id, owner_user_id, finder_user_id,
                 owner_name, owner_email, finder_name, finder_email,
                 confirmation, claimed_by, notes, claimed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?)
            "#,
        )
        .bind(record.lost_item_id)
        .bind(record.found_item_id)
        .bind(owner_user_id)
        .bind(finder_user_id)
        .bind(&record.loster_name)
        .bind(&record.loster_email)
        .bind(&record.founder_name)
        .bind(&record.founder_email)
        .bind(acting_user)
        .bind(&notes)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let updated: MatchRecord = sqlx::query_as("SELECT * FROM matches WHERE id = ?")
            .bind(match_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(match_id, acting_user, "claim finalized, return recorded");

        // Post-commit, best-effort
        notify::dispatch(
            self.notifier.as_ref(),
            updated.loster_email.as_deref(),
            subject::RETURN_READY_OWNER,
            notify::return_to_owner_body(&updated),
        )
        .await;
        notify::dispatch(
            self.notifier.as_ref(),
            updated.founder_email.as_deref(),
            subject::RETURN_READY_FINDER,
            notify::return_to_finder_body(&updated),
        )
        .await;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::models::{NewFoundItem, NewLostItem};
    use crate::db::{ItemStore, ReturnStore};
    use crate::matcher::Matcher;
    use crate::notify::MemoryNotifier;
    use reclaim_protocol::{ItemStatus, MatchStatus};

    struct Fixture {
        pool: SqlitePool,
        items: ItemStore,
        returns: ReturnStore,
        coordinator: ClaimCoordinator,
        notifier: Arc<MemoryNotifier>,
    }

    async fn setup() -> Fixture {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        db::init_schema(&pool).await.unwrap();
        let notifier = Arc::new(MemoryNotifier::new());
        Fixture {
            pool: pool.clone(),
            items: ItemStore::new(pool.clone()),
            returns: ReturnStore::new(pool.clone()),
            coordinator: ClaimCoordinator::new(pool, notifier.clone()),
            notifier,
        }
    }

    impl Fixture {
        /// Report a lost and a found item with the same serial and return
        /// the resulting match.
        async fn matched_pair(&self) -> MatchRecord {
            self.items
                .create_lost(NewLostItem {
                    title: "Lost Phone".to_string(),
                    category: "Phone".to_string(),
                    serial_number: Some("SN123".to_string()),
                    first_name: Some("John".to_string()),
                    last_name: Some("Doe".to_string()),
                    loster_email: Some("john@example.com".to_string()),
                    user_id: Some(7),
                    ..Default::default()
                })
                .await
                .unwrap();
            let found = self
                .items
                .create_found(NewFoundItem {
                    name: "iPhone".to_string(),
                    category: "Phone".to_string(),
                    serial_number: Some("SN123".to_string()),
                    founder_email: Some("finder@example.com".to_string()),
                    ..Default::default()
                })
                .await
                .unwrap();

            let matcher = Matcher::new(self.pool.clone(), Arc::new(MemoryNotifier::new()));
            let mut created = matcher.on_found_item_created(&found).await.unwrap();
            created.pop().expect("pair should match")
        }
    }

    #[tokio::test]
    async fn test_claim_finalizes_match_items_and_return() {
        let fx = setup().await;
        let record = fx.matched_pair().await;

        let updated = fx
            .coordinator
            .claim(record.id, 42, Some("picked up at front desk".to_string()))
            .await
            .unwrap();

        assert_eq!(updated.match_status, MatchStatus::Claimed);
        assert!(updated.claimed_at.is_some());

        let lost = fx.items.get_lost(record.lost_item_id).await.unwrap().unwrap();
        let found = fx
            .items
            .get_found(record.found_item_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lost.status, ItemStatus::Claimed);
        assert_eq!(found.status, ItemStatus::Claimed);

        let returns = fx
            .returns
            .for_pair(record.lost_item_id, record.found_item_id)
            .await
            .unwrap();
        assert_eq!(returns.len(), 1);
        let ret = &returns[0];
        assert!(ret.confirmation);
        assert_eq!(ret.claimed_by, 42);
        assert_eq!(ret.owner_user_id, Some(7));
        assert_eq!(ret.finder_user_id, None);
        assert_eq!(ret.owner_name.as_deref(), Some("John Doe"));
        assert_eq!(ret.owner_email.as_deref(), Some("john@example.com"));
        assert_eq!(ret.finder_email.as_deref(), Some("finder@example.com"));
        assert_eq!(ret.notes.as_deref(), Some("picked up at front desk"));

        let subjects: Vec<_> = fx
            .notifier
            .messages()
            .iter()
            .map(|m| m.subject.clone())
            .collect();
        assert!(subjects.contains(&subject::RETURN_READY_OWNER.to_string()));
        assert!(subjects.contains(&subject::RETURN_READY_FINDER.to_string()));
    }

    #[tokio::test]
    async fn test_second_claim_is_rejected() {
        let fx = setup().await;
        let record = fx.matched_pair().await;

        fx.coordinator.claim(record.id, 1, None).await.unwrap();
        let err = fx.coordinator.claim(record.id, 2, None).await.unwrap_err();
        assert!(matches!(err, EngineError::AlreadyClaimed(id) if id == record.id));

        // Still exactly one return
        assert_eq!(fx.returns.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_claims_have_one_winner() {
        let fx = setup().await;
        let record = fx.matched_pair().await;

        let a = fx.coordinator.claim(record.id, 1, None);
        let b = fx.coordinator.claim(record.id, 2, None);
        let (ra, rb) = tokio::join!(a, b);

        assert!(ra.is_ok() != rb.is_ok(), "exactly one claim must win");
        let loser = if ra.is_ok() { rb } else { ra };
        assert!(matches!(loser.unwrap_err(), EngineError::AlreadyClaimed(_)));
        assert_eq!(fx.returns.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_claim_unknown_match() {
        let fx = setup().await;
        let err = fx.coordinator.claim(999, 1, None).await.unwrap_err();
        assert!(matches!(err, EngineError::MatchNotFound(999)));
        assert_eq!(fx.returns.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_claimed_items_cannot_reopen() {
        let fx = setup().await;
        let record = fx.matched_pair().await;
        fx.coordinator.claim(record.id, 1, None).await.unwrap();

        let err = fx
            .items
            .set_status(
                reclaim_protocol::ItemKind::Lost,
                record.lost_item_id,
                ItemStatus::Lost,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }
}
