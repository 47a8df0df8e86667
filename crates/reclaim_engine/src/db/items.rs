//! Item store: lost/found report persistence, lookups, and the status
//! transition guard.
//!
//! The guard admits exactly two edges (`lost -> claimed`, `found -> claimed`)
//! and enforces them with `UPDATE ... WHERE status = <current>` so racing
//! writers cannot double-apply a transition. A direct edit that claims an
//! item also cascades `claimed` to every other item sharing its serial
//! number; that cascade is a deliberately loose bulk update, separate from
//! the claim transaction.

use chrono::Utc;
use reclaim_protocol::{ItemKind, ItemStatus};
use sqlx::sqlite::SqlitePool;
use tracing::info;

use super::models::{FoundItem, LostItem, NewFoundItem, NewLostItem};
use crate::error::{EngineError, Result};

/// Substring filters for the item search endpoints. Absent fields match
/// everything.
#[derive(Debug, Clone, Default)]
pub struct ItemSearch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
}

/// Partial update of an item's contact fields. Absent fields are left
/// untouched. Status is not editable through this path.
#[derive(Debug, Clone, Default)]
pub struct ContactUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone)]
pub struct ItemStore {
    pool: SqlitePool,
}

impl ItemStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ========================================================================
    // Creation
    // ========================================================================

    pub async fn create_lost(&self, new: NewLostItem) -> Result<LostItem> {
        let now = Utc::now();
        let res = sqlx::query(
            r#"
            INSERT INTO lost_items
                (title, category, description, color, serial_number,
                 first_name, last_name, loster_phone, loster_email, user_id,
                 status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.title)
        .bind(&new.category)
        .bind(&new.description)
        .bind(&new.color)
        .bind(&new.serial_number)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.loster_phone)
        .bind(&new.loster_email)
        .bind(new.user_id)
        .bind(ItemStatus::Lost.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = res.last_insert_rowid();
        self.get_lost(id).await?.ok_or(EngineError::ItemNotFound {
            kind: ItemKind::Lost,
            id,
        })
    }

    pub async fn create_found(&self, new: NewFoundItem) -> Result<FoundItem> {
        let now = Utc::now();
        let res = sqlx::query(
            r#"
            INSERT INTO found_items
                (name, category, description, color, serial_number,
                 first_name, last_name, founder_phone, founder_email, user_id,
                 status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.name)
        .bind(&new.category)
        .bind(&new.description)
        .bind(&new.color)
        .bind(&new.serial_number)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.founder_phone)
        .bind(&new.founder_email)
        .bind(new.user_id)
        .bind(ItemStatus::Found.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = res.last_insert_rowid();
        self.get_found(id).await?.ok_or(EngineError::ItemNotFound {
            kind: ItemKind::Found,
            id,
        })
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn get_lost(&self, id: i64) -> Result<Option<LostItem>> {
        let item = sqlx::query_as("SELECT * FROM lost_items WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    pub async fn get_found(&self, id: i64) -> Result<Option<FoundItem>> {
        let item = sqlx::query_as("SELECT * FROM found_items WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    /// List lost items, most recently reported first, optionally restricted
    /// to one status.
    pub async fn list_lost(&self, status: Option<ItemStatus>, limit: i64) -> Result<Vec<LostItem>> {
        let items = sqlx::query_as(
            r#"
            SELECT * FROM lost_items
            WHERE (?1 IS NULL OR status = ?1)
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    pub async fn list_found(
        &self,
        status: Option<ItemStatus>,
        limit: i64,
    ) -> Result<Vec<FoundItem>> {
        let items = sqlx::query_as(
            r#"
            SELECT * FROM found_items
            WHERE (?1 IS NULL OR status = ?1)
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Case-sensitive substring search over title/category/color.
    pub async fn search_lost(&self, filter: &ItemSearch) -> Result<Vec<LostItem>> {
        let items = sqlx::query_as(
            r#"
            SELECT * FROM lost_items
            WHERE (?1 IS NULL OR title LIKE '%' || ?1 || '%')
              AND (?2 IS NULL OR category LIKE '%' || ?2 || '%')
              AND (?3 IS NULL OR color LIKE '%' || ?3 || '%')
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(&filter.name)
        .bind(&filter.category)
        .bind(&filter.color)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    pub async fn search_found(&self, filter: &ItemSearch) -> Result<Vec<FoundItem>> {
        let items = sqlx::query_as(
            r#"
            SELECT * FROM found_items
            WHERE (?1 IS NULL OR name LIKE '%' || ?1 || '%')
              AND (?2 IS NULL OR category LIKE '%' || ?2 || '%')
              AND (?3 IS NULL OR color LIKE '%' || ?3 || '%')
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(&filter.name)
        .bind(&filter.category)
        .bind(&filter.color)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Exact serial-number lookup, most recent first. The matcher passes the
    /// counterpart's initial status; passing `None` searches every status.
    pub async fn find_lost_by_serial(
        &self,
        serial: &str,
        status: Option<ItemStatus>,
    ) -> Result<Vec<LostItem>> {
        let items = sqlx::query_as(
            r#"
            SELECT * FROM lost_items
            WHERE serial_number = ?1 AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(serial)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    pub async fn find_found_by_serial(
        &self,
        serial: &str,
        status: Option<ItemStatus>,
    ) -> Result<Vec<FoundItem>> {
        let items = sqlx::query_as(
            r#"
            SELECT * FROM found_items
            WHERE serial_number = ?1 AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(serial)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Distinct categories across both item tables, sorted.
    pub async fn categories(&self) -> Result<Vec<String>> {
        let categories = sqlx::query_scalar(
            r#"
            SELECT category FROM lost_items
            UNION
            SELECT category FROM found_items
            ORDER BY category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    // ========================================================================
    // Updates
    // ========================================================================

    /// Patch an item's contact fields. Snapshots on existing matches are
    /// unaffected.
    pub async fn update_contact(
        &self,
        kind: ItemKind,
        id: i64,
        update: &ContactUpdate,
    ) -> Result<()> {
        let sql = match kind {
            ItemKind::Lost => {
                r#"
                UPDATE lost_items
                SET first_name   = COALESCE(?1, first_name),
                    last_name    = COALESCE(?2, last_name),
                    loster_phone = COALESCE(?3, loster_phone),
                    loster_email = COALESCE(?4, loster_email),
                    updated_at   = ?5
                WHERE id = ?6
                "#
            }
            ItemKind::Found => {
                r#"
                UPDATE found_items
                SET first_name    = COALESCE(?1, first_name),
                    last_name     = COALESCE(?2, last_name),
                    founder_phone = COALESCE(?3, founder_phone),
                    founder_email = COALESCE(?4, founder_email),
                    updated_at    = ?5
                WHERE id = ?6
                "#
            }
        };

        let rows = sqlx::query(sql)
            .bind(&update.first_name)
            .bind(&update.last_name)
            .bind(&update.phone)
            .bind(&update.email)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(EngineError::ItemNotFound { kind, id });
        }
        Ok(())
    }

    /// Direct status edit with the transition guard.
    ///
    /// On success, when the new status is `claimed`, all other items sharing
    /// this item's serial number are cascaded to `claimed` as a side effect.
    pub async fn set_status(&self, kind: ItemKind, id: i64, next: ItemStatus) -> Result<()> {
        let (current, serial) = match kind {
            ItemKind::Lost => {
                let item = self
                    .get_lost(id)
                    .await?
                    .ok_or(EngineError::ItemNotFound { kind, id })?;
                (item.status, item.serial_number)
            }
            ItemKind::Found => {
                let item = self
                    .get_found(id)
                    .await?
                    .ok_or(EngineError::ItemNotFound { kind, id })?;
                (item.status, item.serial_number)
            }
        };

        if !current.can_transition_to(next) {
            return Err(EngineError::InvalidTransition {
                from: current,
                to: next,
            });
        }

        let sql = match kind {
            ItemKind::Lost => "UPDATE lost_items SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
            ItemKind::Found => "UPDATE found_items SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        };
        let rows = sqlx::query(sql)
            .bind(next.as_str())
            .bind(Utc::now())
            .bind(id)
            .bind(current.as_str())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            // Lost the race: the item reached its terminal status between the
            // read and the write.
            return Err(EngineError::InvalidTransition {
                from: ItemStatus::Claimed,
                to: next,
            });
        }

        if next == ItemStatus::Claimed {
            if let Some(serial) = serial.filter(|s| !s.is_empty()) {
                self.cascade_claim_serial(&serial).await?;
            }
        }

        Ok(())
    }

    /// Bulk-claim every item still in its initial status that shares a serial
    /// number. Two independent UPDATEs, no transaction: this mirrors the
    /// loose cascade on direct edits, not the claim workflow's atomic unit.
    async fn cascade_claim_serial(&self, serial: &str) -> Result<u64> {
        let now = Utc::now();
        let lost = sqlx::query(
            "UPDATE lost_items SET status = 'claimed', updated_at = ? WHERE serial_number = ? AND status = 'lost'",
        )
        .bind(now)
        .bind(serial)
        .execute(&self.pool)
        .await?
        .rows_affected();

        let found = sqlx::query(
            "UPDATE found_items SET status = 'claimed', updated_at = ? WHERE serial_number = ? AND status = 'found'",
        )
        .bind(now)
        .bind(serial)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if lost + found > 0 {
            info!(serial, lost, found, "cascaded claim to same-serial items");
        }
        Ok(lost + found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn setup_store() -> ItemStore {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        db::init_schema(&pool).await.unwrap();
        ItemStore::new(pool)
    }

    fn lost(serial: &str) -> NewLostItem {
        NewLostItem {
            title: "Black Phone".to_string(),
            category: "Phone".to_string(),
            serial_number: Some(serial.to_string()),
            ..Default::default()
        }
    }

    fn found(serial: &str) -> NewFoundItem {
        NewFoundItem {
            name: "iPhone".to_string(),
            category: "Phone".to_string(),
            serial_number: Some(serial.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_sets_initial_status() {
        let store = setup_store().await;
        let item = store.create_lost(lost("SN1")).await.unwrap();
        assert_eq!(item.status, ItemStatus::Lost);

        let item = store.create_found(found("SN1")).await.unwrap();
        assert_eq!(item.status, ItemStatus::Found);
    }

    #[tokio::test]
    async fn test_set_status_allows_claim_edge() {
        let store = setup_store().await;
        let item = store.create_lost(lost("SN1")).await.unwrap();

        store
            .set_status(ItemKind::Lost, item.id, ItemStatus::Claimed)
            .await
            .unwrap();
        let item = store.get_lost(item.id).await.unwrap().unwrap();
        assert_eq!(item.status, ItemStatus::Claimed);
    }

    #[tokio::test]
    async fn test_set_status_rejects_reopen() {
        let store = setup_store().await;
        let item = store.create_lost(lost("SN1")).await.unwrap();
        store
            .set_status(ItemKind::Lost, item.id, ItemStatus::Claimed)
            .await
            .unwrap();

        let err = store
            .set_status(ItemKind::Lost, item.id, ItemStatus::Lost)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));

        // Unchanged
        let item = store.get_lost(item.id).await.unwrap().unwrap();
        assert_eq!(item.status, ItemStatus::Claimed);
    }

    #[tokio::test]
    async fn test_set_status_rejects_sideways_edge() {
        let store = setup_store().await;
        let item = store.create_found(found("SN1")).await.unwrap();

        let err = store
            .set_status(ItemKind::Found, item.id, ItemStatus::Lost)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_set_status_missing_item() {
        let store = setup_store().await;
        let err = store
            .set_status(ItemKind::Lost, 42, ItemStatus::Claimed)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::ItemNotFound {
                kind: ItemKind::Lost,
                id: 42
            }
        ));
    }

    #[tokio::test]
    async fn test_claim_edit_cascades_to_same_serial() {
        let store = setup_store().await;
        let a = store.create_lost(lost("SN1")).await.unwrap();
        let b = store.create_lost(lost("SN1")).await.unwrap();
        let c = store.create_found(found("SN1")).await.unwrap();
        let other = store.create_found(found("SN2")).await.unwrap();

        store
            .set_status(ItemKind::Lost, a.id, ItemStatus::Claimed)
            .await
            .unwrap();

        let b = store.get_lost(b.id).await.unwrap().unwrap();
        let c = store.get_found(c.id).await.unwrap().unwrap();
        let other = store.get_found(other.id).await.unwrap().unwrap();
        assert_eq!(b.status, ItemStatus::Claimed);
        assert_eq!(c.status, ItemStatus::Claimed);
        assert_eq!(other.status, ItemStatus::Found);
    }

    #[tokio::test]
    async fn test_serial_lookup_is_byte_exact() {
        let store = setup_store().await;
        store.create_lost(lost("SN1")).await.unwrap();
        store.create_lost(lost("sn1")).await.unwrap();
        store.create_lost(lost(" SN1")).await.unwrap();

        let hits = store
            .find_lost_by_serial("SN1", Some(ItemStatus::Lost))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].serial_number.as_deref(), Some("SN1"));
    }

    #[tokio::test]
    async fn test_update_contact_patches_only_given_fields() {
        let store = setup_store().await;
        let mut new = lost("SN1");
        new.first_name = Some("John".to_string());
        new.loster_email = Some("john@example.com".to_string());
        let item = store.create_lost(new).await.unwrap();

        store
            .update_contact(
                ItemKind::Lost,
                item.id,
                &ContactUpdate {
                    email: Some("john.doe@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let item = store.get_lost(item.id).await.unwrap().unwrap();
        assert_eq!(item.first_name.as_deref(), Some("John"));
        assert_eq!(item.loster_email.as_deref(), Some("john.doe@example.com"));
    }

    #[tokio::test]
    async fn test_categories_are_distinct_and_sorted() {
        let store = setup_store().await;
        store.create_lost(lost("SN1")).await.unwrap();
        let mut wallet = found("SN2");
        wallet.category = "Wallet".to_string();
        store.create_found(wallet).await.unwrap();
        store.create_found(found("SN3")).await.unwrap();

        let categories = store.categories().await.unwrap();
        assert_eq!(categories, vec!["Phone".to_string(), "Wallet".to_string()]);
    }
}
