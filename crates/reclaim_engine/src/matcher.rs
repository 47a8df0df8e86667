//! Serial-number matcher.
//!
//! Runs once per newly persisted item that carries a non-empty serial
//! number. Matching is directional: a new found item scans open lost items,
//! a new lost item scans open found items. Items whose serial number is
//! edited later are never rescanned; only the creation path triggers here.

use std::sync::Arc;

use reclaim_protocol::ItemStatus;
use sqlx::sqlite::SqlitePool;
use tracing::{debug, info};

use crate::db::models::{FoundItem, LostItem, MatchRecord, NewMatch};
use crate::db::{ItemStore, MatchStore};
use crate::error::Result;
use crate::notify::{self, subject, Notifier};

pub struct Matcher {
    items: ItemStore,
    matches: MatchStore,
    notifier: Arc<dyn Notifier>,
}

impl Matcher {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            items: ItemStore::new(pool.clone()),
            matches: MatchStore::new(pool),
            notifier,
        }
    }

    /// Scan open found items for counterparts of a freshly created lost
    /// report. Returns the matches created by this scan; pairs that were
    /// already matched are skipped silently.
    pub async fn on_lost_item_created(&self, item: &LostItem) -> Result<Vec<MatchRecord>> {
        let Some(serial) = eligible_serial(item.serial_number.as_deref()) else {
            return Ok(Vec::new());
        };

        let counterparts = self
            .items
            .find_found_by_serial(serial, Some(ItemStatus::Found))
            .await?;

        let mut created = Vec::new();
        for found in counterparts {
            let snapshot = NewMatch::snapshot(item, &found, serial);
            match self.matches.insert_if_absent(&snapshot).await? {
                Some(record) => {
                    info!(
                        match_id = record.id,
                        lost_item_id = item.id,
                        found_item_id = found.id,
                        serial,
                        "matched lost report against existing found item"
                    );
                    self.notify_lost_triggered(&record).await;
                    created.push(record);
                }
                None => {
                    debug!(
                        lost_item_id = item.id,
                        found_item_id = found.id,
                        "pair already matched, skipping"
                    );
                }
            }
        }
        Ok(created)
    }

    /// Scan open lost items for counterparts of a freshly created found
    /// report.
    pub async fn on_found_item_created(&self, item: &FoundItem) -> Result<Vec<MatchRecord>> {
        let Some(serial) = eligible_serial(item.serial_number.as_deref()) else {
            return Ok(Vec::new());
        };

        let counterparts = self
            .items
            .find_lost_by_serial(serial, Some(ItemStatus::Lost))
            .await?;

        let mut created = Vec::new();
        for lost in counterparts {
            let snapshot = NewMatch::snapshot(&lost, item, serial);
            match self.matches.insert_if_absent(&snapshot).await? {
                Some(record) => {
                    info!(
                        match_id = record.id,
                        lost_item_id = lost.id,
                        found_item_id = item.id,
                        serial,
                        "matched found report against existing lost item"
                    );
                    self.notify_found_triggered(&record).await;
                    created.push(record);
                }
                None => {
                    debug!(
                        lost_item_id = lost.id,
                        found_item_id = item.id,
                        "pair already matched, skipping"
                    );
                }
            }
        }
        Ok(created)
    }

    async fn notify_found_triggered(&self, record: &MatchRecord) {
        notify::dispatch(
            self.notifier.as_ref(),
            record.loster_email.as_deref(),
            subject::LOST_ITEM_MAYBE_FOUND,
            notify::found_report_to_loster_body(record),
        )
        .await;
        notify::dispatch(
            self.notifier.as_ref(),
            record.founder_email.as_deref(),
            subject::FOUND_REPORT_MAY_HELP,
            notify::found_report_to_founder_body(record),
        )
        .await;
    }

    async fn notify_lost_triggered(&self, record: &MatchRecord) {
        notify::dispatch(
            self.notifier.as_ref(),
            record.loster_email.as_deref(),
            subject::MATCH_FOR_LOST_REPORT,
            notify::lost_report_to_loster_body(record),
        )
        .await;
        notify::dispatch(
            self.notifier.as_ref(),
            record.founder_email.as_deref(),
            subject::OWNER_LOCATED,
            notify::lost_report_to_founder_body(record),
        )
        .await;
    }
}

/// The trigger contract only fires for non-empty serial numbers; the bytes
/// themselves are taken as stored, with no normalization.
fn eligible_serial(serial: Option<&str>) -> Option<&str> {
    serial.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::models::{NewFoundItem, NewLostItem};
    use crate::notify::MemoryNotifier;
    use reclaim_protocol::MatchStatus;

    struct Fixture {
        pool: SqlitePool,
        items: ItemStore,
        matcher: Matcher,
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
            matcher: Matcher::new(pool, notifier.clone()),
            notifier,
        }
    }

    fn lost_report(serial: &str, email: &str) -> NewLostItem {
        NewLostItem {
            title: "Lost Phone".to_string(),
            category: "Phone".to_string(),
            serial_number: Some(serial.to_string()),
            first_name: Some("John".to_string()),
            loster_email: Some(email.to_string()),
            ..Default::default()
        }
    }

    fn found_report(serial: &str, email: &str) -> NewFoundItem {
        NewFoundItem {
            name: "iPhone".to_string(),
            category: "Phone".to_string(),
            serial_number: Some(serial.to_string()),
            founder_email: Some(email.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_found_report_matches_open_lost_item() {
        let fx = setup().await;
        fx.items
            .create_lost(lost_report("SN123", "a@x.com"))
            .await
            .unwrap();
        let found = fx
            .items
            .create_found(found_report("SN123", "b@x.com"))
            .await
            .unwrap();

        let created = fx.matcher.on_found_item_created(&found).await.unwrap();
        assert_eq!(created.len(), 1);
        let record = &created[0];
        assert_eq!(record.match_status, MatchStatus::Unclaimed);
        assert_eq!(record.loster_email.as_deref(), Some("a@x.com"));
        assert_eq!(record.founder_email.as_deref(), Some("b@x.com"));
        assert_eq!(record.device_name, "iPhone");
        assert_eq!(record.serial_number, "SN123");

        let subjects: Vec<_> = fx
            .notifier
            .messages()
            .iter()
            .map(|m| m.subject.clone())
            .collect();
        assert!(subjects.contains(&subject::LOST_ITEM_MAYBE_FOUND.to_string()));
        assert!(subjects.contains(&subject::FOUND_REPORT_MAY_HELP.to_string()));
        assert_eq!(subjects.len(), 2);
    }

    #[tokio::test]
    async fn test_lost_report_matches_open_found_item() {
        let fx = setup().await;
        fx.items
            .create_found(found_report("SN999", "finder@x.com"))
            .await
            .unwrap();
        let lost = fx
            .items
            .create_lost(lost_report("SN999", "alice@x.com"))
            .await
            .unwrap();

        let created = fx.matcher.on_lost_item_created(&lost).await.unwrap();
        assert_eq!(created.len(), 1);

        let subjects: Vec<_> = fx
            .notifier
            .messages()
            .iter()
            .map(|m| m.subject.clone())
            .collect();
        assert!(subjects.contains(&subject::MATCH_FOR_LOST_REPORT.to_string()));
        assert!(subjects.contains(&subject::OWNER_LOCATED.to_string()));
    }

    #[tokio::test]
    async fn test_two_found_reports_yield_two_matches() {
        let fx = setup().await;
        let lost = fx
            .items
            .create_lost(lost_report("SN1", "a@x.com"))
            .await
            .unwrap();

        let found_a = fx
            .items
            .create_found(found_report("SN1", "b@x.com"))
            .await
            .unwrap();
        fx.matcher.on_found_item_created(&found_a).await.unwrap();

        let found_b = fx
            .items
            .create_found(found_report("SN1", "c@x.com"))
            .await
            .unwrap();
        let created = fx.matcher.on_found_item_created(&found_b).await.unwrap();

        assert_eq!(created.len(), 1);
        assert_eq!(created[0].lost_item_id, lost.id);
        assert_eq!(created[0].found_item_id, found_b.id);

        let matches = MatchStore::new(fx.pool.clone());
        let all = matches.list(10).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_rescan_is_idempotent() {
        let fx = setup().await;
        fx.items
            .create_lost(lost_report("SN1", "a@x.com"))
            .await
            .unwrap();
        let found = fx
            .items
            .create_found(found_report("SN1", "b@x.com"))
            .await
            .unwrap();

        let first = fx.matcher.on_found_item_created(&found).await.unwrap();
        assert_eq!(first.len(), 1);
        let second = fx.matcher.on_found_item_created(&found).await.unwrap();
        assert!(second.is_empty());

        // No duplicate match, no duplicate notifications
        assert_eq!(fx.notifier.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_or_empty_serial_never_scans() {
        let fx = setup().await;
        fx.items
            .create_lost(lost_report("SN1", "a@x.com"))
            .await
            .unwrap();

        let mut no_serial = found_report("SN1", "b@x.com");
        no_serial.serial_number = None;
        let found = fx.items.create_found(no_serial).await.unwrap();
        assert!(fx
            .matcher
            .on_found_item_created(&found)
            .await
            .unwrap()
            .is_empty());

        let mut empty_serial = found_report("SN1", "b@x.com");
        empty_serial.serial_number = Some(String::new());
        let found = fx.items.create_found(empty_serial).await.unwrap();
        assert!(fx
            .matcher
            .on_found_item_created(&found)
            .await
            .unwrap()
            .is_empty());

        assert!(fx.notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_serial_comparison_is_byte_exact() {
        let fx = setup().await;
        fx.items
            .create_lost(lost_report("SN123", "a@x.com"))
            .await
            .unwrap();
        let found = fx
            .items
            .create_found(found_report("sn123", "b@x.com"))
            .await
            .unwrap();

        assert!(fx
            .matcher
            .on_found_item_created(&found)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_claimed_counterparts_are_ineligible() {
        let fx = setup().await;
        let lost = fx
            .items
            .create_lost(lost_report("SN1", "a@x.com"))
            .await
            .unwrap();
        fx.items
            .set_status(reclaim_protocol::ItemKind::Lost, lost.id, ItemStatus::Claimed)
            .await
            .unwrap();

        let found = fx
            .items
            .create_found(found_report("SN1", "b@x.com"))
            .await
            .unwrap();
        assert!(fx
            .matcher
            .on_found_item_created(&found)
            .await
            .unwrap()
            .is_empty());
    }
}
