//! Engine facade: wires the stores, matcher, and claim coordinator onto one
//! pool and exposes the operation surface the outer request layer calls.

use std::sync::Arc;

use reclaim_protocol::{ItemKind, ItemStatus};
use sqlx::sqlite::SqlitePool;
use tracing::warn;

use crate::claim::ClaimCoordinator;
use crate::db::models::{FoundItem, LostItem, MatchRecord, NewFoundItem, NewLostItem};
use crate::db::{self, ContactUpdate, ItemStore, MatchStore, ReturnStore};
use crate::error::Result;
use crate::matcher::Matcher;
use crate::notify::Notifier;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://reclaim.db";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub database_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

pub struct Engine {
    items: ItemStore,
    matches: MatchStore,
    returns: ReturnStore,
    matcher: Matcher,
    coordinator: ClaimCoordinator,
}

impl Engine {
    /// Open (creating if missing) the database behind `config` and wire the
    /// engine onto it.
    pub async fn connect(config: &EngineConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let pool = db::connect(&config.database_url).await?;
        db::init_schema(&pool).await?;
        Ok(Self::with_pool(pool, notifier))
    }

    pub fn with_pool(pool: SqlitePool, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            items: ItemStore::new(pool.clone()),
            matches: MatchStore::new(pool.clone()),
            returns: ReturnStore::new(pool.clone()),
            matcher: Matcher::new(pool.clone(), notifier.clone()),
            coordinator: ClaimCoordinator::new(pool, notifier),
        }
    }

    pub fn items(&self) -> &ItemStore {
        &self.items
    }

    pub fn matches(&self) -> &MatchStore {
        &self.matches
    }

    pub fn returns(&self) -> &ReturnStore {
        &self.returns
    }

    /// Persist a lost-item report, then scan for counterparts.
    ///
    /// The scan is strictly best-effort relative to the report itself: a
    /// matching failure is logged and the created item is still returned.
    pub async fn report_lost(&self, new: NewLostItem) -> Result<LostItem> {
        let item = self.items.create_lost(new).await?;
        if let Err(err) = self.matcher.on_lost_item_created(&item).await {
            warn!(item_id = item.id, "serial scan failed after lost report: {err}");
        }
        Ok(item)
    }

    /// Persist a found-item report, then scan for counterparts.
    pub async fn report_found(&self, new: NewFoundItem) -> Result<FoundItem> {
        let item = self.items.create_found(new).await?;
        if let Err(err) = self.matcher.on_found_item_created(&item).await {
            warn!(item_id = item.id, "serial scan failed after found report: {err}");
        }
        Ok(item)
    }

    /// Finalize a match. See [`ClaimCoordinator::claim`].
    pub async fn claim(
        &self,
        match_id: i64,
        acting_user: i64,
        notes: Option<String>,
    ) -> Result<MatchRecord> {
        self.coordinator.claim(match_id, acting_user, notes).await
    }

    /// Direct status edit, guarded; claiming cascades to same-serial items.
    pub async fn set_item_status(&self, kind: ItemKind, id: i64, status: ItemStatus) -> Result<()> {
        self.items.set_status(kind, id, status).await
    }

    /// Patch an item's contact fields.
    pub async fn update_contact(
        &self,
        kind: ItemKind,
        id: i64,
        update: &ContactUpdate,
    ) -> Result<()> {
        self.items.update_contact(kind, id, update).await
    }
}
