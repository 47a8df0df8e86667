//! Database models for the workflow engine.
//!
//! Row structs parse their status columns at the boundary so the rest of
//! the crate only ever sees the canonical enums.

use chrono::{DateTime, Utc};
use reclaim_protocol::{display_name, ItemStatus, MatchStatus};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use std::str::FromStr;

fn parse_column<T>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: e.into(),
    })
}

// ============================================================================
// Items
// ============================================================================

/// A lost-item report. Reporter identity is optional: reports may be
/// anonymous, in which case `user_id` and the contact fields are all absent.
#[derive(Debug, Clone, Serialize)]
pub struct LostItem {
    pub id: i64,
    pub title: String,
    pub category: String,
    pub description: Option<String>,
    pub color: Option<String>,
    /// Exact-match key; compared byte-for-byte, no normalization.
    pub serial_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub loster_phone: Option<String>,
    pub loster_email: Option<String>,
    pub user_id: Option<i64>,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LostItem {
    pub fn reporter_name(&self) -> Option<String> {
        display_name(self.first_name.as_deref(), self.last_name.as_deref())
    }
}

impl<'r> FromRow<'r, SqliteRow> for LostItem {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            category: row.try_get("category")?,
            description: row.try_get("description")?,
            color: row.try_get("color")?,
            serial_number: row.try_get("serial_number")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            loster_phone: row.try_get("loster_phone")?,
            loster_email: row.try_get("loster_email")?,
            user_id: row.try_get("user_id")?,
            status: parse_column(row, "status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// A found-item report, the finder-side mirror of [`LostItem`].
#[derive(Debug, Clone, Serialize)]
pub struct FoundItem {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub serial_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub founder_phone: Option<String>,
    pub founder_email: Option<String>,
    pub user_id: Option<i64>,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FoundItem {
    pub fn finder_name(&self) -> Option<String> {
        display_name(self.first_name.as_deref(), self.last_name.as_deref())
    }
}

impl<'r> FromRow<'r, SqliteRow> for FoundItem {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            category: row.try_get("category")?,
            description: row.try_get("description")?,
            color: row.try_get("color")?,
            serial_number: row.try_get("serial_number")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            founder_phone: row.try_get("founder_phone")?,
            founder_email: row.try_get("founder_email")?,
            user_id: row.try_get("user_id")?,
            status: parse_column(row, "status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Input for a new lost-item report.
#[derive(Debug, Clone, Default)]
pub struct NewLostItem {
    pub title: String,
    pub category: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub serial_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub loster_phone: Option<String>,
    pub loster_email: Option<String>,
    pub user_id: Option<i64>,
}

/// Input for a new found-item report.
#[derive(Debug, Clone, Default)]
pub struct NewFoundItem {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub serial_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub founder_phone: Option<String>,
    pub founder_email: Option<String>,
    pub user_id: Option<i64>,
}

// ============================================================================
// Matches
// ============================================================================

/// A correspondence between one lost item and one found item.
///
/// The `loster_*`/`founder_*`/`device_name`/`serial_number` columns are a
/// snapshot taken when the match was created; later edits to either item
/// never touch them.
#[derive(Debug, Clone, Serialize)]
pub struct MatchRecord {
    pub id: i64,
    pub lost_item_id: i64,
    pub found_item_id: i64,
    pub match_status: MatchStatus,
    pub match_date: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub loster_name: Option<String>,
    pub loster_phone: Option<String>,
    pub loster_email: Option<String>,
    pub founder_name: Option<String>,
    pub founder_phone: Option<String>,
    pub founder_email: Option<String>,
    pub device_name: String,
    pub serial_number: String,
}

impl<'r> FromRow<'r, SqliteRow> for MatchRecord {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            lost_item_id: row.try_get("lost_item_id")?,
            found_item_id: row.try_get("found_item_id")?,
            match_status: parse_column(row, "match_status")?,
            match_date: row.try_get("match_date")?,
            claimed_at: row.try_get("claimed_at")?,
            loster_name: row.try_get("loster_name")?,
            loster_phone: row.try_get("loster_phone")?,
            loster_email: row.try_get("loster_email")?,
            founder_name: row.try_get("founder_name")?,
            founder_phone: row.try_get("founder_phone")?,
            founder_email: row.try_get("founder_email")?,
            device_name: row.try_get("device_name")?,
            serial_number: row.try_get("serial_number")?,
        })
    }
}

/// Snapshot input for a new match, resolved from both items at creation time.
#[derive(Debug, Clone)]
pub struct NewMatch {
    pub lost_item_id: i64,
    pub found_item_id: i64,
    pub loster_name: Option<String>,
    pub loster_phone: Option<String>,
    pub loster_email: Option<String>,
    pub founder_name: Option<String>,
    pub founder_phone: Option<String>,
    pub founder_email: Option<String>,
    pub device_name: String,
    pub serial_number: String,
}

impl NewMatch {
    /// Resolve the point-in-time snapshot for a (lost, found) pair.
    ///
    /// `serial` is the triggering item's serial number; both sides carry the
    /// same bytes by construction.
    pub fn snapshot(lost: &LostItem, found: &FoundItem, serial: &str) -> Self {
        let device_name = if found.name.trim().is_empty() {
            lost.title.clone()
        } else {
            found.name.clone()
        };

        Self {
            lost_item_id: lost.id,
            found_item_id: found.id,
            loster_name: lost.reporter_name(),
            loster_phone: lost.loster_phone.clone(),
            loster_email: lost.loster_email.clone(),
            founder_name: found.finder_name(),
            founder_phone: found.founder_phone.clone(),
            founder_email: found.founder_email.clone(),
            device_name,
            serial_number: serial.to_string(),
        }
    }
}

// ============================================================================
// Returns
// ============================================================================

/// The audit record of a finalized handover. Written once by the claim
/// transaction and never updated afterward.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReturnRecord {
    pub id: i64,
    pub lost_item_id: i64,
    pub found_item_id: i64,
    pub owner_user_id: Option<i64>,
    pub finder_user_id: Option<i64>,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
    pub finder_name: Option<String>,
    pub finder_email: Option<String>,
    pub confirmation: bool,
    pub claimed_by: i64,
    pub notes: Option<String>,
    pub claimed_at: DateTime<Utc>,
}
