//! Canonical enums used across all crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Item lifecycle status.
/// This is the CANONICAL definition - use this everywhere.
///
/// Lost items start at `lost`, found items start at `found`; both move to
/// `claimed` exactly once and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// A lost-item report, still open
    Lost,
    /// A found-item report, still open
    Found,
    /// Terminal: the item went through a finalized handover
    Claimed,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Lost => "lost",
            ItemStatus::Found => "found",
            ItemStatus::Claimed => "claimed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Claimed)
    }

    /// Allowed edges: `lost -> claimed` and `found -> claimed`. Everything
    /// else (including self-transitions) is rejected.
    pub fn can_transition_to(&self, next: ItemStatus) -> bool {
        matches!(
            (self, next),
            (ItemStatus::Lost, ItemStatus::Claimed) | (ItemStatus::Found, ItemStatus::Claimed)
        )
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lost" => Ok(ItemStatus::Lost),
            "found" => Ok(ItemStatus::Found),
            "claimed" => Ok(ItemStatus::Claimed),
            _ => Err(format!(
                "Invalid item status: '{}'. Expected: lost, found, or claimed",
                s
            )),
        }
    }
}

/// Match lifecycle status.
/// This is the CANONICAL definition - use this everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Match exists but the handover has not been finalized
    #[default]
    Unclaimed,
    /// Terminal: the handover was finalized and a Return recorded
    Claimed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Unclaimed => "unclaimed",
            MatchStatus::Claimed => "claimed",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unclaimed" => Ok(MatchStatus::Unclaimed),
            "claimed" => Ok(MatchStatus::Claimed),
            _ => Err(format!(
                "Invalid match status: '{}'. Expected: unclaimed or claimed",
                s
            )),
        }
    }
}

/// Which side of the tracker an item record lives on.
///
/// Matching is directional: a new item of one kind is scanned against open
/// counterparts of the other kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Lost,
    Found,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Lost => "lost",
            ItemKind::Found => "found",
        }
    }

    /// The status a freshly reported item of this kind starts at.
    pub fn initial_status(&self) -> ItemStatus {
        match self {
            ItemKind::Lost => ItemStatus::Lost,
            ItemKind::Found => ItemStatus::Found,
        }
    }

    /// The opposite-kind record eligible for matching.
    pub fn counterpart(&self) -> ItemKind {
        match self {
            ItemKind::Lost => ItemKind::Found,
            ItemKind::Found => ItemKind::Lost,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lost" => Ok(ItemKind::Lost),
            "found" => Ok(ItemKind::Found),
            _ => Err(format!("Invalid item kind: '{}'. Expected: lost or found", s)),
        }
    }
}
