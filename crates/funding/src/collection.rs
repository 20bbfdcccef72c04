//! Sticker collection bookkeeping.
//!
//! Which sticker a pack opening produces is decided remotely. This module only
//! tracks what the member already holds: reveal outcome, duplicates, rarity
//! tallies and the sticker shown on the collection card.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decode::lenient_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub const ALL: [Rarity; 5] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
    ];
}

impl std::fmt::Display for Rarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Common => write!(f, "common"),
            Self::Uncommon => write!(f, "uncommon"),
            Self::Rare => write!(f, "rare"),
            Self::Epic => write!(f, "epic"),
            Self::Legendary => write!(f, "legendary"),
        }
    }
}

/// A `stickers` catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sticker {
    pub id: String,
    pub name: String,
    pub rarity: Rarity,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub collection_id: Option<String>,
}

/// A `user_stickers` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSticker {
    pub sticker_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub obtained_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

fn default_quantity() -> u32 {
    1
}

// ---------------------------------------------------------------------------
// Reveal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RevealOutcome {
    New,
    /// `copies` already held before this reveal.
    Duplicate { copies: u32 },
}

/// Classify a scratch-card reveal against what the member already holds.
pub fn reveal_outcome(owned: &[UserSticker], sticker_id: &str) -> RevealOutcome {
    match copies_held(owned).get(sticker_id) {
        Some(&copies) if copies > 0 => RevealOutcome::Duplicate { copies },
        _ => RevealOutcome::New,
    }
}

/// Copies per sticker id. A row always stands for at least one copy.
fn copies_held(owned: &[UserSticker]) -> BTreeMap<&str, u32> {
    let mut copies: BTreeMap<&str, u32> = BTreeMap::new();
    for row in owned {
        *copies.entry(row.sticker_id.as_str()).or_insert(0) += row.quantity.max(1);
    }
    copies
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RarityTally {
    pub rarity: Rarity,
    pub owned: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionSummary {
    /// Active catalog stickers.
    pub total_stickers: usize,
    /// Distinct active stickers held.
    pub unique_owned: usize,
    /// Copies beyond the first, across everything held.
    pub duplicate_copies: u32,
    /// Floor of unique_owned / total_stickers, 0 for an empty catalog.
    pub completion_percent: u32,
    pub by_rarity: Vec<RarityTally>,
}

impl CollectionSummary {
    pub fn build(catalog: &[Sticker], owned: &[UserSticker]) -> Self {
        let copies = copies_held(owned);

        let mut by_rarity: BTreeMap<Rarity, (usize, usize)> =
            Rarity::ALL.iter().map(|r| (*r, (0, 0))).collect();
        let mut total_stickers = 0;
        let mut unique_owned = 0;

        for sticker in catalog.iter().filter(|s| s.is_active) {
            total_stickers += 1;
            let tally = by_rarity.entry(sticker.rarity).or_insert((0, 0));
            tally.1 += 1;
            if copies.contains_key(sticker.id.as_str()) {
                unique_owned += 1;
                tally.0 += 1;
            }
        }

        let duplicate_copies = copies.values().map(|c| c.saturating_sub(1)).sum();
        let completion_percent = if total_stickers == 0 {
            0
        } else {
            (unique_owned * 100 / total_stickers) as u32
        };

        Self {
            total_stickers,
            unique_owned,
            duplicate_copies,
            completion_percent,
            by_rarity: by_rarity
                .into_iter()
                .map(|(rarity, (owned, total))| RarityTally { rarity, owned, total })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Display sticker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayStrategy {
    Preview,
    AnyActive,
}

/// Lookup order for the collection card image.
pub const DISPLAY_STRATEGIES: [DisplayStrategy; 2] =
    [DisplayStrategy::Preview, DisplayStrategy::AnyActive];

/// The configured preview sticker if it is active, else the first active
/// sticker by rarity then name, else nothing.
pub fn display_sticker<'a>(preview_id: Option<&str>, catalog: &'a [Sticker]) -> Option<&'a Sticker> {
    DISPLAY_STRATEGIES.iter().find_map(|strategy| match strategy {
        DisplayStrategy::Preview => {
            let id = preview_id?;
            catalog.iter().find(|s| s.is_active && s.id == id)
        }
        DisplayStrategy::AnyActive => catalog
            .iter()
            .filter(|s| s.is_active)
            .min_by(|a, b| (a.rarity, &a.name, &a.id).cmp(&(b.rarity, &b.name, &b.id))),
    })
}
