use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::ContentSource;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    #[serde(rename = "monthly")]
    Monthly,
    #[serde(rename = "one-time")]
    OneTime,
}

impl Frequency {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "monthly" => Some(Self::Monthly),
            "one-time" => Some(Self::OneTime),
            _ => None,
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Monthly => write!(f, "monthly"),
            Self::OneTime => write!(f, "one-time"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SponsorshipStatus {
    Active,
    Cancelled,
    Pending,
    Completed,
    Paused,
}

impl SponsorshipStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "cancelled" => Some(Self::Cancelled),
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "paused" => Some(Self::Paused),
            _ => None,
        }
    }
}

impl std::fmt::Display for SponsorshipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Paused => write!(f, "paused"),
        }
    }
}

/// `live` is real money, `test` is the payment sandbox. Never summed together.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    #[default]
    Live,
    Test,
}

impl PaymentMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "live" => Some(Self::Live),
            "test" => Some(Self::Test),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// Who is looking at funding numbers. Members only ever see `live` totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewerRole {
    #[default]
    Member,
    Admin,
}

impl ViewerRole {
    pub fn can_see(&self, mode: PaymentMode) -> bool {
        match self {
            Self::Admin => true,
            Self::Member => mode == PaymentMode::Live,
        }
    }
}

// ---------------------------------------------------------------------------
// Beneficiary key
// ---------------------------------------------------------------------------

/// Identifies who is being supported. The roster path is preferred when a
/// record carries both references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum BeneficiaryKey {
    /// `sponsor_bestie_id`: a roster entry, possibly without an account.
    Roster(String),
    /// `bestie_id`: a platform profile.
    Profile(String),
}

impl BeneficiaryKey {
    pub fn id(&self) -> &str {
        match self {
            Self::Roster(id) | Self::Profile(id) => id,
        }
    }
}

impl std::fmt::Display for BeneficiaryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Roster(id) => write!(f, "roster:{id}"),
            Self::Profile(id) => write!(f, "profile:{id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Input records
// ---------------------------------------------------------------------------

/// A decoded `sponsorships` row.
///
/// `amount_cents`, `started_at` and `ended_at` are `None` both when the column
/// is null and when it could not be parsed; such rows still group but add
/// nothing to sums they cannot prove.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sponsorship {
    pub id: String,
    pub sponsor_id: Option<String>,
    pub sponsor_email: Option<String>,
    pub beneficiary_id: Option<String>,
    pub sponsor_beneficiary_id: Option<String>,
    pub amount_cents: Option<i64>,
    pub frequency: Frequency,
    pub status: SponsorshipStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub payment_mode: PaymentMode,
    pub stripe_subscription_id: Option<String>,
}

impl Sponsorship {
    /// Roster id if present, else profile id, else `None` (record is unusable).
    pub fn beneficiary_key(&self) -> Option<BeneficiaryKey> {
        if let Some(id) = non_empty(&self.sponsor_beneficiary_id) {
            return Some(BeneficiaryKey::Roster(id.to_string()));
        }
        non_empty(&self.beneficiary_id).map(|id| BeneficiaryKey::Profile(id.to_string()))
    }

    /// Active recurring support.
    pub fn is_stable(&self) -> bool {
        self.frequency == Frequency::Monthly && self.status == SponsorshipStatus::Active
    }

    /// Active one-time support whose end lies strictly after `now`.
    pub fn is_ending_after(&self, now: DateTime<Utc>) -> bool {
        self.frequency == Frequency::OneTime
            && self.status == SponsorshipStatus::Active
            && self.ended_at.is_some_and(|end| end > now)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// A `sponsorship_shares` row: read-only visibility granted to a linked account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorshipShare {
    pub sponsorship_id: String,
    #[serde(alias = "bestie_id", alias = "shared_with_bestie_id")]
    pub shared_with_beneficiary_id: String,
    #[serde(default)]
    pub shared_by: Option<String>,
}

// ---------------------------------------------------------------------------
// Funding output
// ---------------------------------------------------------------------------

/// Funding for one (beneficiary, payment mode) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundingView {
    pub beneficiary_key: BeneficiaryKey,
    pub payment_mode: PaymentMode,
    pub stable_amount_cents: i64,
    pub ending_amount_cents: i64,
    /// stable + ending for this mode only.
    pub current_monthly_pledges_cents: i64,
    pub monthly_goal_cents: i64,
    pub content: ContentSource,
    pub record_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FundingReport {
    /// Sorted by beneficiary key, then payment mode.
    pub views: Vec<FundingView>,
    /// Records with neither beneficiary reference.
    pub skipped_records: usize,
    /// Records grouped but left out of sums (no amount).
    pub excluded_records: usize,
}

impl FundingReport {
    pub fn view(&self, key: &BeneficiaryKey, mode: PaymentMode) -> Option<&FundingView> {
        self.views
            .iter()
            .find(|v| &v.beneficiary_key == key && v.payment_mode == mode)
    }

    /// Views the given role is allowed to see.
    pub fn visible_to(&self, role: ViewerRole) -> impl Iterator<Item = &FundingView> {
        self.views.iter().filter(move |v| role.can_see(v.payment_mode))
    }
}

// ---------------------------------------------------------------------------
// Relationship output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleSponsorship {
    pub sponsorship: Sponsorship,
    pub owned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_by: Option<String>,
    /// Live-mode funding for the sponsorship's beneficiary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funding: Option<FundingView>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RelationshipView {
    pub entries: Vec<VisibleSponsorship>,
    /// Non-fatal problems (share or funding fetch failures).
    pub warnings: Vec<String>,
}
