//! Descriptive content for a beneficiary.
//!
//! Two sources exist: the sponsor roster record (`sponsor_besties`) and the
//! featured profile (`featured_besties`). They are resolved once per
//! beneficiary by walking [`CONTENT_STRATEGIES`] in order; the first strategy
//! that finds something wins.

use serde::{Deserialize, Serialize};

use crate::decode::lenient_amount;
use crate::model::{BeneficiaryKey, PaymentMode};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSection {
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub text: String,
}

/// Per-mode goal overrides shared by both content sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalOverrides {
    #[serde(default, deserialize_with = "lenient_amount", alias = "monthly_goal_live")]
    pub live_cents: Option<i64>,
    #[serde(default, deserialize_with = "lenient_amount", alias = "monthly_goal_test")]
    pub test_cents: Option<i64>,
}

impl GoalOverrides {
    fn for_mode(&self, mode: PaymentMode) -> Option<i64> {
        match mode {
            PaymentMode::Live => self.live_cents,
            PaymentMode::Test => self.test_cents,
        }
    }
}

/// A `sponsor_besties` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorBeneficiaryRecord {
    pub id: String,
    /// Linked platform profile, when the roster entry has an account.
    #[serde(default, alias = "bestie_id")]
    pub beneficiary_id: Option<String>,
    #[serde(default, alias = "bestie_name")]
    pub name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub voice_note_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount", rename = "monthly_goal")]
    pub monthly_goal_cents: Option<i64>,
    #[serde(flatten)]
    pub goal_overrides: GoalOverrides,
    #[serde(default)]
    pub text_sections: Vec<TextSection>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// A `featured_besties` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturedProfile {
    pub id: String,
    #[serde(alias = "bestie_id")]
    pub beneficiary_id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub voice_note_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount", rename = "monthly_goal")]
    pub monthly_goal_cents: Option<i64>,
    #[serde(flatten)]
    pub goal_overrides: GoalOverrides,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Resolved content
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ContentSource {
    SponsorRecord(SponsorBeneficiaryRecord),
    FeaturedProfile(FeaturedProfile),
    /// Nothing to describe the beneficiary with. Not an error.
    None,
}

impl ContentSource {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Mode override, else the plain goal, else zero.
    pub fn monthly_goal_cents(&self, mode: PaymentMode) -> i64 {
        let (overrides, goal) = match self {
            Self::SponsorRecord(r) => (&r.goal_overrides, r.monthly_goal_cents),
            Self::FeaturedProfile(p) => (&p.goal_overrides, p.monthly_goal_cents),
            Self::None => return 0,
        };
        overrides.for_mode(mode).or(goal).unwrap_or(0)
    }

    pub fn image_url(&self) -> Option<&str> {
        match self {
            Self::SponsorRecord(r) => r.image_url.as_deref(),
            Self::FeaturedProfile(p) => p.image_url.as_deref(),
            Self::None => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::SponsorRecord(_) => "sponsor_record",
            Self::FeaturedProfile(_) => "featured_profile",
            Self::None => "none",
        }
    }
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentStrategy {
    SponsorRecord,
    FeaturedProfile,
}

/// Lookup order. Sponsor-specific content overrides the featured profile.
pub const CONTENT_STRATEGIES: [ContentStrategy; 2] =
    [ContentStrategy::SponsorRecord, ContentStrategy::FeaturedProfile];

/// All content rows fetched for a set of beneficiaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentCatalog {
    #[serde(default, alias = "sponsor_besties")]
    pub sponsor_records: Vec<SponsorBeneficiaryRecord>,
    #[serde(default, alias = "featured_besties")]
    pub featured_profiles: Vec<FeaturedProfile>,
}

impl ContentCatalog {
    pub fn resolve(&self, key: &BeneficiaryKey) -> ContentSource {
        CONTENT_STRATEGIES
            .iter()
            .find_map(|strategy| self.lookup(*strategy, key))
            .unwrap_or(ContentSource::None)
    }

    fn lookup(&self, strategy: ContentStrategy, key: &BeneficiaryKey) -> Option<ContentSource> {
        match strategy {
            ContentStrategy::SponsorRecord => self
                .sponsor_record(key)
                .cloned()
                .map(ContentSource::SponsorRecord),
            ContentStrategy::FeaturedProfile => self
                .featured_profile(key)
                .cloned()
                .map(ContentSource::FeaturedProfile),
        }
    }

    /// Active records win over inactive ones for the same beneficiary.
    fn sponsor_record(&self, key: &BeneficiaryKey) -> Option<&SponsorBeneficiaryRecord> {
        let matches = |r: &&SponsorBeneficiaryRecord| match key {
            BeneficiaryKey::Roster(id) => &r.id == id,
            BeneficiaryKey::Profile(id) => r.beneficiary_id.as_deref() == Some(id.as_str()),
        };
        self.sponsor_records
            .iter()
            .filter(matches)
            .find(|r| r.is_active)
            .or_else(|| self.sponsor_records.iter().find(matches))
    }

    /// Featured profiles describe platform accounts only.
    fn featured_profile(&self, key: &BeneficiaryKey) -> Option<&FeaturedProfile> {
        let BeneficiaryKey::Profile(id) = key else {
            return None;
        };
        self.featured_profiles
            .iter()
            .find(|p| p.is_active && &p.beneficiary_id == id)
    }
}
