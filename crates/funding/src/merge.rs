//! Relationship merge: what a caregiver can see.
//!
//! Owned sponsorships (by account id or claimed guest email) are combined with
//! sponsorships other accounts shared with the viewer. Each id appears once;
//! ownership wins. Live-mode funding is attached per beneficiary.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::thread;

use chrono::{DateTime, Utc};

use crate::aggregate::build_funding_report;
use crate::content::ContentCatalog;
use crate::error::FundingError;
use crate::model::{
    BeneficiaryKey, PaymentMode, RelationshipView, Sponsorship, SponsorshipShare,
    SponsorshipStatus, VisibleSponsorship,
};

/// The account whose view is being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub id: String,
    pub email: Option<String>,
}

impl Viewer {
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            id: id.into(),
            email,
        }
    }

    /// Direct sponsor, or the guest checkout email matches (case-insensitive).
    pub fn owns(&self, sponsorship: &Sponsorship) -> bool {
        if sponsorship.sponsor_id.as_deref() == Some(self.id.as_str()) {
            return true;
        }
        match (&self.email, &sponsorship.sponsor_email) {
            (Some(mine), Some(theirs)) => mine.trim().eq_ignore_ascii_case(theirs.trim()),
            _ => false,
        }
    }
}

/// Record query interface used by the merge layer.
pub trait SponsorshipSource {
    /// Sponsorships where the viewer is sponsor by id or by email.
    fn owned_sponsorships(&self, viewer: &Viewer) -> Result<Vec<Sponsorship>, FundingError>;

    /// Shares granted to `viewer_id`.
    fn shares_for(&self, viewer_id: &str) -> Result<Vec<SponsorshipShare>, FundingError>;

    fn sponsorships_by_ids(&self, ids: &[String]) -> Result<Vec<Sponsorship>, FundingError>;

    /// Every sponsorship of the given beneficiaries in one payment mode.
    fn beneficiary_sponsorships(
        &self,
        keys: &[BeneficiaryKey],
        mode: PaymentMode,
    ) -> Result<Vec<Sponsorship>, FundingError>;

    fn content_for(&self, keys: &[BeneficiaryKey]) -> Result<ContentCatalog, FundingError>;
}

/// Combine owned and shared sponsorships.
///
/// `shared_records` are the sponsorships the shares point at. Shares whose
/// sponsorship is missing or not active are dropped, as are shared copies of
/// anything the viewer already owns.
pub fn merge_relationships(
    owned: Vec<Sponsorship>,
    shares: &[SponsorshipShare],
    shared_records: Vec<Sponsorship>,
) -> Vec<VisibleSponsorship> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut entries = Vec::with_capacity(owned.len() + shares.len());

    for sponsorship in owned {
        if seen.insert(sponsorship.id.clone()) {
            entries.push(VisibleSponsorship {
                sponsorship,
                owned: true,
                shared_by: None,
                funding: None,
            });
        }
    }

    let mut by_id: HashMap<String, Sponsorship> = shared_records
        .into_iter()
        .map(|s| (s.id.clone(), s))
        .collect();

    for share in shares {
        if seen.contains(&share.sponsorship_id) {
            continue;
        }
        let Some(sponsorship) = by_id.remove(&share.sponsorship_id) else {
            log::debug!("share of {} has no visible sponsorship", share.sponsorship_id);
            continue;
        };
        if sponsorship.status != SponsorshipStatus::Active {
            continue;
        }
        seen.insert(sponsorship.id.clone());
        entries.push(VisibleSponsorship {
            sponsorship,
            owned: false,
            shared_by: share.shared_by.clone(),
            funding: None,
        });
    }

    entries
}

/// Fetch, merge and attach funding for `viewer`.
///
/// Only the owned fetch is fatal. Share and funding failures leave a warning
/// and a partial result.
pub fn load_visible_sponsorships<S>(
    source: &S,
    viewer: &Viewer,
    now: DateTime<Utc>,
) -> Result<RelationshipView, FundingError>
where
    S: SponsorshipSource + Sync + ?Sized,
{
    let (owned, shares) = thread::scope(|scope| {
        let shares = scope.spawn(|| source.shares_for(&viewer.id));
        let owned = source.owned_sponsorships(viewer);
        let shares = shares
            .join()
            .unwrap_or_else(|_| Err(FundingError::Source("share fetch panicked".into())));
        (owned, shares)
    });

    let owned: Vec<Sponsorship> = owned?
        .into_iter()
        .filter(|s| {
            let mine = viewer.owns(s);
            if !mine {
                log::warn!("sponsorship {} returned as owned but not sponsored by viewer", s.id);
            }
            mine
        })
        .collect();

    let mut warnings = Vec::new();
    let (shares, shared_records) = match shares {
        Ok(shares) => {
            let shares: Vec<SponsorshipShare> = shares
                .into_iter()
                .filter(|share| share.shared_with_beneficiary_id == viewer.id)
                .collect();
            let owned_ids: HashSet<&str> = owned.iter().map(|s| s.id.as_str()).collect();
            let wanted: Vec<String> = shares
                .iter()
                .map(|share| share.sponsorship_id.clone())
                .filter(|id| !owned_ids.contains(id.as_str()))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            if wanted.is_empty() {
                (shares, Vec::new())
            } else {
                match source.sponsorships_by_ids(&wanted) {
                    Ok(records) => (shares, records),
                    Err(e) => {
                        log::warn!("shared sponsorships unavailable: {e}");
                        warnings.push(format!("shared sponsorships unavailable: {e}"));
                        (Vec::new(), Vec::new())
                    }
                }
            }
        }
        Err(e) => {
            log::warn!("shares unavailable: {e}");
            warnings.push(format!("shares unavailable: {e}"));
            (Vec::new(), Vec::new())
        }
    };

    let mut entries = merge_relationships(owned, &shares, shared_records);
    if let Err(e) = attach_funding(source, &mut entries, now) {
        log::warn!("funding unavailable: {e}");
        warnings.push(format!("funding unavailable: {e}"));
    }

    Ok(RelationshipView { entries, warnings })
}

/// Attach live-mode funding to every entry. On error no entry is touched.
pub fn attach_funding<S>(
    source: &S,
    entries: &mut [VisibleSponsorship],
    now: DateTime<Utc>,
) -> Result<(), FundingError>
where
    S: SponsorshipSource + Sync + ?Sized,
{
    let keys: Vec<BeneficiaryKey> = entries
        .iter()
        .filter_map(|e| e.sponsorship.beneficiary_key())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if keys.is_empty() {
        return Ok(());
    }

    let (records, catalog) = thread::scope(|scope| {
        let catalog = scope.spawn(|| source.content_for(&keys));
        let records = source.beneficiary_sponsorships(&keys, PaymentMode::Live);
        let catalog = catalog
            .join()
            .unwrap_or_else(|_| Err(FundingError::Source("content fetch panicked".into())));
        (records, catalog)
    });
    let records = records?;
    let catalog = catalog?;

    // Only live records count toward what members are shown.
    let live: Vec<Sponsorship> = records
        .into_iter()
        .filter(|s| s.payment_mode == PaymentMode::Live)
        .collect();
    let report = build_funding_report(&live, &catalog, now);

    for entry in entries.iter_mut() {
        entry.funding = entry
            .sponsorship
            .beneficiary_key()
            .and_then(|key| report.view(&key, PaymentMode::Live).cloned());
    }
    Ok(())
}
