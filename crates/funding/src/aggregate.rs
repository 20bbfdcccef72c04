use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::content::ContentCatalog;
use crate::model::{BeneficiaryKey, FundingReport, FundingView, PaymentMode, Sponsorship};

/// Aggregate key = (beneficiary, payment mode). Never sums across modes.
pub type GroupKey = (BeneficiaryKey, PaymentMode);

/// Raw sums for one group, before content is attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FundingTotals {
    pub stable_cents: i64,
    pub ending_cents: i64,
    pub record_ids: Vec<String>,
    /// Records in the group without a usable amount, or whose amount would
    /// overflow the totals.
    pub excluded: usize,
}

/// Group records by (beneficiary, payment mode) and sum stable and ending
/// support. Returns the groups plus the count of records with no key.
pub fn aggregate_funding(
    records: &[Sponsorship],
    now: DateTime<Utc>,
) -> (BTreeMap<GroupKey, FundingTotals>, usize) {
    let mut groups: BTreeMap<GroupKey, FundingTotals> = BTreeMap::new();
    let mut skipped = 0;

    for record in records {
        let Some(key) = record.beneficiary_key() else {
            log::debug!("sponsorship {}: no beneficiary reference, skipped", record.id);
            skipped += 1;
            continue;
        };
        let entry = groups.entry((key, record.payment_mode)).or_default();
        entry.record_ids.push(record.id.clone());

        let Some(amount) = record.amount_cents else {
            entry.excluded += 1;
            continue;
        };
        let stable = record.is_stable();
        if !stable && !record.is_ending_after(now) {
            continue;
        }
        if !entry.add(amount, stable) {
            log::warn!(
                "sponsorship {}: amount {amount} overflows the group total, excluded",
                record.id
            );
            entry.excluded += 1;
        }
    }

    (groups, skipped)
}

impl FundingTotals {
    /// Add to the stable or ending sum. Refuses (returns false) when the sum
    /// or the combined pledge total would leave `i64`.
    fn add(&mut self, amount: i64, stable: bool) -> bool {
        let (stable_cents, ending_cents) = if stable {
            (self.stable_cents.checked_add(amount), Some(self.ending_cents))
        } else {
            (Some(self.stable_cents), self.ending_cents.checked_add(amount))
        };
        match (stable_cents, ending_cents) {
            (Some(s), Some(e)) if s.checked_add(e).is_some() => {
                self.stable_cents = s;
                self.ending_cents = e;
                true
            }
            _ => false,
        }
    }

    /// Stable plus ending. Never overflows, see [`FundingTotals::add`].
    pub fn pledges_cents(&self) -> i64 {
        self.stable_cents + self.ending_cents
    }
}

/// Build one [`FundingView`] per (beneficiary, payment mode) present in
/// `records`, with content resolved from `catalog`.
pub fn build_funding_report(
    records: &[Sponsorship],
    catalog: &ContentCatalog,
    now: DateTime<Utc>,
) -> FundingReport {
    let (groups, skipped_records) = aggregate_funding(records, now);

    let mut excluded_records = 0;
    let mut views = Vec::with_capacity(groups.len());
    let mut content_cache = BTreeMap::new();

    for ((key, mode), totals) in groups {
        excluded_records += totals.excluded;
        let content = content_cache
            .entry(key.clone())
            .or_insert_with(|| catalog.resolve(&key))
            .clone();
        let monthly_goal_cents = content.monthly_goal_cents(mode);

        views.push(FundingView {
            beneficiary_key: key,
            payment_mode: mode,
            stable_amount_cents: totals.stable_cents,
            ending_amount_cents: totals.ending_cents,
            current_monthly_pledges_cents: totals.pledges_cents(),
            monthly_goal_cents,
            content,
            record_ids: totals.record_ids,
        });
    }

    if skipped_records > 0 || excluded_records > 0 {
        log::info!(
            "funding: {} views, {skipped_records} records without beneficiary, {excluded_records} without usable amount",
            views.len()
        );
    }

    FundingReport {
        views,
        skipped_records,
        excluded_records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Frequency, SponsorshipStatus};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    fn record(
        id: &str,
        profile: &str,
        frequency: Frequency,
        status: SponsorshipStatus,
        cents: i64,
        mode: PaymentMode,
    ) -> Sponsorship {
        Sponsorship {
            id: id.into(),
            sponsor_id: Some("u_1".into()),
            sponsor_email: None,
            beneficiary_id: Some(profile.into()),
            sponsor_beneficiary_id: None,
            amount_cents: Some(cents),
            frequency,
            status,
            started_at: Some(now() - Duration::days(30)),
            ended_at: None,
            payment_mode: mode,
            stripe_subscription_id: None,
        }
    }

    fn key(id: &str) -> BeneficiaryKey {
        BeneficiaryKey::Profile(id.into())
    }

    #[test]
    fn empty_input_empty_output() {
        let report = build_funding_report(&[], &ContentCatalog::default(), now());
        assert!(report.views.is_empty());
        assert_eq!(report.skipped_records, 0);
    }

    #[test]
    fn stable_and_ending_split() {
        let mut one_time = record("r3", "B", Frequency::OneTime, SponsorshipStatus::Active, 1000, PaymentMode::Live);
        one_time.ended_at = Some(now() + Duration::days(1));
        let records = vec![
            record("r1", "B", Frequency::Monthly, SponsorshipStatus::Active, 2500, PaymentMode::Live),
            record("r2", "B", Frequency::Monthly, SponsorshipStatus::Cancelled, 2500, PaymentMode::Live),
            one_time,
        ];
        let report = build_funding_report(&records, &ContentCatalog::default(), now());
        assert_eq!(report.views.len(), 1);
        let view = report.view(&key("B"), PaymentMode::Live).unwrap();
        assert_eq!(view.stable_amount_cents, 2500);
        assert_eq!(view.ending_amount_cents, 1000);
        assert_eq!(view.current_monthly_pledges_cents, 3500);
        assert_eq!(view.record_ids, vec!["r1", "r2", "r3"]);
        assert!(view.content.is_none());
        assert_eq!(view.monthly_goal_cents, 0);
    }

    #[test]
    fn ended_one_time_excluded() {
        let mut past = record("r1", "B", Frequency::OneTime, SponsorshipStatus::Active, 1000, PaymentMode::Live);
        past.ended_at = Some(now() - Duration::seconds(1));
        let mut exactly_now = record("r2", "B", Frequency::OneTime, SponsorshipStatus::Active, 700, PaymentMode::Live);
        exactly_now.ended_at = Some(now());
        let no_end = record("r3", "B", Frequency::OneTime, SponsorshipStatus::Active, 300, PaymentMode::Live);

        let report = build_funding_report(&[past, exactly_now, no_end], &ContentCatalog::default(), now());
        let view = report.view(&key("B"), PaymentMode::Live).unwrap();
        assert_eq!(view.ending_amount_cents, 0);
        assert_eq!(view.stable_amount_cents, 0);
    }

    #[test]
    fn inactive_one_time_excluded() {
        let mut completed = record("r1", "B", Frequency::OneTime, SponsorshipStatus::Completed, 1000, PaymentMode::Live);
        completed.ended_at = Some(now() + Duration::days(10));
        let report = build_funding_report(&[completed], &ContentCatalog::default(), now());
        assert_eq!(report.views[0].ending_amount_cents, 0);
    }

    #[test]
    fn modes_never_mix() {
        let records = vec![
            record("r1", "B", Frequency::Monthly, SponsorshipStatus::Active, 2500, PaymentMode::Live),
            record("r2", "B", Frequency::Monthly, SponsorshipStatus::Active, 1500, PaymentMode::Test),
        ];
        let report = build_funding_report(&records, &ContentCatalog::default(), now());
        assert_eq!(report.views.len(), 2);
        assert_eq!(report.view(&key("B"), PaymentMode::Live).unwrap().stable_amount_cents, 2500);
        let test = report.view(&key("B"), PaymentMode::Test).unwrap();
        assert_eq!(test.stable_amount_cents, 1500);
        assert_eq!(test.ending_amount_cents, 0);
    }

    #[test]
    fn keyless_records_skipped() {
        let mut orphan = record("r1", "B", Frequency::Monthly, SponsorshipStatus::Active, 2500, PaymentMode::Live);
        orphan.beneficiary_id = None;
        let mut blank = record("r2", "B", Frequency::Monthly, SponsorshipStatus::Active, 2500, PaymentMode::Live);
        blank.beneficiary_id = Some("  ".into());
        let report = build_funding_report(&[orphan, blank], &ContentCatalog::default(), now());
        assert!(report.views.is_empty());
        assert_eq!(report.skipped_records, 2);
    }

    #[test]
    fn roster_reference_takes_precedence() {
        let mut both = record("r1", "p_1", Frequency::Monthly, SponsorshipStatus::Active, 500, PaymentMode::Live);
        both.sponsor_beneficiary_id = Some("sb_1".into());
        let profile_only = record("r2", "p_1", Frequency::Monthly, SponsorshipStatus::Active, 700, PaymentMode::Live);

        let report = build_funding_report(&[both, profile_only], &ContentCatalog::default(), now());
        assert_eq!(report.views.len(), 2);
        let roster = report
            .view(&BeneficiaryKey::Roster("sb_1".into()), PaymentMode::Live)
            .unwrap();
        assert_eq!(roster.stable_amount_cents, 500);
        assert_eq!(report.view(&key("p_1"), PaymentMode::Live).unwrap().stable_amount_cents, 700);
    }

    #[test]
    fn missing_amount_excluded_not_fatal() {
        let mut broken = record("r1", "B", Frequency::Monthly, SponsorshipStatus::Active, 0, PaymentMode::Live);
        broken.amount_cents = None;
        let good = record("r2", "B", Frequency::Monthly, SponsorshipStatus::Active, 1200, PaymentMode::Live);
        let report = build_funding_report(&[broken, good], &ContentCatalog::default(), now());
        let view = report.view(&key("B"), PaymentMode::Live).unwrap();
        assert_eq!(view.stable_amount_cents, 1200);
        assert_eq!(report.excluded_records, 1);
    }

    #[test]
    fn overflowing_amount_excluded() {
        let half = i64::MAX / 2 + 1;
        let records = vec![
            record("r1", "B", Frequency::Monthly, SponsorshipStatus::Active, half, PaymentMode::Live),
            record("r2", "B", Frequency::Monthly, SponsorshipStatus::Active, half, PaymentMode::Live),
            record("r3", "B", Frequency::Monthly, SponsorshipStatus::Active, 100, PaymentMode::Live),
        ];
        let report = build_funding_report(&records, &ContentCatalog::default(), now());
        let view = report.view(&key("B"), PaymentMode::Live).unwrap();
        assert_eq!(view.stable_amount_cents, half + 100);
        assert_eq!(view.current_monthly_pledges_cents, half + 100);
        assert_eq!(view.record_ids, vec!["r1", "r2", "r3"]);
        assert_eq!(report.excluded_records, 1);
    }

    #[test]
    fn pledge_total_cannot_overflow() {
        let half = i64::MAX / 2 + 1;
        let mut one_time = record("r2", "B", Frequency::OneTime, SponsorshipStatus::Active, half, PaymentMode::Live);
        one_time.ended_at = Some(now() + Duration::days(1));
        let records = vec![
            record("r1", "B", Frequency::Monthly, SponsorshipStatus::Active, half, PaymentMode::Live),
            one_time,
        ];
        let report = build_funding_report(&records, &ContentCatalog::default(), now());
        let view = report.view(&key("B"), PaymentMode::Live).unwrap();
        assert_eq!(view.stable_amount_cents, half);
        assert_eq!(view.ending_amount_cents, 0);
        assert_eq!(view.current_monthly_pledges_cents, half);
        assert_eq!(report.excluded_records, 1);
    }

    #[test]
    fn views_sorted_by_key_then_mode() {
        let records = vec![
            record("r1", "Z", Frequency::Monthly, SponsorshipStatus::Active, 100, PaymentMode::Test),
            record("r2", "A", Frequency::Monthly, SponsorshipStatus::Active, 100, PaymentMode::Test),
            record("r3", "A", Frequency::Monthly, SponsorshipStatus::Active, 100, PaymentMode::Live),
        ];
        let report = build_funding_report(&records, &ContentCatalog::default(), now());
        let order: Vec<(String, PaymentMode)> = report
            .views
            .iter()
            .map(|v| (v.beneficiary_key.id().to_string(), v.payment_mode))
            .collect();
        assert_eq!(
            order,
            vec![
                ("A".to_string(), PaymentMode::Live),
                ("A".to_string(), PaymentMode::Test),
                ("Z".to_string(), PaymentMode::Test),
            ]
        );
    }
}
