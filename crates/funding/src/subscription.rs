use std::collections::BTreeMap;

use crate::model::Sponsorship;

/// First transaction per Stripe subscription: the record with the earliest
/// `started_at`, ties broken by id. Records without a subscription id or a
/// start time are ignored.
///
/// One pass over already-fetched rows; callers recompute per load.
pub fn first_transactions(records: &[Sponsorship]) -> BTreeMap<String, String> {
    let mut first: BTreeMap<&str, &Sponsorship> = BTreeMap::new();

    for record in records {
        let (Some(sub), Some(started)) = (record.stripe_subscription_id.as_deref(), record.started_at)
        else {
            continue;
        };
        first
            .entry(sub)
            .and_modify(|current| {
                // `current` always has a start time; only such records are inserted.
                let current_start = current.started_at.unwrap_or(started);
                if (started, record.id.as_str()) < (current_start, current.id.as_str()) {
                    *current = record;
                }
            })
            .or_insert(record);
    }

    first
        .into_iter()
        .map(|(sub, record)| (sub.to_string(), record.id.clone()))
        .collect()
}

/// Whether `record` opened its subscription, per [`first_transactions`].
pub fn is_first_transaction(first: &BTreeMap<String, String>, record: &Sponsorship) -> bool {
    record
        .stripe_subscription_id
        .as_ref()
        .and_then(|sub| first.get(sub))
        .is_some_and(|id| *id == record.id)
}
