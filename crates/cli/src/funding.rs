//! `bestie funding`: offline aggregation over exported rows.

use std::collections::BTreeMap;
use std::path::PathBuf;

use bestie_config::{ModeDisplay, Settings};
use bestie_funding::decode::{decode_sponsorships, parse_rows, parse_timestamp};
use bestie_funding::money::format_cents;
use bestie_funding::subscription::first_transactions;
use bestie_funding::{build_funding_report, ContentCatalog, FundingView, PaymentMode, ViewerRole};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{print_json, read_input, CliError};

#[derive(Serialize)]
struct FundingOutput<'a> {
    role: ViewerRole,
    evaluated_at: DateTime<Utc>,
    views: Vec<&'a FundingView>,
    skipped_records: usize,
    excluded_records: usize,
    rejected_records: usize,
    /// Subscription id -> id of the record that opened it.
    first_transactions: BTreeMap<String, String>,
}

pub fn cmd_funding(
    sponsorships: PathBuf,
    content: Option<PathBuf>,
    now: Option<String>,
    admin: bool,
    json: bool,
) -> Result<(), CliError> {
    let now = match now {
        Some(raw) => parse_timestamp(&raw).ok_or_else(|| {
            CliError::usage(format!("invalid --now '{}'", raw))
                .with_hint("use RFC 3339, e.g. 2026-10-18T12:00:00Z")
        })?,
        None => Utc::now(),
    };

    let rows = parse_rows(&read_input(&sponsorships)?).map_err(CliError::funding)?;
    let decoded = decode_sponsorships(&rows);
    tracing::debug!(
        rows = rows.len(),
        rejected = decoded.rejected.len(),
        "decoded sponsorships"
    );

    let catalog = match content {
        Some(path) => serde_json::from_str::<ContentCatalog>(&read_input(&path)?)
            .map_err(|e| CliError::parse(format!("{}: {}", path.display(), e)))?,
        None => ContentCatalog::default(),
    };

    let settings = Settings::load();
    let role = if admin { ViewerRole::Admin } else { ViewerRole::Member };
    let report = build_funding_report(&decoded.records, &catalog, now);
    let views: Vec<&FundingView> = report
        .visible_to(role)
        .filter(|v| shows_mode(settings.payment_mode, v.payment_mode))
        .collect();

    if json {
        return print_json(&FundingOutput {
            role,
            evaluated_at: now,
            views,
            skipped_records: report.skipped_records,
            excluded_records: report.excluded_records,
            rejected_records: decoded.rejected.len(),
            first_transactions: first_transactions(&decoded.records),
        });
    }

    println!(
        "{:<28} {:<5} {:>10} {:>10} {:>10} {:>10}  {}",
        "BENEFICIARY", "MODE", "STABLE", "ENDING", "PLEDGED", "GOAL", "CONTENT"
    );
    for view in &views {
        println!(
            "{:<28} {:<5} {:>10} {:>10} {:>10} {:>10}  {}",
            view.beneficiary_key.to_string(),
            view.payment_mode.to_string(),
            format_cents(view.stable_amount_cents),
            format_cents(view.ending_amount_cents),
            format_cents(view.current_monthly_pledges_cents),
            format_cents(view.monthly_goal_cents),
            view.content.kind(),
        );
    }

    let rejected = decoded.rejected.len();
    if report.skipped_records + report.excluded_records + rejected > 0 {
        eprintln!(
            "{} without beneficiary, {} without usable amount, {} undecodable",
            report.skipped_records, report.excluded_records, rejected
        );
    }
    Ok(())
}

/// Whether the `display.paymentMode` setting lets a view in `mode` through.
fn shows_mode(display: ModeDisplay, mode: PaymentMode) -> bool {
    match display {
        ModeDisplay::All => true,
        ModeDisplay::Live => mode == PaymentMode::Live,
        ModeDisplay::Test => mode == PaymentMode::Test,
    }
}
