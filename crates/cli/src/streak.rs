//! `bestie streak`

use std::path::PathBuf;

use bestie_config::Settings;
use bestie_funding::calendar::{
    community_today, compute_streak, parse_zone, CheckIn, Milestones, StreakStatus,
};
use bestie_funding::decode::{decode_table, parse_rows};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::{print_json, read_input, CliError};

#[derive(Serialize)]
struct StreakOutput {
    time_zone: String,
    today: NaiveDate,
    check_ins: usize,
    #[serde(flatten)]
    status: StreakStatus,
}

pub fn cmd_streak(
    check_ins: PathBuf,
    zone: Option<String>,
    today: Option<String>,
    json: bool,
) -> Result<(), CliError> {
    let settings = Settings::load();
    let zone_name = zone.unwrap_or_else(|| settings.time_zone.clone());
    let tz = parse_zone(&zone_name)
        .map_err(|e| CliError::funding(e).with_hint("use an IANA name such as America/Denver"))?;
    let milestones = Milestones::new(settings.milestones.clone()).map_err(|e| {
        CliError::funding(e).with_hint(format!(
            "fix checkin.milestones in {}",
            Settings::config_path_display()
        ))
    })?;

    let today = match today {
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
            CliError::usage(format!("invalid --today '{}'", raw)).with_hint("use YYYY-MM-DD")
        })?,
        None => community_today(tz),
    };

    let rows = parse_rows(&read_input(&check_ins)?).map_err(CliError::funding)?;
    let decoded = decode_table::<CheckIn>("daily_check_ins", &rows);
    let instants: Vec<DateTime<Utc>> = decoded
        .records
        .iter()
        .filter_map(|c| c.checked_in_at)
        .collect();
    tracing::debug!(rows = rows.len(), usable = instants.len(), "decoded check-ins");

    let status = compute_streak(&instants, tz, today, &milestones);

    if json {
        return print_json(&StreakOutput {
            time_zone: zone_name,
            today,
            check_ins: instants.len(),
            status,
        });
    }

    println!("Today ({}): {}", zone_name, today);
    println!(
        "Current streak: {} day(s){}",
        status.current_streak,
        if status.checked_in_today { "" } else { " (not checked in today)" }
    );
    println!("Longest streak: {} day(s)", status.longest_streak);
    if let Some(m) = status.reached_milestone {
        println!("Milestone reached: {} days", m);
    }
    if let Some(m) = status.next_milestone {
        println!("Next milestone: {} days", m);
    }
    Ok(())
}
