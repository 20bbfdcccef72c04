//! `bestie collection`: sticker progress from exported rows.

use std::path::PathBuf;

use bestie_funding::collection::{
    display_sticker, reveal_outcome, CollectionSummary, RevealOutcome, Sticker, UserSticker,
};
use bestie_funding::decode::{decode_table, parse_rows};
use serde::Serialize;

use crate::{print_json, read_input, CliError};

#[derive(Serialize)]
struct CollectionOutput<'a> {
    #[serde(flatten)]
    summary: CollectionSummary,
    display_sticker: Option<&'a Sticker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reveal: Option<RevealOutcome>,
    rejected_records: usize,
}

pub fn cmd_collection(
    stickers: PathBuf,
    owned: PathBuf,
    preview: Option<String>,
    reveal: Option<String>,
    json: bool,
) -> Result<(), CliError> {
    let catalog_rows = parse_rows(&read_input(&stickers)?).map_err(CliError::funding)?;
    let owned_rows = parse_rows(&read_input(&owned)?).map_err(CliError::funding)?;
    let catalog = decode_table::<Sticker>("stickers", &catalog_rows);
    let held = decode_table::<UserSticker>("user_stickers", &owned_rows);
    let rejected_records = catalog.rejected.len() + held.rejected.len();
    tracing::debug!(
        stickers = catalog.records.len(),
        held = held.records.len(),
        rejected = rejected_records,
        "decoded sticker rows"
    );

    let summary = CollectionSummary::build(&catalog.records, &held.records);
    let shown = display_sticker(preview.as_deref(), &catalog.records);
    let reveal = reveal.map(|id| reveal_outcome(&held.records, &id));

    if json {
        return print_json(&CollectionOutput {
            summary,
            display_sticker: shown,
            reveal,
            rejected_records,
        });
    }

    println!(
        "Collected {} of {} ({}%), {} duplicate(s)",
        summary.unique_owned, summary.total_stickers, summary.completion_percent, summary.duplicate_copies
    );
    for tally in summary.by_rarity.iter().filter(|t| t.total > 0) {
        println!("  {:<10} {}/{}", tally.rarity.to_string(), tally.owned, tally.total);
    }
    if let Some(sticker) = shown {
        println!("Card sticker: {} ({})", sticker.name, sticker.id);
    }
    match reveal {
        Some(RevealOutcome::New) => println!("Reveal: new sticker"),
        Some(RevealOutcome::Duplicate { copies }) => {
            println!("Reveal: duplicate, {} already held", copies)
        }
        None => {}
    }
    if rejected_records > 0 {
        eprintln!("{} undecodable row(s)", rejected_records);
    }
    Ok(())
}
