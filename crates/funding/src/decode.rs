//! Tolerant decoding of raw datastore rows.
//!
//! Identity columns (`id`, `frequency`, `status`, `payment_mode`) must be
//! readable or the row is rejected. Amounts and timestamps degrade to `None`
//! so one bad value never blanks out a whole beneficiary.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::FundingError;
use crate::model::{Frequency, PaymentMode, Sponsorship, SponsorshipShare, SponsorshipStatus};
use crate::money::amount_from_json;

const SPONSORSHIPS: &str = "sponsorships";
const SHARES: &str = "sponsorship_shares";

/// Rows that decoded, plus the reasons others did not.
#[derive(Debug)]
pub struct Decoded<T> {
    pub records: Vec<T>,
    pub rejected: Vec<FundingError>,
}

impl<T> Default for Decoded<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

/// Parse a JSON document that must be an array of row objects.
pub fn parse_rows(input: &str) -> Result<Vec<Value>, FundingError> {
    let value: Value =
        serde_json::from_str(input).map_err(|e| FundingError::Parse(e.to_string()))?;
    match value {
        Value::Array(rows) => Ok(rows),
        other => Err(FundingError::Parse(format!(
            "expected an array of rows, found {}",
            json_kind(&other)
        ))),
    }
}

pub fn decode_sponsorships(rows: &[Value]) -> Decoded<Sponsorship> {
    let mut out = Decoded::default();
    for (index, row) in rows.iter().enumerate() {
        match decode_sponsorship(row, index) {
            Ok(record) => out.records.push(record),
            Err(e) => {
                log::warn!("skipping {e}");
                out.rejected.push(e);
            }
        }
    }
    out
}

pub fn decode_shares(rows: &[Value]) -> Decoded<SponsorshipShare> {
    decode_table(SHARES, rows)
}

/// Plain serde decoding for tables without identity fallbacks (shares,
/// content rows, stickers). Rows that fail are logged and collected.
pub fn decode_table<T: DeserializeOwned>(table: &'static str, rows: &[Value]) -> Decoded<T> {
    let mut out = Decoded::default();
    for (index, row) in rows.iter().enumerate() {
        match T::deserialize(row) {
            Ok(record) => out.records.push(record),
            Err(e) => {
                let err = FundingError::Decode {
                    table,
                    row: index,
                    reason: e.to_string(),
                };
                log::warn!("skipping {err}");
                out.rejected.push(err);
            }
        }
    }
    out
}

pub fn decode_sponsorship(row: &Value, index: usize) -> Result<Sponsorship, FundingError> {
    let fail = |reason: String| FundingError::Decode {
        table: SPONSORSHIPS,
        row: index,
        reason,
    };

    let Value::Object(fields) = row else {
        return Err(fail(format!("expected an object, found {}", json_kind(row))));
    };

    let id = id_field(fields.get("id")).ok_or_else(|| fail("missing id".into()))?;

    let frequency = required_enum(fields.get("frequency"), Frequency::parse)
        .map_err(|v| fail(format!("sponsorship {id}: unknown frequency {v}")))?;
    let status = required_enum(fields.get("status"), SponsorshipStatus::parse)
        .map_err(|v| fail(format!("sponsorship {id}: unknown status {v}")))?;
    let payment_mode = match fields.get("payment_mode") {
        None | Some(Value::Null) => PaymentMode::Live,
        Some(v) => v
            .as_str()
            .and_then(PaymentMode::parse)
            .ok_or_else(|| fail(format!("sponsorship {id}: unknown payment_mode {v}")))?,
    };

    let amount_value = fields.get("amount");
    let amount_cents = amount_from_json(amount_value);
    if amount_cents.is_none() {
        log::debug!("sponsorship {id}: no usable amount ({amount_value:?})");
    }

    Ok(Sponsorship {
        sponsor_id: string_field(fields.get("sponsor_id")),
        sponsor_email: string_field(fields.get("sponsor_email")),
        beneficiary_id: string_field(fields.get("bestie_id").or(fields.get("beneficiary_id"))),
        sponsor_beneficiary_id: string_field(
            fields
                .get("sponsor_bestie_id")
                .or(fields.get("sponsor_beneficiary_id")),
        ),
        amount_cents,
        frequency,
        status,
        started_at: timestamp_field(&id, "started_at", fields.get("started_at")),
        ended_at: timestamp_field(&id, "ended_at", fields.get("ended_at")),
        payment_mode,
        stripe_subscription_id: string_field(fields.get("stripe_subscription_id")),
        id,
    })
}

/// Accepts RFC 3339, Postgres `timestamptz` text, naive timestamps (UTC) and
/// bare dates (midnight UTC).
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// serde helper: amount column that may be a number, a decimal string, null,
/// or junk. Junk reads as `None`.
pub(crate) fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(amount_from_json(value.as_ref()))
}

/// serde helper: timestamp column; unparseable text reads as `None`.
pub(crate) fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_str).and_then(parse_timestamp))
}

// ── Field helpers ───────────────────────────────────────────────────

fn id_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_field(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn required_enum<T>(value: Option<&Value>, parse: fn(&str) -> Option<T>) -> Result<T, String> {
    match value {
        Some(Value::String(s)) => parse(s).ok_or_else(|| format!("'{s}'")),
        Some(other) => Err(other.to_string()),
        None => Err("(missing)".into()),
    }
}

fn timestamp_field(id: &str, column: &str, value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::Null => None,
        Value::String(s) => {
            let parsed = parse_timestamp(s);
            if parsed.is_none() {
                log::warn!("sponsorship {id}: cannot parse {column} '{s}'");
            }
            parsed
        }
        other => {
            log::warn!("sponsorship {id}: {column} is not a string ({other})");
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
