use thiserror::Error;

#[derive(Debug, Error)]
pub enum FundingError {
    /// Input is not the expected JSON shape (e.g. not an array of rows).
    #[error("input parse error: {0}")]
    Parse(String),
    /// A row cannot be decoded into a typed record.
    #[error("{table} row {row}: {reason}")]
    Decode {
        table: &'static str,
        row: usize,
        reason: String,
    },
    /// Invalid configuration (unknown time zone, unordered milestones, ...).
    #[error("config validation error: {0}")]
    Config(String),
    /// The external record source failed.
    #[error("source error: {0}")]
    Source(String),
}
