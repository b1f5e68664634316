use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Users are keyed by whatever the store hands back, read as text.
pub type UserId = String;

/// Latest date (inclusive) a historical transaction may carry to qualify.
pub const DEFAULT_CUTOFF: &str = "2024-10-31";

/// Output header; the column set and order never depend on the input file.
pub const OUTPUT_COLUMNS: [&str; 4] = [
    "unique_code",
    "last_balance_snapshot",
    "last_transaction_date",
    "user_id",
];

/// One row of the input file. Both columns are optional, and so is their
/// presence in the header: a missing column or an empty field reads as
/// `None`. `unique_code` is kept exactly as written; `user_id` is trimmed and
/// a blank one is `None`. Any other column is ignored.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct BalanceRequest {
    pub unique_code: Option<String>,
    #[serde(deserialize_with = "trimmed")]
    pub user_id: Option<UserId>,
}

fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty()))
}

/// One row of the output file, serialized in `OUTPUT_COLUMNS` order.
/// `None` fields are written as empty fields.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct BalanceReport {
    pub unique_code: Option<String>,
    pub last_balance_snapshot: Option<Decimal>,
    pub last_transaction_date: Option<String>,
    pub user_id: Option<UserId>,
}

/// A balance as the store holds it. Both columns are nullable on the
/// database side, and the date is kept as raw text until it is normalized.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct BalanceRecord {
    pub amount: Option<Decimal>,
    pub as_of: Option<String>,
}

/// Counters reported once the run is over.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub rows: usize,
    pub codes_resolved: usize,
    pub codes_unmatched: usize,
    pub from_history: usize,
    pub from_current: usize,
    pub without_balance: usize,
}

/// Environment-level failures. Anything in here aborts the run; lookups that
/// come back empty are `None`, never an `Error`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("cannot start the database runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
