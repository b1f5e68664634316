use crate::{
    data::{BalanceRecord, Error, UserId},
    store::LedgerStore,
};
use chrono::NaiveDate;
use tracing::debug;

/// Find the user owning `lookup_code`. No match is `None`, not an error.
pub(crate) fn resolve_user<S: LedgerStore>(
    store: &mut S,
    lookup_code: &str,
) -> Result<Option<UserId>, Error> {
    let user = store
        .user_for_code(lookup_code)?
        .filter(|user| !user.is_empty());
    match &user {
        Some(user) => debug!(lookup_code, %user, "lookup code resolved"),
        None => debug!(lookup_code, "no user owns this lookup code"),
    }
    Ok(user)
}

/// Where a balance was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BalanceSource {
    /// Newest qualifying wallet transaction.
    TransactionHistory,
    /// Current wallet row, only consulted when there is no history.
    CurrentBalance,
}

use BalanceSource::*;

/// Resolution steps, tried in this order until one yields a record.
const RESOLUTION_ORDER: [BalanceSource; 2] = [TransactionHistory, CurrentBalance];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedBalance {
    pub source: BalanceSource,
    pub record: BalanceRecord,
}

/// Most recent balance of `user` as of `cutoff`, or `None` when neither
/// table knows the user.
pub(crate) fn resolve_balance<S: LedgerStore>(
    store: &mut S,
    user: &str,
    cutoff: NaiveDate,
) -> Result<Option<ResolvedBalance>, Error> {
    for source in RESOLUTION_ORDER {
        let found = match source {
            TransactionHistory => store.latest_transaction(user, cutoff)?,
            CurrentBalance => store.current_balance(user)?,
        };
        if let Some(record) = found {
            debug!(user, ?source, "balance found");
            return Ok(Some(ResolvedBalance { source, record }));
        }
    }
    debug!(user, "no balance recorded");
    Ok(None)
}
