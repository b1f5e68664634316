use crate::{
    data::{BalanceReport, BalanceRequest, Error, RunSummary},
    date::normalize,
    read::RequestHandler,
    resolve::{resolve_balance, resolve_user, BalanceSource, ResolvedBalance},
    store::LedgerStore,
    write::ReportWriter,
};
use chrono::NaiveDate;

/// A finished row plus what it took to produce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Enriched {
    pub report: BalanceReport,
    /// `Some(found)` when the user had to be looked up from the code.
    pub code_lookup: Option<bool>,
    pub source: Option<BalanceSource>,
}

/// Turn one request into one report.
///
/// The output `user_id` is only filled when it had to be looked up from
/// `unique_code`; a `user_id` given on input is used but not echoed back.
/// `unique_code` is echoed verbatim, but looked up without its surrounding
/// whitespace, and not at all when that leaves nothing.
pub(crate) fn process_row<S: LedgerStore>(
    store: &mut S,
    cutoff: NaiveDate,
    request: BalanceRequest,
) -> Result<Enriched, Error> {
    let BalanceRequest {
        unique_code,
        user_id,
    } = request;
    let mut report = BalanceReport {
        unique_code,
        ..BalanceReport::default()
    };
    let mut code_lookup = None;

    let lookup_key = report
        .unique_code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty());
    let user = match (user_id, lookup_key) {
        (Some(user), _) => Some(user),
        (None, Some(code)) => {
            let resolved = resolve_user(store, code)?;
            code_lookup = Some(resolved.is_some());
            report.user_id.clone_from(&resolved);
            resolved
        }
        (None, None) => None,
    };

    let mut source = None;
    if let Some(user) = user {
        if let Some(ResolvedBalance { source: from, record }) =
            resolve_balance(store, &user, cutoff)?
        {
            report.last_balance_snapshot = record.amount;
            report.last_transaction_date = normalize(record.as_of.as_deref());
            source = Some(from);
        }
    }

    Ok(Enriched {
        report,
        code_lookup,
        source,
    })
}

/// Enriches every request it is handed and streams the result to the sink.
pub(crate) struct Enricher<'a, S, W: std::io::Write> {
    store: &'a mut S,
    sink: &'a mut ReportWriter<W>,
    cutoff: NaiveDate,
    summary: RunSummary,
}

impl<'a, S: LedgerStore, W: std::io::Write> Enricher<'a, S, W> {
    pub fn new(store: &'a mut S, sink: &'a mut ReportWriter<W>, cutoff: NaiveDate) -> Self {
        Self {
            store,
            sink,
            cutoff,
            summary: RunSummary::default(),
        }
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }
}

impl<S: LedgerStore, W: std::io::Write> RequestHandler for Enricher<'_, S, W> {
    fn handle(&mut self, request: BalanceRequest) -> Result<(), Error> {
        let enriched = process_row(&mut *self.store, self.cutoff, request)?;
        self.sink.write(&enriched.report)?;

        let summary = &mut self.summary;
        summary.rows += 1;
        match enriched.code_lookup {
            Some(true) => summary.codes_resolved += 1,
            Some(false) => summary.codes_unmatched += 1,
            None => {}
        }
        match enriched.source {
            Some(BalanceSource::TransactionHistory) => summary.from_history += 1,
            Some(BalanceSource::CurrentBalance) => summary.from_current += 1,
            None => summary.without_balance += 1,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{process_row, Enriched};
    use crate::{
        data::{BalanceReport, BalanceRequest},
        resolve::BalanceSource::*,
        store::memory::{record, MemoryStore},
    };
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn cutoff() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 31).unwrap()
    }

    fn request(unique_code: Option<&str>, user_id: Option<&str>) -> BalanceRequest {
        BalanceRequest {
            unique_code: unique_code.map(Into::into),
            user_id: user_id.map(Into::into),
        }
    }

    fn store() -> MemoryStore {
        MemoryStore {
            vendoritems: vec![("ABC123".into(), "42".into()), ("ORPHAN".into(), "99".into())],
            transactions: vec![
                ("42".into(), record(dec!(120.00), "01/10/2024")),
                ("42".into(), record(dec!(150.00), "15/10/2024")),
            ],
            wallets: vec![("7".into(), record(dec!(12.50), "2024-02-29"))],
            ..Default::default()
        }
    }

    #[test]
    fn code_resolved_to_user_with_history() {
        let mut store = store();
        let enriched =
            process_row(&mut store, cutoff(), request(Some("ABC123"), None)).unwrap();
        assert_eq!(
            enriched,
            Enriched {
                report: BalanceReport {
                    unique_code: Some("ABC123".into()),
                    last_balance_snapshot: Some(dec!(150.00)),
                    last_transaction_date: Some("2024-10-15".into()),
                    user_id: Some("42".into()),
                },
                code_lookup: Some(true),
                source: Some(TransactionHistory),
            }
        );
    }

    #[test]
    fn given_user_is_not_echoed() {
        let mut store = store();
        let enriched =
            process_row(&mut store, cutoff(), request(Some("ABC123"), Some("7"))).unwrap();
        assert_eq!(
            enriched.report,
            BalanceReport {
                unique_code: Some("ABC123".into()),
                last_balance_snapshot: Some(dec!(12.50)),
                last_transaction_date: Some("2024-02-29".into()),
                user_id: None,
            }
        );
        assert_eq!(enriched.code_lookup, None);
        assert_eq!(enriched.source, Some(CurrentBalance));
        // The code is not looked up when the user is already known.
        assert!(store.queries.iter().all(|(table, _)| *table != "vendoritems"));
    }

    #[test]
    fn unknown_code_leaves_everything_empty() {
        let mut store = store();
        let enriched = process_row(&mut store, cutoff(), request(Some("NOPE"), None)).unwrap();
        assert_eq!(
            enriched.report,
            BalanceReport {
                unique_code: Some("NOPE".into()),
                ..Default::default()
            }
        );
        assert_eq!(enriched.code_lookup, Some(false));
        assert_eq!(store.queries.len(), 1);
    }

    #[test]
    fn resolved_user_without_balance() {
        let mut store = store();
        let enriched =
            process_row(&mut store, cutoff(), request(Some("ORPHAN"), None)).unwrap();
        assert_eq!(
            enriched.report,
            BalanceReport {
                unique_code: Some("ORPHAN".into()),
                user_id: Some("99".into()),
                ..Default::default()
            }
        );
        assert_eq!(enriched.source, None);
    }

    #[test]
    fn timestamp_from_the_store_is_normalized() {
        let mut store = MemoryStore {
            transactions: vec![("42".into(), record(dec!(150.00), "2024-10-15 08:30:00"))],
            ..Default::default()
        };
        let enriched = process_row(&mut store, cutoff(), request(None, Some("42"))).unwrap();
        assert_eq!(enriched.report.last_balance_snapshot, Some(dec!(150.00)));
        assert_eq!(
            enriched.report.last_transaction_date,
            Some("2024-10-15".into())
        );
    }

    #[test]
    fn padded_code_is_echoed_as_written() {
        let mut store = store();
        let enriched =
            process_row(&mut store, cutoff(), request(Some(" ABC123 "), None)).unwrap();
        assert_eq!(enriched.report.unique_code, Some(" ABC123 ".into()));
        assert_eq!(enriched.report.user_id, Some("42".into()));
        assert_eq!(store.queries[0], ("vendoritems", "ABC123".to_owned()));
    }

    #[test]
    fn blank_code_is_echoed_but_not_looked_up() {
        let mut store = store();
        let enriched = process_row(&mut store, cutoff(), request(Some("   "), None)).unwrap();
        assert_eq!(
            enriched.report,
            BalanceReport {
                unique_code: Some("   ".into()),
                ..Default::default()
            }
        );
        assert_eq!(enriched.code_lookup, None);
        assert!(store.queries.is_empty());
    }

    #[test]
    fn nothing_to_go_on() {
        let mut store = store();
        let enriched = process_row(&mut store, cutoff(), request(None, None)).unwrap();
        assert_eq!(enriched.report, BalanceReport::default());
        assert!(store.queries.is_empty());
    }

    #[test]
    fn null_columns_stay_empty() {
        let mut store = MemoryStore {
            wallets: vec![("5".into(), Default::default())],
            ..Default::default()
        };
        let enriched = process_row(&mut store, cutoff(), request(None, Some("5"))).unwrap();
        assert_eq!(enriched.report, BalanceReport::default());
        assert_eq!(enriched.source, Some(CurrentBalance));
    }
}
