use crate::{
    compute::Enricher,
    config::Settings,
    data::{Error, RunSummary},
    read::read_requests,
    store::{LedgerStore, MySqlStore},
    write::ReportWriter,
};
use anyhow::Context;
use chrono::NaiveDate;
use std::fs::File;
use tracing::{info, warn};

/// Enrich every request from `reader` into `sink`, one row at a time.
pub(crate) fn enrich<R: std::io::Read, W: std::io::Write, S: LedgerStore>(
    reader: R,
    store: &mut S,
    sink: &mut ReportWriter<W>,
    cutoff: NaiveDate,
) -> Result<RunSummary, Error> {
    let mut enricher = Enricher::new(store, sink, cutoff);
    read_requests(reader, &mut enricher)?;
    Ok(enricher.summary())
}

/// Run the whole job described by `settings`.
///
/// The output header is on disk before the database is contacted, and the
/// connection is closed whether or not the rows went through. Rows written
/// before a failure stay in the output.
pub fn run(settings: &Settings) -> anyhow::Result<RunSummary> {
    info!(
        input = %settings.input.display(),
        output = %settings.output.display(),
        cutoff = %settings.cutoff,
        "enriching balance requests"
    );
    let input = File::open(&settings.input)
        .with_context(|| format!("cannot open input file '{}'", settings.input.display()))?;
    let output = File::create(&settings.output)
        .with_context(|| format!("cannot create output file '{}'", settings.output.display()))?;
    let mut sink = ReportWriter::new(output).context("cannot write output header")?;

    let db = &settings.database;
    let mut store = MySqlStore::connect(db).with_context(|| {
        format!(
            "cannot connect to database '{}' at {}:{}",
            db.name, db.host, db.port
        )
    })?;
    let result = enrich(input, &mut store, &mut sink, settings.cutoff);
    if let Err(e) = store.close() {
        warn!("database connection did not close cleanly: {e}");
    }
    let summary = result.context("processing aborted")?;
    Ok(summary)
}
