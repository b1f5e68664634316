use crate::data::{BalanceReport, Error, OUTPUT_COLUMNS};

/// Streaming CSV exporter for `BalanceReport`s. The header goes out as soon
/// as the writer exists and every row is flushed as it is written, so a run
/// that dies halfway leaves every finished row on disk.
pub(crate) struct ReportWriter<W: std::io::Write> {
    wtr: csv::Writer<W>,
}

impl<W: std::io::Write> ReportWriter<W> {
    pub fn new(writer: W) -> Result<Self, Error> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        wtr.write_record(OUTPUT_COLUMNS)?;
        wtr.flush()?;
        Ok(Self { wtr })
    }

    pub fn write(&mut self, report: &BalanceReport) -> Result<(), Error> {
        self.wtr.serialize(report)?;
        self.wtr.flush()?;
        Ok(())
    }
}
