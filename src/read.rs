use crate::data::{BalanceRequest, Error};

/// Something to do with each `BalanceRequest` read from the input file. The
/// pipeline enriches and writes them out; tests just collect them.
pub(crate) trait RequestHandler {
    fn handle(&mut self, request: BalanceRequest) -> Result<(), Error>;
}

/// Stream `BalanceRequest`s from CSV into `handler`, in file order. Header
/// names are trimmed, field values are not. The first error from either side
/// stops the stream.
pub(crate) fn read_requests<R: std::io::Read, H: RequestHandler>(
    reader: R,
    handler: &mut H,
) -> Result<(), Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);
    for result in rdr.deserialize() {
        let request: BalanceRequest = result?;
        handler.handle(request)?;
    }
    Ok(())
}
