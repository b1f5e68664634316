use std::process::ExitCode;

use clap::Parser;
use config::Cli;
use logging::init_logging;
use pipeline::run;
use tracing::{error, info};

mod compute;
mod config;
mod data;
mod date;
mod logging;
mod pipeline;
mod read;
mod resolve;
mod store;
mod write;

fn main() -> ExitCode {
    // A missing .env file is fine; the variables may come from elsewhere.
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbosity.tracing_level_filter(), cli.log_format);

    let settings = cli.settings();
    match run(&settings) {
        Ok(summary) => {
            info!(
                output = %settings.output.display(),
                rows = summary.rows,
                codes_resolved = summary.codes_resolved,
                codes_unmatched = summary.codes_unmatched,
                from_history = summary.from_history,
                from_current = summary.from_current,
                without_balance = summary.without_balance,
                "processing complete, updated file saved"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("an error occurred: {e:#}");
            ExitCode::FAILURE
        }
    }
}
