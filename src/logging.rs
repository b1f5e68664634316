//! Operator-facing output goes through `tracing`, rendered on stderr so it
//! never mixes with CSV data.
//!
//! - `error`: the run was aborted
//! - `warn`: recoverable oddities such as an unparseable date
//! - `info`: start and completion of the run
//! - `debug`: which lookup answered for each row

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Multi-line human-readable output.
    #[default]
    Pretty,
    /// Single-line output.
    Compact,
    /// JSON lines for log collectors.
    Json,
}

/// Install the global subscriber. `RUST_LOG`, when set, refines `level`.
pub fn init_logging(level: LevelFilter, format: LogFormat) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry.with(layer.pretty()).init(),
        LogFormat::Compact => registry.with(layer.compact()).init(),
        LogFormat::Json => registry.with(layer.json()).init(),
    }
}
