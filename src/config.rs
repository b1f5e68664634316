//! Command line and environment configuration.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Args, Parser};
use clap_verbosity_flag::{InfoLevel, Verbosity};

use crate::{data::DEFAULT_CUTOFF, logging::LogFormat};

const DEFAULT_INPUT: &str = "Balance-Request updated.csv";
const OUTPUT_SUFFIX: &str = "_output.csv";

#[derive(Debug, Parser)]
#[command(
    name = "balance-enricher",
    version,
    about = "Fill a CSV of balance requests with wallet balances from the database"
)]
pub struct Cli {
    /// CSV file with `unique_code` and/or `user_id` columns.
    #[arg(value_name = "INPUT", default_value = DEFAULT_INPUT)]
    pub input: PathBuf,

    /// Where to write the enriched CSV [default: <INPUT stem>_output.csv].
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Ignore wallet transactions dated after this day (YYYY-MM-DD).
    #[arg(long, env = "BALANCE_CUTOFF", default_value = DEFAULT_CUTOFF)]
    pub cutoff: NaiveDate,

    #[command(flatten)]
    pub database: DatabaseSettings,

    /// Adjust log verbosity (-v for debug, -q for warnings only).
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "pretty")]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Args)]
pub struct DatabaseSettings {
    /// Database server host.
    #[arg(long = "db-host", env = "BALANCE_DB_HOST", default_value = "localhost")]
    pub host: String,

    /// Database server port.
    #[arg(long = "db-port", env = "BALANCE_DB_PORT", default_value_t = 3306)]
    pub port: u16,

    /// Database user.
    #[arg(long = "db-user", env = "BALANCE_DB_USER")]
    pub user: String,

    /// Database password.
    #[arg(
        long = "db-password",
        env = "BALANCE_DB_PASSWORD",
        default_value = "",
        hide_env_values = true,
        hide_default_value = true
    )]
    pub password: String,

    /// Database (schema) holding the wallet tables.
    #[arg(long = "db-name", env = "BALANCE_DB_NAME")]
    pub name: String,
}

/// Everything a run needs, with defaults resolved.
#[derive(Debug, Clone)]
pub struct Settings {
    pub input: PathBuf,
    pub output: PathBuf,
    pub cutoff: NaiveDate,
    pub database: DatabaseSettings,
}

impl Cli {
    pub fn settings(&self) -> Settings {
        Settings {
            output: self
                .output
                .clone()
                .unwrap_or_else(|| default_output(&self.input)),
            input: self.input.clone(),
            cutoff: self.cutoff,
            database: self.database.clone(),
        }
    }
}

/// `dir/name.csv` becomes `dir/name_output.csv`.
fn default_output(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{stem}{OUTPUT_SUFFIX}"))
}
