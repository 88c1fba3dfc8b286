use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "dbcollect",
    about = "Run one SQL query against many database hosts and merge the rows into one CSV"
)]
pub struct Cli {
    /// Path to the workload file (JSON, or TOML with a .toml extension)
    #[arg(
        short = 'w',
        long,
        env = "DBCOLLECT_WORKLOAD",
        default_value = "workload.json"
    )]
    pub workload: PathBuf,

    /// Log per-target diagnostics at debug level
    #[arg(short = 'v', long, env = "DBCOLLECT_VERBOSE")]
    pub verbose: bool,

    /// Disable credential masking in logs
    #[arg(long, env = "DBCOLLECT_SHOW_SECRETS")]
    pub show_secrets: bool,
}
