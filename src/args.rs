use std::path::PathBuf;

use structopt::clap::AppSettings;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
name = "RlsRepair",
version = env ! ("CARGO_PKG_VERSION"),
about = "Applies corrective row-level security SQL to a hosted database service and verifies the result through privileged and unprivileged clients.",
setting = AppSettings::ColoredHelp,
)]
pub struct Args {
    /// Activate verbose mode
    #[structopt(short = "v", long = "verbose")]
    pub verbose: bool,

    /// Activate quiet mode
    #[structopt(short = "q", long = "quiet")]
    pub quiet: bool,

    /// Configuration file
    #[structopt(short = "c", long = "config", parse(from_os_str), default_value = "config.toml")]
    pub config: PathBuf,

    /// Migration source, overrides the configured one
    #[structopt(short = "m", long = "migration", parse(from_os_str))]
    pub migration: Option<PathBuf>,

    /// Apply the migration without running verification probes
    #[structopt(short = "s", long = "skip-verification")]
    pub skip_verification: bool,

    /// Only diagnose access to the configured collections, change nothing
    #[structopt(short = "d", long = "diagnose")]
    pub diagnose: bool,

    /// Print reports as JSON on stdout
    #[structopt(long = "json")]
    pub json: bool,
}
