mod output;
mod run;

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ntfy-csv-reminders",
    about = "Probabilistic recurring reminders from a CSV file, pushed through ntfy",
    version
)]
pub struct Cli {
    /// ntfy topic, or a full URL to post notifications to
    #[arg(env = "NTFY_REMINDERS_TOPIC")]
    pub topic: String,

    /// Reminder catalog: one `<interval_days>,<task>` per line
    #[arg(long, default_value = reminders_core::config::DEFAULT_CATALOG_FILE)]
    pub input_csv: PathBuf,

    /// Firing history file (created if missing)
    #[arg(long, default_value = reminders_core::config::DEFAULT_HISTORY_FILE)]
    pub states_path: PathBuf,

    /// Ask ntfy to deliver each notification after a random 0..DELAY seconds
    #[arg(long, default_value = "0", value_name = "SECS")]
    pub delay: u64,

    /// Sleep a random 0..SECS seconds before doing anything
    #[arg(long, default_value = "0", value_name = "SECS")]
    pub startup_jitter: u64,

    /// Minimum seconds between two notifications of the same run
    #[arg(
        long,
        default_value_t = reminders_core::config::DEFAULT_MIN_DISPATCH_SPACING_SECS,
        value_name = "SECS"
    )]
    pub min_spacing: u64,

    /// Include chance/threshold detail in notifications and log at debug level
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Also add every reminder to a CalDAV task list (CALDAV_TASKS_API_* env vars)
    #[arg(long)]
    pub also_add_to_caldav: bool,

    /// Print the run summary as JSON
    #[arg(long, short = 'j')]
    pub json: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run::run(&cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
