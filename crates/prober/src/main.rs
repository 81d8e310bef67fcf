use clap::Parser;
use serverstat_common::logging::init_logging;
use serverstat_common::signal::shutdown_signal;
use serverstat_common::version::VERSION;
use serverstat_common::Settings;
use serverstat_prober::{run_from_config, Scheduler, StoreMode};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// One week.
const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

#[derive(Parser, Debug)]
#[command(author, version = VERSION, about = "Probes configured endpoints and records their availability", long_about = None)]
struct Args {
    /// Path to the settings file
    #[arg(short, long, default_value = "settings.yaml")]
    config: PathBuf,

    /// Minutes between probe cycles
    #[arg(
        long,
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..=MAX_INTERVAL_MINUTES)
    )]
    interval_minutes: u64,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Log results instead of writing them to the database
    #[arg(long)]
    dry_run: bool,

    /// Directory for the rolling JSON log files
    #[arg(long, default_value = "logs")]
    log_dir: String,
}

fn cycle_period(minutes: u64) -> Duration {
    Duration::from_secs(minutes.clamp(1, MAX_INTERVAL_MINUTES) * 60)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let args = Args::parse();

    init_logging(&args.log_dir, "prober.log");
    info!(version = VERSION, "Starting prober...");

    // Broken settings stop the process before anything touches the network.
    // Later cycles re-read the file on their own.
    if let Err(e) = Settings::load(&args.config) {
        error!(path = ?args.config, error = %e, "Critical error loading settings. Exiting.");
        return Err(e.into());
    }

    let mode = if args.dry_run {
        StoreMode::Memory
    } else {
        StoreMode::Postgres
    };

    if args.once {
        let report = run_from_config(&args.config, mode).await?;
        info!(?report, "Single cycle finished.");
        return Ok(());
    }

    let config_path = Arc::new(args.config);
    let period = cycle_period(args.interval_minutes);
    let stats = Scheduler::new(period)
        .run(
            move || {
                let config_path = Arc::clone(&config_path);
                async move {
                    if let Err(e) = run_from_config(&config_path, mode).await {
                        error!(error = %e, "Probe cycle aborted.");
                    }
                }
            },
            shutdown_signal(),
        )
        .await;

    info!(
        started = stats.started,
        skipped = stats.skipped,
        "Prober stopped."
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_defaults_to_an_hour() {
        let args = Args::try_parse_from(["serverstat-prober"]).unwrap();
        assert_eq!(cycle_period(args.interval_minutes), Duration::from_secs(3600));
    }

    #[test]
    fn test_interval_bounds_are_enforced() {
        for value in ["0", "10081", "18446744073709551615"] {
            let parsed = Args::try_parse_from(["serverstat-prober", "--interval-minutes", value]);
            assert!(parsed.is_err(), "accepted --interval-minutes {value}");
        }

        let args =
            Args::try_parse_from(["serverstat-prober", "--interval-minutes", "10080"]).unwrap();
        assert_eq!(cycle_period(args.interval_minutes), Duration::from_secs(10080 * 60));
    }

    #[test]
    fn test_cycle_period_never_overflows() {
        assert_eq!(cycle_period(u64::MAX), Duration::from_secs(MAX_INTERVAL_MINUTES * 60));
        assert_eq!(cycle_period(0), Duration::from_secs(60));
    }
}
