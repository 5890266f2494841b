//! synd-refresh - Background daemon for the daily session refresh
//!
//! Wakes up every poll interval and refreshes the Bluesky session when the
//! persisted schedule says it is due. Stops once the schedule is cancelled.

use clap::Parser;
use libsyndicast::logging::LoggingConfig;
use libsyndicast::service::TickOutcome;
use libsyndicast::{Result, SyndicastService};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

#[derive(Parser, Debug)]
#[command(name = "synd-refresh")]
#[command(version)]
#[command(about = "Background daemon for the daily Bluesky session refresh")]
#[command(long_about = "\
synd-refresh - Background daemon for the daily Bluesky session refresh

DESCRIPTION:
    synd-refresh keeps the stored Bluesky session alive by exchanging the
    refresh token for a new token pair once per refresh interval.

    The schedule lives in the database: `synd-setup activate` starts it,
    `synd-setup deactivate` cancels it, and the daemon exits when it finds
    the schedule cancelled.

USAGE:
    # Run in foreground (logs to stderr)
    synd-refresh

    # Check more often than the configured poll interval
    synd-refresh --poll-interval 10

    # Single tick, then exit (cron-friendly)
    synd-refresh --once

SIGNALS:
    SIGTERM, SIGINT - Graceful shutdown (finishes the current tick)

CONFIGURATION:
    [schedule]
    refresh_interval = \"1d\"   # time between refreshes
    poll_interval = \"60s\"     # how often the daemon wakes up

EXIT CODES:
    0 - Clean shutdown, or schedule cancelled
    1 - Runtime error
")]
struct Cli {
    /// Poll interval in seconds (overrides config)
    #[arg(long, value_name = "SECONDS")]
    poll_interval: Option<u64>,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Run a single tick and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env(cli.verbose).init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let service = SyndicastService::new().await?;

    if cli.once {
        let outcome = tick(&service).await?;
        report(&outcome);
        return Ok(());
    }

    let poll_interval = match cli.poll_interval {
        Some(seconds) => Duration::from_secs(seconds.max(1)),
        None => service.config().schedule.poll_interval()?,
    };

    info!("synd-refresh daemon starting");
    info!("Poll interval: {}s", poll_interval.as_secs());

    let shutdown = Arc::new(AtomicBool::new(false));
    setup_signal_handlers(shutdown.clone())?;

    run_daemon_loop(&service, poll_interval, shutdown).await;

    info!("synd-refresh daemon stopped");
    Ok(())
}

async fn tick(service: &SyndicastService) -> Result<TickOutcome> {
    service.on_refresh_tick(chrono::Utc::now()).await
}

fn report(outcome: &TickOutcome) {
    match outcome {
        TickOutcome::NotScheduled => println!("not scheduled"),
        TickOutcome::NotDue(next) => println!("not due until {}", next.to_rfc3339()),
        TickOutcome::Refreshed { outcome, next_run } => {
            println!("refreshed ({:?}), next run {}", outcome, next_run.to_rfc3339())
        }
    }
}

/// Set up signal handlers for graceful shutdown
#[cfg(unix)]
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).map_err(|e| {
        libsyndicast::SyndicastError::InvalidInput(format!("Signal setup failed: {}", e))
    })?;

    std::thread::spawn(move || {
        if signals.forever().next().is_some() {
            info!("Received shutdown signal, stopping gracefully...");
            shutdown.store(true, Ordering::Relaxed);
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn setup_signal_handlers(_shutdown: Arc<AtomicBool>) -> Result<()> {
    Ok(())
}

async fn run_daemon_loop(service: &SyndicastService, poll_interval: Duration, shutdown: Arc<AtomicBool>) {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("Shutdown requested, stopping daemon loop");
            break;
        }

        match tick(service).await {
            Ok(TickOutcome::NotScheduled) => {
                info!("Session refresh is not scheduled, exiting");
                break;
            }
            Ok(TickOutcome::NotDue(next)) => debug!(next_run = %next, "Refresh not due yet"),
            Ok(TickOutcome::Refreshed { .. }) => {}
            Err(e) => error!("Error running refresh tick: {}", e),
        }

        // Sleep until next poll (check shutdown every second)
        for _ in 0..poll_interval.as_secs().max(1) {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            sleep(Duration::from_secs(1)).await;
        }
    }
}
