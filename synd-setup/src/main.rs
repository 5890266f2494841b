//! synd-setup - Connect Syndicast to Bluesky and manage its lifecycle
//!
//! Operator surface over `SyndicastService`: writes the config file, records
//! activation, schedules or cancels the daily refresh, stores login details
//! and reports the connection state.

use anyhow::Result;
use clap::{Parser, Subcommand};
use libsyndicast::config::{resolve_config_path, Config};
use libsyndicast::logging::LoggingConfig;
use libsyndicast::service::StatusReport;
use libsyndicast::session::SessionOutcome;
use libsyndicast::{SyndicastError, SyndicastService};
use secrecy::SecretString;
use std::io::{self, Write};
use tracing::error;

#[derive(Parser)]
#[command(name = "synd-setup")]
#[command(version)]
#[command(about = "Connect Syndicast to Bluesky and manage its lifecycle", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Record the activation time and schedule the daily session refresh
    Activate,

    /// Cancel the daily session refresh
    Deactivate,

    /// Store Bluesky login details and open a session
    Connect {
        /// Handle or email used to sign in
        #[arg(long)]
        identifier: String,

        /// PDS base URL (default: the configured domain)
        #[arg(long)]
        domain: Option<String>,

        /// Read the app password from stdin (for automation)
        #[arg(long)]
        stdin: bool,
    },

    /// Show the connection and schedule state
    Status {
        /// Output format (text or json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env(cli.verbose).init();

    if let Err(e) = run(cli).await {
        error!("synd-setup failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<SyndicastError>()
            .map(SyndicastError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { force } => init_config(force),
        Commands::Activate => {
            let service = SyndicastService::new().await?;
            service.on_activate(chrono::Utc::now()).await?;
            println!("activated");
            Ok(())
        }
        Commands::Deactivate => {
            let service = SyndicastService::new().await?;
            service.on_deactivate().await?;
            println!("deactivated");
            Ok(())
        }
        Commands::Connect {
            identifier,
            domain,
            stdin,
        } => connect(&identifier, domain.as_deref(), stdin).await,
        Commands::Status { format } => show_status(&format).await,
    }
}

fn init_config(force: bool) -> Result<()> {
    let path = resolve_config_path()?;

    if path.exists() && !force {
        anyhow::bail!(
            "Configuration already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    Config::default().save_to_path(&path)?;
    println!("✓ Wrote configuration to {}", path.display());
    Ok(())
}

async fn connect(identifier: &str, domain: Option<&str>, use_stdin: bool) -> Result<()> {
    let password = read_password(use_stdin)?;
    let service = SyndicastService::new().await?;

    match service.connect(domain, identifier, password).await? {
        SessionOutcome::Established { did } => {
            println!("✓ Connected as {}", did);
            Ok(())
        }
        SessionOutcome::Failed(e) => Err(SyndicastError::Xrpc(e).into()),
        // Refreshed never comes out of session creation
        other => anyhow::bail!("No session established: {:?}", other),
    }
}

/// Prompt for the app password, or read one line from stdin when piped
fn read_password(use_stdin: bool) -> Result<SecretString> {
    let password = if use_stdin || !atty::is(atty::Stream::Stdin) {
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        input.trim_end_matches(['\r', '\n']).to_string()
    } else {
        print!("Bluesky app password: ");
        io::stdout().flush()?;
        rpassword::read_password()?
    };

    if password.is_empty() {
        return Err(SyndicastError::InvalidInput("password cannot be empty".to_string()).into());
    }

    Ok(SecretString::from(password))
}

async fn show_status(format: &str) -> Result<()> {
    let service = SyndicastService::new().await?;
    let report = service.status().await?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "text" => print_status(&report),
        other => {
            return Err(SyndicastError::InvalidInput(format!(
                "Unknown format '{}'. Use 'text' or 'json'.",
                other
            ))
            .into())
        }
    }

    Ok(())
}

fn print_status(report: &StatusReport) {
    fn yes_no(flag: bool) -> &'static str {
        if flag {
            "yes"
        } else {
            "no"
        }
    }

    let or_dash = |value: &str| {
        if value.is_empty() {
            "-".to_string()
        } else {
            value.to_string()
        }
    };

    println!("Domain:           {}", report.domain);
    println!("Identifier:       {}", or_dash(&report.identifier));
    println!("DID:              {}", or_dash(&report.did));
    println!("Session valid:    {}", yes_no(report.session_valid));
    println!("Access token:     {}", yes_no(report.has_access_token));
    println!("Refresh token:    {}", yes_no(report.has_refresh_token));
    println!("Password pending: {}", yes_no(report.password_pending));
    println!(
        "Activated:        {}",
        report
            .activated_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string())
    );
    println!(
        "Next refresh:     {}",
        report
            .next_refresh
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "not scheduled".to_string())
    );
    println!("Store:            {}", report.store_backend);
}
