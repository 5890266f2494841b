//! synd-post - Syndicate a saved blog post to Bluesky
//!
//! Reads a post snapshot as JSON (from a file argument or stdin), runs it
//! through the publish gate and submits it when it qualifies.

use clap::Parser;
use libsyndicast::logging::LoggingConfig;
use libsyndicast::service::PostSavedOutcome;
use libsyndicast::{PostSnapshot, Result, SyndicastError, SyndicastService};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "synd-post")]
#[command(version)]
#[command(about = "Syndicate a saved blog post to Bluesky")]
#[command(long_about = "\
synd-post - Syndicate a saved blog post to Bluesky

Call this whenever the blog saves a post. Posts that are not published,
not of an allowed type, published before activation, or already attempted
are skipped; everything else is sent once.

INPUT:
    {
      \"id\": \"42\",
      \"post_type\": \"post\",
      \"status\": \"publish\",
      \"title\": \"Hello\",
      \"permalink\": \"https://example.com/hello\",
      \"published_at_gmt\": \"2024-05-01 12:00:00\"
    }

EXIT CODES:
    0 - Post handled (sent, skipped, or no session)
    1 - Local error (config, database)
    3 - Invalid input
")]
struct Cli {
    /// Post snapshot JSON file (reads from stdin if not provided)
    file: Option<PathBuf>,

    /// Print the record that would be sent, without sending it
    #[arg(long)]
    preview: bool,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct OutcomeReport<'a> {
    post_id: &'a str,
    result: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env(cli.verbose).init();

    if let Err(e) = run(cli).await {
        error!("synd-post failed: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    if cli.format != "text" && cli.format != "json" {
        return Err(SyndicastError::InvalidInput(format!(
            "Unknown format '{}'. Use 'text' or 'json'.",
            cli.format
        )));
    }

    let post = read_post(cli.file.as_ref())?;
    let service = SyndicastService::new().await?;

    if cli.preview {
        let record = service.preview(&post);
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| SyndicastError::InvalidInput(format!("Cannot encode record: {}", e)))?;
        println!("{}", json);
        return Ok(());
    }

    let outcome = service.on_post_saved(&post).await;
    if let PostSavedOutcome::Failed(message) = &outcome {
        error!(post_id = %post.id, "synd-post failed: {}", message);
        eprintln!("Error: could not process post {}: {}", post.id, message);
        std::process::exit(1);
    }

    print_outcome(&post, &outcome, &cli.format)
}

fn read_post(file: Option<&PathBuf>) -> Result<PostSnapshot> {
    let content = match file {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            SyndicastError::InvalidInput(format!("Cannot read {}: {}", path.display(), e))
        })?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| SyndicastError::InvalidInput(format!("Cannot read stdin: {}", e)))?;
            buffer
        }
    };

    serde_json::from_str(&content)
        .map_err(|e| SyndicastError::InvalidInput(format!("Invalid post JSON: {}", e)))
}

fn print_outcome(post: &PostSnapshot, outcome: &PostSavedOutcome, format: &str) -> Result<()> {
    let report = match outcome {
        PostSavedOutcome::Skipped(reason) => OutcomeReport {
            post_id: &post.id,
            result: "skipped",
            reason: Some(reason.to_string()),
            outcome: None,
            body: None,
        },
        PostSavedOutcome::Aborted => OutcomeReport {
            post_id: &post.id,
            result: "aborted",
            reason: Some("no valid Bluesky session".to_string()),
            outcome: None,
            body: None,
        },
        PostSavedOutcome::Attempted(status) => OutcomeReport {
            post_id: &post.id,
            result: "attempted",
            reason: None,
            outcome: Some(status.outcome.as_str()),
            body: Some(&status.body),
        },
        PostSavedOutcome::Failed(_) => return Ok(()),
    };

    if format == "json" {
        let json = serde_json::to_string(&report)
            .map_err(|e| SyndicastError::InvalidInput(format!("Cannot encode outcome: {}", e)))?;
        println!("{}", json);
        return Ok(());
    }

    match (report.outcome, report.reason) {
        (Some(outcome), _) => println!("{}: {} {}", outcome, report.post_id, report.body.unwrap_or("")),
        (None, Some(reason)) => println!("{}: {} ({})", report.result, report.post_id, reason),
        (None, None) => println!("{}: {}", report.result, report.post_id),
    }

    Ok(())
}
