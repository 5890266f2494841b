//! Logging setup shared by the Syndicast binaries
//!
//! Everything goes to stderr; stdout is reserved for command output so it
//! can be piped. Two environment variables control the output:
//!
//! - `SYNDICAST_LOG_FORMAT`: `text` (default) or `json`
//! - `SYNDICAST_LOG_LEVEL`: an `EnvFilter` directive, default `info`
//!
//! A binary's `--verbose` flag forces `debug`.
//!
//! ```no_run
//! libsyndicast::logging::LoggingConfig::from_env(false).init();
//! tracing::info!("ready");
//! ```

use std::str::FromStr;
use tracing_subscriber::EnvFilter;

pub const FORMAT_ENV: &str = "SYNDICAST_LOG_FORMAT";
pub const LEVEL_ENV: &str = "SYNDICAST_LOG_LEVEL";

const DEFAULT_LEVEL: &str = "info";
const VERBOSE_LEVEL: &str = "debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Plain single-line text, no colors
    Text,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: '{}'. Use text or json", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Filter directive handed to `EnvFilter`
    pub directive: String,
}

impl LoggingConfig {
    /// Read the format and level from the environment
    ///
    /// An unknown format falls back to text rather than failing startup.
    pub fn from_env(verbose: bool) -> Self {
        let format = std::env::var(FORMAT_ENV)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(LogFormat::Text);

        let directive = if verbose {
            VERBOSE_LEVEL.to_string()
        } else {
            std::env::var(LEVEL_ENV)
                .ok()
                .filter(|level| !level.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
        };

        Self { format, directive }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
    }

    /// Install the global subscriber
    ///
    /// A second call is a no-op: the first subscriber stays in place.
    pub fn init(&self) {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(self.filter())
            .with_writer(std::io::stderr);

        let result = match self.format {
            LogFormat::Json => builder.json().flatten_event(true).try_init(),
            LogFormat::Text => builder.with_ansi(false).with_target(false).try_init(),
        };

        if result.is_err() {
            tracing::debug!("Logging already initialized");
        }
    }
}
