//! Error types for Syndicast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyndicastError>;

#[derive(Error, Debug)]
pub enum SyndicastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("XRPC error: {0}")]
    Xrpc(#[from] XrpcError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SyndicastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            SyndicastError::InvalidInput(_) | SyndicastError::Validation(_) => 3,
            SyndicastError::Xrpc(e) if e.is_auth_failure() => 2,
            SyndicastError::Xrpc(_) => 1,
            SyndicastError::Config(_) => 1,
            SyndicastError::Database(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Corrupt row in {table}: {reason}")]
    CorruptRow { table: &'static str, reason: String },
}

/// Failures talking to the remote XRPC endpoints.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XrpcError {
    /// The request never produced an HTTP response (DNS, connect, timeout).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The PDS answered with a status of 300 or above.
    #[error("Remote returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// A 2xx answer that lacks the fields the call requires.
    #[error("Incomplete response: {0}")]
    Incomplete(String),
}

impl XrpcError {
    /// True when the remote refused the credentials outright
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, XrpcError::Status { status: 401 | 403, .. })
    }
}
