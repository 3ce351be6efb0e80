//! Error types for host-side LocalDB operations.
//!
//! Covers everything that can go wrong between a typed request and a parsed
//! record: platform and executable availability, the child process itself,
//! the instance directory, driver lookup, attach/detach and configuration.

use localdb_core::{CommandError, LocalDbError};
use thiserror::Error;

/// Errors that can occur while managing LocalDB instances.
#[derive(Debug, Error)]
pub enum HostError {
    /// The tool only exists on Windows.
    #[error("SqlLocalDB only runs on Windows (current platform: {0})")]
    UnsupportedPlatform(&'static str),

    /// No SqlLocalDB executable was found on this host.
    #[error("SqlLocalDB executable is not installed or could not be found")]
    ExecutableUnavailable,

    /// The executable ran and exited unsuccessfully.
    #[error("`{command}` failed ({}): {message}", exit_label(.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        message: String,
    },

    /// The executable did not exit within the configured timeout.
    #[error("`{command}` did not finish within {seconds}s")]
    TimedOut { command: String, seconds: u64 },

    /// The instance is unknown to both the directory and the tool.
    #[error("LocalDB instance not found: {0}")]
    KeyNotFound(String),

    /// None of the installed drivers can connect to LocalDB.
    #[error("no LocalDB-compatible ODBC driver is installed")]
    NoCompatibleDriver,

    /// Request building or output parsing failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Attach/detach failure, possibly with a suggested remedy.
    #[error(transparent)]
    LocalDb(#[from] LocalDbError),

    /// Process or file I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Convenience alias for results with [`HostError`].
pub type Result<T> = std::result::Result<T, HostError>;
