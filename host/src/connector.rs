//! Seam for issuing attach/detach statements against an instance.
//!
//! No ODBC binding ships with this crate. Callers plug in their own driver
//! layer by implementing [`SqlConnector`].

use std::fmt;

/// Which layer a [`DriverError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// The database engine rejected the statement. The message follows the
    /// ODBC `[state] [driver]description (code) (command)` shape.
    Database,
    /// Anything else: connecting, driver loading, I/O.
    Other,
}

/// Failure reported by a [`SqlConnector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    pub kind: DriverErrorKind,
    pub message: String,
}

impl DriverError {
    pub fn database(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Database,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Other,
            message: message.into(),
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for DriverError {}

/// Opens a connection with `connection_string`, runs `sql` with autocommit
/// on, and closes the connection again.
pub trait SqlConnector {
    fn execute(&self, connection_string: &str, sql: &str) -> Result<(), DriverError>;
}

/// Statement attaching `path` as database `database`, rebuilding a missing
/// log file.
pub fn attach_sql(database: &str, path: &str) -> String {
    format!("CREATE DATABASE [{database}] ON (FILENAME=N'{path}') FOR ATTACH_REBUILD_LOG")
}

/// Statement taking `database` offline and detaching it.
pub fn detach_sql(database: &str) -> String {
    format!(
        "ALTER DATABASE [{database}] SET OFFLINE; USE master EXEC sp_detach_db @dbname = N'{database}';"
    )
}
