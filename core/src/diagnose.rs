//! Translation of SQL Server driver messages into actionable errors.
//!
//! Drivers report engine failures as one line of the form
//!
//! ```text
//! [42000] [Microsoft][ODBC Driver 17 for SQL Server][SQL Server]Unable to open the physical file "C:\db.mdf". (5120) (SQLExecDirectW)
//! ```
//!
//! [`translate_error`] pulls the SQL state, driver, description, numeric
//! code and driver call out of such a line and picks a [`Remedy`] for the
//! codes seen when attaching database files. Anything it cannot parse is
//! left to the caller as a raw message; translation is advisory only.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static SQL_ERROR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\[(?P<state>.*?)\] (?P<driver>\[.*\])(?P<desc>.*?) \((?P<code>[0-9]+?)\) \((?P<cmd>.+?)\)",
    )
    .expect("static regex must compile")
});

const CONNECTIVITY_MARKER: &str = "Server does not exist or access denied";

/// Fields extracted from a driver error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlErrorDetails {
    pub sql_state: String,
    pub driver: String,
    pub description: String,
    pub code: u32,
    pub command: String,
}

impl SqlErrorDetails {
    /// One-line summary, e.g. `SQL Server failed with error 5120.`
    pub fn short_description(&self) -> String {
        format!("SQL Server failed with error {}.", self.code)
    }

    /// Multi-line description listing driver, state, code and the engine's
    /// own text.
    pub fn long_description(&self) -> String {
        format!(
            "  SQL Driver:     {}\n  SQL state code: {}\n  Error code:     {}\n\n\
             Long description\n----------------\n{}\n",
            self.driver, self.sql_state, self.code, self.description
        )
    }

    pub fn remedy(&self) -> Remedy {
        Remedy::for_error(self.code, &self.description)
    }
}

/// Known causes of attach failures, each with a suggested fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Remedy {
    /// Codes 5120, 5121, 5123, 5133.
    AccessDenied,
    /// Code 823.
    CorruptFile,
    /// Code 5118.
    CompressedFolder,
    /// The server could not be reached at all.
    ServerUnreachable,
    NoKnownSolution,
}

impl Remedy {
    pub fn for_error(code: u32, description: &str) -> Self {
        match code {
            5120 | 5121 | 5123 | 5133 => Self::AccessDenied,
            823 => Self::CorruptFile,
            5118 => Self::CompressedFolder,
            _ if description.contains(CONNECTIVITY_MARKER) => Self::ServerUnreachable,
            _ => Self::NoKnownSolution,
        }
    }

    pub fn solution(self) -> &'static str {
        match self {
            Self::AccessDenied => {
                "This SQL Server MDF file is NOT attachable. Possible solutions:\n  \
                 1. Ensure you have full read/write access to the MDF file AND its parent folder.\n  \
                 2. Check the file is not already attached to another instance.\n  \
                 3. Delete the corresponding LDF file.\n  \
                 4. Copy the MDF file to a new location.\n"
            }
            Self::CorruptFile => {
                "The MDF file is corrupt or not a genuine database file. Try to \
                 re-create the current file or use a different file."
            }
            Self::CompressedFolder => {
                "SQL Server cannot read MDF files in compressed folders. Ensure the \
                 target folder is not compressed, or edit the folder properties to \
                 uncompress it and its contents."
            }
            Self::ServerUnreachable => {
                "Could not access SQL Server on your computer. Install SQL Server \
                 Express LocalDB (2014 or later) and check the instance is running."
            }
            Self::NoKnownSolution => "No known solutions available.",
        }
    }
}

impl fmt::Display for Remedy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.solution())
    }
}

/// Parses a driver error message, returning `None` when it does not follow
/// the `[state] [driver]... description (code) (call)` layout.
///
/// # Examples
///
/// ```
/// use localdb_core::{Remedy, translate_error};
///
/// let msg = "[42000] [Microsoft][ODBC Driver 13 for SQL Server][SQL Server]Database 'x' cannot be opened. (823) (SQLExecDirectW)";
/// let details = translate_error(msg).unwrap();
/// assert_eq!(details.code, 823);
/// assert_eq!(details.remedy(), Remedy::CorruptFile);
///
/// assert!(translate_error("connection reset").is_none());
/// ```
pub fn translate_error(message: &str) -> Option<SqlErrorDetails> {
    let caps = SQL_ERROR_RE.captures(message)?;
    Some(SqlErrorDetails {
        sql_state: caps.name("state")?.as_str().to_string(),
        driver: caps.name("driver")?.as_str().trim().to_string(),
        description: caps.name("desc")?.as_str().trim().to_string(),
        code: caps.name("code")?.as_str().parse().ok()?,
        command: caps.name("cmd")?.as_str().to_string(),
    })
}

/// Failure raised by database attach/detach.
///
/// When the driver message could be translated, `description` holds the
/// long description and `solution` the suggested remedy; otherwise only the
/// raw message is kept in `short_description`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{short_description}")]
pub struct LocalDbError {
    pub short_description: String,
    pub description: String,
    pub solution: Option<String>,
}

impl LocalDbError {
    pub fn from_details(details: &SqlErrorDetails) -> Self {
        Self {
            short_description: details.short_description(),
            description: details.long_description(),
            solution: Some(details.remedy().solution().to_string()),
        }
    }

    /// Translates `message` when possible, else keeps it verbatim.
    pub fn from_message(message: &str) -> Self {
        match translate_error(message) {
            Some(details) => Self::from_details(&details),
            None => Self {
                short_description: message.to_string(),
                description: String::new(),
                solution: None,
            },
        }
    }

    /// Error with a fixed summary and the underlying message as description.
    pub fn generic(summary: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            short_description: summary.into(),
            description: message.into(),
            solution: None,
        }
    }

    /// Returns `true` when the message matched a known driver format.
    pub fn is_translated(&self) -> bool {
        self.solution.is_some()
    }

    /// Details and solutions as a printable block.
    pub fn summary(&self) -> String {
        format!(
            "Error details\n--------------------\n{}\nPossible solutions\n------------------\n{}\n\n",
            self.description,
            self.solution.as_deref().unwrap_or("")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver_message(code: u32, description: &str) -> String {
        format!(
            "[42000] [Microsoft][ODBC Driver 13 for SQL Server][SQL Server]{description} ({code}) (SQLExecDirectW)"
        )
    }

    #[test]
    fn test_translate_error_extracts_fields() {
        let msg = driver_message(5120, "Unable to open the physical file \"C:\\data\\x.mdf\".");
        let details = translate_error(&msg).unwrap();
        assert_eq!(details.sql_state, "42000");
        assert_eq!(
            details.driver,
            "[Microsoft][ODBC Driver 13 for SQL Server][SQL Server]"
        );
        assert_eq!(
            details.description,
            "Unable to open the physical file \"C:\\data\\x.mdf\"."
        );
        assert_eq!(details.code, 5120);
        assert_eq!(details.command, "SQLExecDirectW");
        assert_eq!(details.short_description(), "SQL Server failed with error 5120.");
    }

    #[test]
    fn test_access_denied_codes_suggest_permissions() {
        for code in [5120, 5121, 5123, 5133] {
            let details = translate_error(&driver_message(code, "Access is denied.")).unwrap();
            assert_eq!(details.remedy(), Remedy::AccessDenied);
            assert!(details.remedy().solution().contains("read/write access"));
            assert!(details.remedy().solution().contains("parent folder"));
        }
    }

    #[test]
    fn test_code_823_suggests_corruption() {
        let details = translate_error(&driver_message(823, "I/O error detected.")).unwrap();
        assert!(details.remedy().solution().contains("corrupt"));
    }

    #[test]
    fn test_code_5118_suggests_compression() {
        let details = translate_error(&driver_message(5118, "File is compressed.")).unwrap();
        assert_eq!(details.remedy(), Remedy::CompressedFolder);
        assert!(details.remedy().solution().contains("compressed"));
    }

    #[test]
    fn test_connectivity_description_is_recognized() {
        let msg = driver_message(17, "SQL Server does not exist or access denied.");
        let details = translate_error(&msg).unwrap();
        assert_eq!(details.remedy(), Remedy::ServerUnreachable);
    }

    #[test]
    fn test_unknown_code_falls_back() {
        let details = translate_error(&driver_message(1801, "Database already exists.")).unwrap();
        assert_eq!(details.remedy(), Remedy::NoKnownSolution);
        assert_eq!(details.remedy().solution(), "No known solutions available.");
    }

    #[test]
    fn test_unmatched_message_is_not_translated() {
        assert!(translate_error("").is_none());
        assert!(translate_error("timeout expired").is_none());

        let err = LocalDbError::from_message("timeout expired");
        assert_eq!(err.short_description, "timeout expired");
        assert!(!err.is_translated());
        assert_eq!(err.to_string(), "timeout expired");
    }

    #[test]
    fn test_local_db_error_from_translated_message() {
        let err = LocalDbError::from_message(&driver_message(823, "Bad page."));
        assert!(err.is_translated());
        assert_eq!(err.to_string(), "SQL Server failed with error 823.");
        assert!(err.description.contains("Error code:     823"));
        assert!(err.description.contains("Bad page."));

        let summary = err.summary();
        assert!(summary.starts_with("Error details\n"));
        assert!(summary.contains("Possible solutions"));
        assert!(summary.contains("corrupt"));
    }

    #[test]
    fn test_generic_error_keeps_message() {
        let err = LocalDbError::generic("Failed to detach SQL database!", "pipe closed");
        assert_eq!(err.to_string(), "Failed to detach SQL database!");
        assert_eq!(err.description, "pipe closed");
        assert!(!err.is_translated());
    }
}
