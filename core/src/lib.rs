//! Request formatting, output parsing and error translation for the
//! SQL Server Express LocalDB command-line tool (`SqlLocalDB.exe`).
//!
//! This crate is pure: it never spawns a process. It defines
//!
//! - [`Request`]: one variant per tool operation, carrying exactly the
//!   arguments that operation takes, and its argv form ([`Request::args`]).
//! - [`parse_name_list`], [`parse_instance_info`], [`parse_versions`]:
//!   parsers for the three shapes of text the tool prints.
//! - [`translate_error`] and [`LocalDbError`]: best-effort enrichment of
//!   SQL Server driver messages with a suggested remedy.
//! - Snapshot records: [`ExecutableInfo`], [`InstanceInfo`],
//!   [`ServerVersion`].
//!
//! Running requests against a real executable lives in `localdb-host`.
//!
//! # Example
//!
//! ```
//! use localdb_core::*;
//!
//! let request = Request::Info { name: Some("MSSQLLocalDB".into()) };
//! assert_eq!(request.args(), ["info", "MSSQLLocalDB"]);
//!
//! let output = "Name: MSSQLLocalDB\nVersion: 13.1.4001.0\nState: Running\n";
//! let info = parse_instance_info(output).unwrap();
//! assert!(info.is_running());
//! ```

mod command;
mod diagnose;
mod error;
mod parse;
mod types;

pub use command::{Invocation, NamedArgs, Operation, Request};
pub use diagnose::{LocalDbError, Remedy, SqlErrorDetails, translate_error};
pub use error::{CommandError, Result};
pub use parse::{parse_instance_info, parse_name_list, parse_versions};
pub use types::{ExecutableInfo, InstanceInfo, ServerVersion, instance_key};
