//! Managing SQL Server Express LocalDB instances through `SqlLocalDB.exe`.
//!
//! [`InstanceManager`] is the entry point. It runs typed requests from
//! `localdb-core` through a [`CommandRunner`] (normally [`SqlLocalDb`],
//! which spawns the real executable) and caches [`Instance`] handles by
//! case-insensitive name.
//!
//! ```no_run
//! use localdb_host::{HostConfig, InstanceManager, StopMode};
//!
//! let mut manager = InstanceManager::from_config(&HostConfig::default());
//! let instance = manager.create("Scratch", None, true)?;
//! println!("{}", instance.connection_string(Some("master"))?);
//! instance.stop(StopMode::Graceful)?;
//! manager.delete("Scratch")?;
//! # Ok::<(), localdb_host::HostError>(())
//! ```
//!
//! Attaching and detaching database files needs an ODBC binding, which
//! callers supply through [`SqlConnector`].

pub mod config;
pub mod connector;
pub mod drivers;
mod error;
pub mod executable;
mod instance;
mod manager;
mod runner;

pub use config::HostConfig;
pub use connector::{DriverError, DriverErrorKind, SqlConnector};
pub use drivers::{DriverSource, OdbcInstIni, StaticDrivers, compatible_drivers, latest_driver};
pub use error::{HostError, Result};
pub use executable::find_executables;
pub use instance::{Instance, StopMode};
pub use manager::{Info, InstanceManager};
pub use runner::{CommandRunner, SqlLocalDb};
