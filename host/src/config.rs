//! Host configuration for locating SqlLocalDB and ODBC drivers.
//!
//! Every field has a default, so an empty file (or no file at all) gives
//! the stock behavior: discover the executable on the host, refuse to run
//! off Windows, and wait for each child process without a time limit.
//!
//! # Example YAML
//!
//! ```yaml
//! executable: 'C:\Program Files\Microsoft SQL Server\130\Tools\Binn\SqlLocalDB.exe'
//! require_windows: true
//! timeout_secs: 60
//! drivers:
//!   - ODBC Driver 17 for SQL Server
//! odbcinst: null
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::drivers::{DriverSource, OdbcInstIni, StaticDrivers};
use crate::error::Result;

/// Settings for [`SqlLocalDb`](crate::SqlLocalDb) and driver lookup.
///
/// # Examples
///
/// ```
/// use localdb_host::HostConfig;
///
/// let config = HostConfig::default();
/// assert!(config.executable.is_none());
/// assert!(config.require_windows);
/// assert!(config.timeout().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Explicit executable path; skips discovery when set.
    pub executable: Option<PathBuf>,
    /// Refuse to run the tool on anything but Windows.
    pub require_windows: bool,
    /// Kill the child after this many seconds. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
    /// Installed driver names, used instead of host discovery when non-empty.
    pub drivers: Vec<String>,
    /// `odbcinst.ini` to read driver names from.
    pub odbcinst: Option<PathBuf>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            executable: None,
            require_windows: true,
            timeout_secs: None,
            drivers: Vec::new(),
            odbcinst: None,
        }
    }
}

impl HostConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::HostError::Io) if the file cannot be read, or
    /// [`Yaml`](crate::HostError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::HostError::Io) if the file cannot be written,
    /// or [`Yaml`](crate::HostError::Yaml) if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Driver source implied by this configuration.
    ///
    /// Explicit `drivers` win, then `odbcinst`, then the platform default.
    pub fn driver_source(&self) -> Arc<dyn DriverSource> {
        if !self.drivers.is_empty() {
            return Arc::new(StaticDrivers::new(self.drivers.clone()));
        }
        match &self.odbcinst {
            Some(path) => Arc::new(OdbcInstIni::new(path.clone())),
            None => crate::drivers::default_source(),
        }
    }
}
