//! Records describing the SqlLocalDB tool and the instances it manages.
//!
//! All records are plain snapshots. Nothing here talks to the host; the
//! records are produced by the parsers in [`crate::parse`] or by executable
//! discovery in the host crate, and are replaced rather than mutated when
//! fresher data is needed.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One discovered copy of the SqlLocalDB executable.
///
/// # Examples
///
/// ```
/// use localdb_core::ExecutableInfo;
///
/// let exe = ExecutableInfo::new("SqlLocalDB.exe", "13.0", "");
/// assert_eq!(exe.version, "13.0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutableInfo {
    /// Filesystem path of the executable.
    pub path: PathBuf,
    /// Tool version (e.g. `13.0`), empty when unknown.
    pub version: String,
    /// Registry key the installation is recorded under, empty when unknown.
    pub registry_key: String,
}

impl ExecutableInfo {
    pub fn new(
        path: impl Into<PathBuf>,
        version: impl Into<String>,
        registry_key: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
            registry_key: registry_key.into(),
        }
    }
}

/// Metadata of one instance as reported by `info <name>`.
///
/// Fields the tool left blank (e.g. `Shared name` of a private instance)
/// are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceInfo {
    pub name: String,
    pub version: String,
    pub shared_name: String,
    pub owner: String,
    pub auto_create: String,
    pub state: String,
    pub last_start: String,
    pub pipe_name: String,
}

impl InstanceInfo {
    /// Returns `true` when the tool reported the instance as running.
    ///
    /// # Examples
    ///
    /// ```
    /// use localdb_core::InstanceInfo;
    ///
    /// let info = InstanceInfo { state: "Running".into(), ..Default::default() };
    /// assert!(info.is_running());
    /// ```
    pub fn is_running(&self) -> bool {
        self.state.trim().eq_ignore_ascii_case("running")
    }

    /// Returns `true` when the instance is published under a share name.
    pub fn is_shared(&self) -> bool {
        !self.shared_name.trim().is_empty()
    }

    /// Directory key for this instance.
    pub fn key(&self) -> String {
        instance_key(&self.name)
    }
}

/// One installed engine version as listed by `versions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerVersion {
    /// Engine display name, e.g. `Microsoft SQL Server 2016`.
    pub name: String,
    /// Full dotted version, e.g. `13.1.4001.0`.
    pub version: String,
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
    pub build: u32,
}

impl ServerVersion {
    /// `major.minor`, the form accepted by `create`.
    pub fn short_version(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }
}

/// Case-insensitive lookup key for an instance name.
///
/// Names are compared case-insensitively but always handed to the tool
/// verbatim.
pub fn instance_key(name: &str) -> String {
    name.trim().to_lowercase()
}
