//! One managed LocalDB instance.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use localdb_core::{InstanceInfo, LocalDbError, Request, parse_instance_info};
use tracing::{debug, warn};

use crate::connector::{DriverErrorKind, SqlConnector, attach_sql, detach_sql};
use crate::drivers::{DriverSource, latest_driver};
use crate::error::Result;
use crate::runner::CommandRunner;

/// How `stop` shuts an instance down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StopMode {
    /// Let the server finish in-flight requests.
    #[default]
    Graceful,
    /// Shut down with `SHUTDOWN WITH NOWAIT`.
    NoWait,
    /// Kill the server process without contacting it.
    Kill,
}

impl StopMode {
    pub(crate) fn request(self, name: &str) -> Request {
        Request::Stop {
            name: name.to_string(),
            nowait: self == Self::NoWait,
            kill: self == Self::Kill,
        }
    }
}

/// Runs `info <name>` and parses the record.
pub(crate) fn query_info(runner: &dyn CommandRunner, name: &str) -> Result<InstanceInfo> {
    let output = runner.run(&Request::Info {
        name: Some(name.to_string()),
    })?;
    Ok(parse_instance_info(&output)?)
}

/// A LocalDB instance with a cached [`InstanceInfo`] snapshot.
///
/// The snapshot is replaced by [`refresh`](Self::refresh) and after every
/// start or stop. If that refresh fails the snapshot is stale and the
/// instance should be looked up again.
#[derive(Clone)]
pub struct Instance {
    info: InstanceInfo,
    runner: Arc<dyn CommandRunner>,
    drivers: Arc<dyn DriverSource>,
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance").field("info", &self.info).finish_non_exhaustive()
    }
}

impl Instance {
    pub fn new(
        info: InstanceInfo,
        runner: Arc<dyn CommandRunner>,
        drivers: Arc<dyn DriverSource>,
    ) -> Self {
        Self {
            info,
            runner,
            drivers,
        }
    }

    /// Queries the tool for `name` and wraps the result.
    pub fn load(
        name: &str,
        runner: Arc<dyn CommandRunner>,
        drivers: Arc<dyn DriverSource>,
    ) -> Result<Self> {
        let info = query_info(runner.as_ref(), name)?;
        Ok(Self::new(info, runner, drivers))
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn version(&self) -> &str {
        &self.info.version
    }

    pub fn info(&self) -> &InstanceInfo {
        &self.info
    }

    /// Replaces the snapshot with a fresh `info` query.
    pub fn refresh(&mut self) -> Result<&InstanceInfo> {
        self.info = query_info(self.runner.as_ref(), &self.info.name)?;
        Ok(&self.info)
    }

    pub fn start(&mut self) -> Result<()> {
        self.runner.run(&Request::Start {
            name: self.info.name.clone(),
        })?;
        self.refresh_after("start")
    }

    pub fn stop(&mut self, mode: StopMode) -> Result<()> {
        self.runner.run(&mode.request(&self.info.name))?;
        self.refresh_after("stop")
    }

    fn refresh_after(&mut self, operation: &str) -> Result<()> {
        if let Err(err) = self.refresh() {
            warn!(instance = %self.info.name, operation, error = %err, "Refresh failed, cached state is stale");
            return Err(err);
        }
        Ok(())
    }

    pub fn share(&self, shared_name: &str, owner: Option<&str>) -> Result<()> {
        self.runner.run(&Request::Share {
            name: self.info.name.clone(),
            shared_name: shared_name.to_string(),
            owner: owner.map(str::to_string),
        })?;
        Ok(())
    }

    pub fn unshare(&self, shared_name: &str) -> Result<()> {
        self.runner.run(&Request::Unshare {
            shared_name: shared_name.to_string(),
        })?;
        Ok(())
    }

    /// Stops, deletes and recreates the instance with the same name and
    /// `major.minor` version, started.
    ///
    /// Not atomic: if the process dies between delete and create, the
    /// instance is gone.
    pub fn reset(&mut self) -> Result<()> {
        let name = self.info.name.clone();
        let version = create_version(&self.info.version);
        debug!(instance = %name, %version, "Resetting instance");

        self.stop(StopMode::Graceful)?;
        self.runner.run(&Request::Delete { name: name.clone() })?;
        self.runner.run(&Request::Create {
            name,
            version: (!version.is_empty()).then_some(version),
            start: true,
        })?;
        self.refresh()?;
        Ok(())
    }

    /// ODBC connection string for this instance using the newest compatible
    /// driver.
    ///
    /// # Errors
    ///
    /// Returns [`NoCompatibleDriver`](crate::HostError::NoCompatibleDriver)
    /// if no LocalDB-capable driver is installed.
    pub fn connection_string(&self, database: Option<&str>) -> Result<String> {
        let driver = latest_driver(self.drivers.as_ref())?;
        let mut parts = vec![
            format!("Server={{(LocalDB)\\{}}}", self.info.name),
            format!("Driver={{{driver}}}"),
        ];
        if let Some(database) = database {
            parts.push(format!("Database={{{database}}}"));
        }
        parts.push("Trusted_Connection=yes".to_string());
        Ok(parts.join(";"))
    }

    /// Attaches an MDF file and returns the database name.
    ///
    /// Without `database`, the file name minus its extension is used.
    pub fn attach(
        &self,
        path: &Path,
        database: Option<&str>,
        connector: &dyn SqlConnector,
    ) -> Result<String> {
        let database = match database {
            Some(name) => name.to_string(),
            None => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let sql = attach_sql(&database, &path.to_string_lossy());
        self.execute(connector, &sql, "Failed to attach SQL database!")?;
        debug!(instance = %self.info.name, %database, "Attached database");
        Ok(database)
    }

    pub fn detach(&self, database: &str, connector: &dyn SqlConnector) -> Result<()> {
        let sql = detach_sql(database);
        self.execute(connector, &sql, "Failed to detach SQL database!")?;
        debug!(instance = %self.info.name, %database, "Detached database");
        Ok(())
    }

    fn execute(&self, connector: &dyn SqlConnector, sql: &str, failure: &str) -> Result<()> {
        let dsn = self.connection_string(None)?;
        connector.execute(&dsn, sql).map_err(|err| match err.kind {
            DriverErrorKind::Database => LocalDbError::from_message(&err.message),
            DriverErrorKind::Other => LocalDbError::generic(failure, err.message),
        })?;
        Ok(())
    }
}

/// `create` only takes `major.minor`; `info` reports the full build.
fn create_version(version: &str) -> String {
    version.split('.').take(2).collect::<Vec<_>>().join(".")
}
