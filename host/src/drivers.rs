//! ODBC driver lookup for LocalDB connection strings.
//!
//! Only some SQL Server drivers understand the `(LocalDB)\name` server
//! syntax:
//!
//! | Driver | Shipped with |
//! |---|---|
//! | ODBC Driver 17/18 for SQL Server | SQL Server 2017+ |
//! | ODBC Driver 13 for SQL Server | SQL Server 2016 |
//! | ODBC Driver 11 for SQL Server | SQL Server 2014 |
//! | SQL Server Native Client 11.0 | SQL Server 2012 |
//!
//! Native Client 10.0 and earlier do not. All compatible drivers work with
//! every LocalDB version, so the newest one wins.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;

use crate::error::{HostError, Result};

static ODBC_DRIVER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ODBC Driver [0-9]{2} for SQL Server$").expect("static regex must compile")
});

const NATIVE_CLIENT_11: &str = "SQL Server Native Client 11.0";

/// Where installed driver names come from.
pub trait DriverSource: Send + Sync {
    fn installed_drivers(&self) -> Result<Vec<String>>;
}

/// A fixed driver list, typically from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticDrivers(Vec<String>);

impl StaticDrivers {
    pub fn new(drivers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(drivers.into_iter().map(Into::into).collect())
    }
}

impl DriverSource for StaticDrivers {
    fn installed_drivers(&self) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

/// Reads driver names from a unixODBC `odbcinst.ini`.
///
/// Every section header names a driver, except the `[ODBC]` options block;
/// entries under `[ODBC Drivers]` are driver names too. A missing file
/// means no drivers are installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OdbcInstIni {
    path: PathBuf,
}

impl OdbcInstIni {
    pub const DEFAULT_PATH: &'static str = "/etc/odbcinst.ini";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DriverSource for OdbcInstIni {
    fn installed_drivers(&self) -> Result<Vec<String>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No odbcinst.ini, assuming no drivers");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };
        Ok(parse_odbcinst(&raw))
    }
}

fn parse_odbcinst(raw: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut drivers = Vec::new();
    let mut in_driver_list = false;

    for line in raw.lines().map(str::trim) {
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        let name = if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let section = section.trim();
            in_driver_list = section.eq_ignore_ascii_case("ODBC Drivers");
            if in_driver_list || section.eq_ignore_ascii_case("ODBC") {
                continue;
            }
            section
        } else if in_driver_list {
            match line.split_once('=') {
                Some((key, _)) => key.trim(),
                None => continue,
            }
        } else {
            continue;
        };
        if seen.insert(name.to_string()) {
            drivers.push(name.to_string());
        }
    }
    drivers
}

/// Platform default driver source.
///
/// Windows keeps its driver list in the registry, which is not read here;
/// configure `drivers` explicitly there.
pub fn default_source() -> Arc<dyn DriverSource> {
    if cfg!(windows) {
        Arc::new(StaticDrivers::default())
    } else {
        Arc::new(OdbcInstIni::new(OdbcInstIni::DEFAULT_PATH))
    }
}

/// Filters `drivers` to those usable with LocalDB, newest first.
pub fn compatible_drivers(drivers: &[String]) -> Vec<String> {
    let mut odbc: Vec<String> = drivers
        .iter()
        .filter(|name| ODBC_DRIVER_RE.is_match(name.trim()))
        .map(|name| name.trim().to_string())
        .collect();
    odbc.sort_unstable_by(|a, b| b.cmp(a));
    odbc.dedup();

    if drivers.iter().any(|name| name.trim() == NATIVE_CLIENT_11) {
        odbc.push(NATIVE_CLIENT_11.to_string());
    }
    odbc
}

/// Newest LocalDB-compatible driver reported by `source`.
///
/// # Errors
///
/// Returns [`HostError::NoCompatibleDriver`] when none is installed.
pub fn latest_driver(source: &dyn DriverSource) -> Result<String> {
    let installed = source.installed_drivers()?;
    compatible_drivers(&installed)
        .into_iter()
        .next()
        .ok_or(HostError::NoCompatibleDriver)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_compatible_drivers_orders_newest_first() {
        let installed = names(&[
            "SQL Server",
            "ODBC Driver 11 for SQL Server",
            "SQL Server Native Client 11.0",
            "ODBC Driver 17 for SQL Server",
            "SQL Server Native Client 10.0",
            "ODBC Driver 13 for SQL Server",
        ]);
        assert_eq!(
            compatible_drivers(&installed),
            [
                "ODBC Driver 17 for SQL Server",
                "ODBC Driver 13 for SQL Server",
                "ODBC Driver 11 for SQL Server",
                "SQL Server Native Client 11.0",
            ]
        );
    }

    #[test]
    fn test_latest_driver_without_compatible_driver_fails() {
        let source = StaticDrivers::new(["SQL Server", "SQL Server Native Client 10.0"]);
        assert!(matches!(
            latest_driver(&source),
            Err(HostError::NoCompatibleDriver)
        ));
    }

    #[test]
    fn test_latest_driver_picks_native_client_as_last_resort() {
        let source = StaticDrivers::new(["SQL Server Native Client 11.0"]);
        assert_eq!(latest_driver(&source).unwrap(), NATIVE_CLIENT_11);
    }

    #[test]
    fn test_parse_odbcinst_reads_sections_and_driver_list() {
        let raw = "\
[ODBC]
Trace = No

[ODBC Drivers]
ODBC Driver 18 for SQL Server = Installed

[ODBC Driver 18 for SQL Server]
Description=Microsoft ODBC Driver 18 for SQL Server
Driver=/opt/microsoft/msodbcsql18/lib64/libmsodbcsql-18.3.so.2.1

; legacy
[PostgreSQL Unicode]
Driver=psqlodbcw.so
";
        assert_eq!(
            parse_odbcinst(raw),
            ["ODBC Driver 18 for SQL Server", "PostgreSQL Unicode"]
        );
    }

    #[test]
    fn test_odbcinst_missing_file_means_no_drivers() {
        let source = OdbcInstIni::new("/nonexistent/odbcinst.ini");
        assert!(source.installed_drivers().unwrap().is_empty());
    }

    #[test]
    fn test_odbcinst_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odbcinst.ini");
        std::fs::write(&path, "[ODBC Driver 17 for SQL Server]\nDriver=libmsodbcsql-17.so\n").unwrap();

        let source = OdbcInstIni::new(&path);
        assert_eq!(latest_driver(&source).unwrap(), "ODBC Driver 17 for SQL Server");
    }
}
