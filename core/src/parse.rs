//! Parsers for SqlLocalDB text output.
//!
//! The tool prints three shapes of output:
//!
//! - `info` with no name: one instance name per line.
//! - `info <name>`: `Key: Value` lines, e.g. `Shared name: FooShare`.
//! - `versions`: lines such as `Microsoft SQL Server 2016 (13.1.4001.0)`.
//!
//! The name-list and version parsers never fail; empty input yields an
//! empty list. The record parser fails on keys it does not know, since an
//! unknown key means the tool and this crate disagree on the format.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CommandError, Result};
use crate::types::{InstanceInfo, ServerVersion};

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<name>.*?)\((?P<version>(?P<major>[0-9]+)\.(?P<minor>[0-9]+)\.(?P<micro>[0-9]+)\.(?P<build>[0-9]+))\)")
        .expect("static regex must compile")
});

/// Parses `info` output into instance names, in the order printed.
///
/// # Examples
///
/// ```
/// use localdb_core::parse_name_list;
///
/// assert_eq!(parse_name_list("MSSQLLocalDB\r\nProjects\r\n"), ["MSSQLLocalDB", "Projects"]);
/// assert!(parse_name_list("").is_empty());
/// ```
pub fn parse_name_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses `info <name>` output into an [`InstanceInfo`].
///
/// Lines without a colon are ignored. Each remaining line is split at its
/// first colon, so values such as pipe names (`np:\\.\pipe\...`) and start
/// times (`9:00:00 AM`) survive intact.
///
/// # Errors
///
/// - [`CommandError::UnrecognizedField`] for a key outside the known set.
/// - [`CommandError::MissingField`] when no `Name` line was printed.
///
/// # Examples
///
/// ```
/// use localdb_core::parse_instance_info;
///
/// let info = parse_instance_info("Name:    Foo\nVersion: 13.0.1601.5\nState:   Stopped\n").unwrap();
/// assert_eq!(info.name, "Foo");
/// assert_eq!(info.version, "13.0.1601.5");
/// assert!(!info.is_running());
/// ```
pub fn parse_instance_info(output: &str) -> Result<InstanceInfo> {
    let mut info = InstanceInfo::default();
    let mut saw_name = false;

    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim().to_lowercase().as_str() {
            "name" => {
                info.name = value;
                saw_name = true;
            }
            "version" => info.version = value,
            "shared name" => info.shared_name = value,
            "owner" => info.owner = value,
            "auto-create" => info.auto_create = value,
            "state" => info.state = value,
            "last start time" => info.last_start = value,
            "instance pipe name" => info.pipe_name = value,
            _ => return Err(CommandError::UnrecognizedField(key.trim().to_string())),
        }
    }

    if !saw_name || info.name.is_empty() {
        return Err(CommandError::MissingField("name"));
    }
    Ok(info)
}

/// Parses `versions` output, skipping lines that carry no version.
///
/// # Examples
///
/// ```
/// use localdb_core::parse_versions;
///
/// let versions = parse_versions("SQL Server 2016 (13.0.4001.0)\nGarbageLine\nSQL Server 2014 (12.0.2000.8)");
/// assert_eq!(versions.len(), 2);
/// assert_eq!(versions[0].major, 13);
/// assert_eq!(versions[1].major, 12);
/// ```
pub fn parse_versions(output: &str) -> Vec<ServerVersion> {
    output
        .lines()
        .filter_map(|line| {
            let caps = VERSION_RE.captures(line)?;
            let number = |group: &str| caps.name(group)?.as_str().parse::<u32>().ok();
            Some(ServerVersion {
                name: caps.name("name")?.as_str().trim().to_string(),
                version: caps.name("version")?.as_str().to_string(),
                major: number("major")?,
                minor: number("minor")?,
                micro: number("micro")?,
                build: number("build")?,
            })
        })
        .collect()
}
