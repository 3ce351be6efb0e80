//! Discovery of installed SqlLocalDB executables.
//!
//! Looks in three places, in order: the configured path, `PATH`, and the
//! per-version `Tools\Binn` folders SQL Server installs under Program
//! Files. Results are deduplicated by path and sorted newest first.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use localdb_core::ExecutableInfo;
use tracing::debug;

use crate::config::HostConfig;

/// File names the tool may be installed under.
const EXECUTABLE_NAMES: &[&str] = &["SqlLocalDB.exe", "SqlLocalDB", "sqllocaldb"];

/// Registry key SQL Server records LocalDB installations under.
const INSTALLED_VERSIONS_KEY: &str =
    r"SOFTWARE\Microsoft\Microsoft SQL Server Local DB\Installed Versions";

/// Finds SqlLocalDB executables on this host, newest version first.
///
/// An explicitly configured executable is always listed first and is
/// returned even if it does not exist yet; spawning it reports the failure.
pub fn find_executables(config: &HostConfig) -> Vec<ExecutableInfo> {
    let mut found = Vec::new();
    if let Some(path) = &config.executable {
        found.push(ExecutableInfo::new(path.clone(), "", ""));
    }

    let mut discovered = path_executables();
    if let Some(program_files) = env::var_os("ProgramFiles") {
        discovered.extend(installed_executables(Path::new(&program_files)));
    }
    discovered.sort_by(|a, b| compare_versions(&b.version, &a.version));

    let mut seen: BTreeSet<PathBuf> = found.iter().map(|exe| exe.path.clone()).collect();
    for exe in discovered {
        if seen.insert(exe.path.clone()) {
            found.push(exe);
        }
    }

    debug!(count = found.len(), "Discovered SqlLocalDB executables");
    found
}

fn path_executables() -> Vec<ExecutableInfo> {
    let Some(path_env) = env::var_os("PATH") else {
        return Vec::new();
    };

    env::split_paths(&path_env)
        .filter_map(|dir| {
            EXECUTABLE_NAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|candidate| candidate.is_file())
        })
        .map(|path| ExecutableInfo::new(path, "", ""))
        .collect()
}

/// Scans `<root>\Microsoft SQL Server\<NNN>\Tools\Binn` for the tool.
fn installed_executables(program_files: &Path) -> Vec<ExecutableInfo> {
    let base = program_files.join("Microsoft SQL Server");
    let Ok(entries) = fs::read_dir(&base) else {
        return Vec::new();
    };

    entries
        .flatten()
        .filter_map(|entry| {
            let folder = entry.file_name().to_str()?.to_string();
            let version = folder_version(&folder)?;
            let path = entry
                .path()
                .join("Tools")
                .join("Binn")
                .join(EXECUTABLE_NAMES[0]);
            if !path.is_file() {
                return None;
            }
            let registry_key = format!("{INSTALLED_VERSIONS_KEY}\\{version}");
            Some(ExecutableInfo::new(path, version, registry_key))
        })
        .collect()
}

/// Maps an install folder such as `130` to the version `13.0`.
fn folder_version(folder: &str) -> Option<String> {
    if folder.len() < 2 || !folder.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (major, minor) = folder.split_at(folder.len() - 1);
    Some(format!("{}.{minor}", major.trim_start_matches('0')))
}

/// Orders dotted version strings numerically; unknown versions sort last.
fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u32> { v.split('.').filter_map(|p| p.parse().ok()).collect() };
    parse(a).cmp(&parse(b))
}
