//! Runs the process-backed runner against a shell script that mimics
//! `SqlLocalDB.exe`.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use localdb_core::Request;
use localdb_host::{
    CommandRunner, HostConfig, HostError, InstanceManager, SqlLocalDb, StaticDrivers, StopMode,
};
use tempfile::TempDir;

const FAKE_TOOL: &str = r#"#!/bin/sh
printf '%s|' "$@" >> "__LOG__"
printf '\n' >> "__LOG__"
case "$1" in
  info)
    if [ -z "$2" ]; then
      printf 'MSSQLLocalDB\nMy Instance\n'
    else
      printf 'Name:               %s\n' "$2"
      printf 'Version:            13.1.4001.0\n'
      printf 'Shared name:\n'
      printf 'Owner:              HOST\\dev\n'
      printf 'Auto-create:        No\n'
      printf 'State:              Running\n'
      printf 'Last start time:    19/10/2026 09:15:02\n'
      printf 'Instance pipe name: np:\\\\.\\pipe\\LOCALDB#0F1E2D3C\\tsql\\query\n'
    fi
    ;;
  versions)
    printf 'Microsoft SQL Server 2014 (12.0.2000.8)\nMicrosoft SQL Server 2016 (13.1.4001.0)\n'
    ;;
  delete)
    if [ "$2" = "Locked" ]; then
      echo "Delete of LocalDB instance \"$2\" failed: the instance is in use." >&2
      exit 3
    fi
    ;;
  start)
    if [ "$2" = "Slow" ]; then
      exec sleep 10
    fi
    ;;
esac
exit 0
"#;

struct FakeTool {
    _dir: TempDir,
    script: PathBuf,
    log: PathBuf,
}

impl FakeTool {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let script = dir.path().join("sqllocaldb");
        let log = dir.path().join("calls.log");
        fs::write(&script, FAKE_TOOL.replace("__LOG__", &log.to_string_lossy()))
            .expect("failed to write fake tool");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755))
            .expect("failed to mark fake tool executable");
        Self {
            _dir: dir,
            script,
            log,
        }
    }

    fn config(&self) -> HostConfig {
        HostConfig {
            executable: Some(self.script.clone()),
            require_windows: false,
            ..HostConfig::default()
        }
    }

    fn runner(&self) -> SqlLocalDb {
        SqlLocalDb::from_config(&self.config())
    }

    /// Each call as the list of arguments the script received.
    fn calls(&self) -> Vec<Vec<String>> {
        read_calls(&self.log)
    }
}

fn read_calls(log: &Path) -> Vec<Vec<String>> {
    fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .map(|line| {
            line.trim_end_matches('|')
                .split('|')
                .map(str::to_string)
                .collect()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

#[test]
fn runner_uses_configured_executable() {
    let tool = FakeTool::new();
    let runner = tool.runner();
    assert!(runner.available());
    assert_eq!(runner.exe_path(), Some(tool.script.as_path()));
}

#[test]
fn runner_returns_stdout() {
    let tool = FakeTool::new();
    let output = tool.runner().run(&Request::Info { name: None }).unwrap();
    assert_eq!(output, "MSSQLLocalDB\nMy Instance\n");
}

#[test]
fn names_with_spaces_are_passed_as_one_argument() {
    let tool = FakeTool::new();
    tool.runner()
        .run(&Request::Create {
            name: "My Instance".to_string(),
            version: Some("13.0".to_string()),
            start: true,
        })
        .unwrap();

    assert_eq!(tool.calls(), [["create", "My Instance", "13.0", "-s"]]);
}

#[test]
fn non_zero_exit_is_command_failed() {
    let tool = FakeTool::new();
    let err = tool
        .runner()
        .run(&Request::Delete {
            name: "Locked".to_string(),
        })
        .unwrap_err();

    match err {
        HostError::CommandFailed {
            command,
            code,
            message,
        } => {
            assert!(command.contains("delete"));
            assert_eq!(code, Some(3));
            assert!(message.contains("is in use"));
        }
        other => panic!("expected CommandFailed, got {other:?}"),
    }
}

#[test]
fn timeout_kills_hung_process() {
    let tool = FakeTool::new();
    let config = HostConfig {
        timeout_secs: Some(1),
        ..tool.config()
    };
    let err = SqlLocalDb::from_config(&config)
        .run(&Request::Start {
            name: "Slow".to_string(),
        })
        .unwrap_err();

    assert!(matches!(err, HostError::TimedOut { seconds: 1, .. }));
}

#[test]
fn windows_only_runner_refuses_other_platforms() {
    let tool = FakeTool::new();
    let config = HostConfig {
        require_windows: true,
        ..tool.config()
    };
    let err = SqlLocalDb::from_config(&config)
        .run(&Request::Versions)
        .unwrap_err();

    assert!(matches!(err, HostError::UnsupportedPlatform(_)));
    assert!(tool.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Manager over the real runner
// ---------------------------------------------------------------------------

fn manager(tool: &FakeTool) -> InstanceManager {
    InstanceManager::new(
        Arc::new(tool.runner()),
        Arc::new(StaticDrivers::new(["ODBC Driver 17 for SQL Server"])),
    )
}

#[test]
fn manager_discovers_instances_and_parses_records() {
    let tool = FakeTool::new();
    let mut mgr = manager(&tool);

    let inst = mgr.get("my instance", false).unwrap().unwrap();
    assert_eq!(inst.name(), "My Instance");
    assert_eq!(inst.version(), "13.1.4001.0");
    assert!(inst.info().is_running());
    assert_eq!(inst.info().owner, r"HOST\dev");
    assert_eq!(
        inst.info().pipe_name,
        r"np:\\.\pipe\LOCALDB#0F1E2D3C\tsql\query"
    );
    assert_eq!(
        inst.connection_string(None).unwrap(),
        r"Server={(LocalDB)\My Instance};Driver={ODBC Driver 17 for SQL Server};Trusted_Connection=yes"
    );
}

#[test]
fn manager_versions_keep_tool_order() {
    let tool = FakeTool::new();
    let versions = manager(&tool).versions().unwrap();

    let majors: Vec<u32> = versions.iter().map(|v| v.major).collect();
    assert_eq!(majors, [12, 13]);
    assert_eq!(versions[1].name, "Microsoft SQL Server 2016");
    assert_eq!(versions[1].version, "13.1.4001.0");
}

#[test]
fn manager_stop_passes_mode_flags() {
    let tool = FakeTool::new();
    let mut mgr = manager(&tool);

    mgr.get("MSSQLLocalDB", false)
        .unwrap()
        .unwrap()
        .stop(StopMode::NoWait)
        .unwrap();

    let calls = tool.calls();
    assert_eq!(calls[2], ["stop", "MSSQLLocalDB", "-i"]);
    assert_eq!(calls[3], ["info", "MSSQLLocalDB"]);
}

#[test]
fn manager_delete_unknown_instance_is_key_not_found() {
    let tool = FakeTool::new();
    let err = manager(&tool).delete("Nope").unwrap_err();

    assert!(matches!(err, HostError::KeyNotFound(_)));
    assert_eq!(tool.calls(), [["info"]]);
}
