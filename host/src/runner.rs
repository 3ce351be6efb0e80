//! Running requests through the SqlLocalDB executable.
//!
//! [`CommandRunner`] is the seam between instance management and the host:
//! [`SqlLocalDb`] spawns the real tool, tests substitute scripted runners.
//! Every call blocks until the child exits (or the optional timeout
//! elapses). Nothing is retried.

use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use localdb_core::{ExecutableInfo, Invocation, Request};
use tracing::debug;
use wait_timeout::ChildExt as _;

use crate::config::HostConfig;
use crate::error::{HostError, Result};
use crate::executable::find_executables;

/// Executes one request and returns the tool's standard output.
pub trait CommandRunner: Send + Sync {
    fn run(&self, request: &Request) -> Result<String>;
}

/// Process-backed runner for `SqlLocalDB.exe`.
#[derive(Debug, Clone)]
pub struct SqlLocalDb {
    executable: Option<ExecutableInfo>,
    timeout: Option<Duration>,
    require_windows: bool,
}

impl SqlLocalDb {
    /// Runner for a known executable (or none, making every call fail with
    /// [`HostError::ExecutableUnavailable`]).
    pub fn new(executable: Option<ExecutableInfo>) -> Self {
        Self {
            executable,
            timeout: None,
            require_windows: true,
        }
    }

    /// Runner for the newest executable [`find_executables`] reports.
    pub fn from_config(config: &HostConfig) -> Self {
        Self {
            executable: find_executables(config).into_iter().next(),
            timeout: config.timeout(),
            require_windows: config.require_windows,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Allows running a compatible tool off Windows when `false`.
    pub fn require_windows(mut self, require: bool) -> Self {
        self.require_windows = require;
        self
    }

    /// `true` if an executable was found.
    pub fn available(&self) -> bool {
        self.executable.is_some()
    }

    pub fn exe_path(&self) -> Option<&Path> {
        self.executable.as_ref().map(|exe| exe.path.as_path())
    }

    pub fn executable(&self) -> Option<&ExecutableInfo> {
        self.executable.as_ref()
    }
}

impl CommandRunner for SqlLocalDb {
    fn run(&self, request: &Request) -> Result<String> {
        if self.require_windows && !cfg!(windows) {
            return Err(HostError::UnsupportedPlatform(std::env::consts::OS));
        }
        let exe = self
            .executable
            .as_ref()
            .ok_or(HostError::ExecutableUnavailable)?;
        run_invocation(&Invocation::new(&exe.path, request), self.timeout)
    }
}

fn run_invocation(invocation: &Invocation, timeout: Option<Duration>) -> Result<String> {
    debug!(command = %invocation, "Running SqlLocalDB");

    let mut command = Command::new(&invocation.program);
    command
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt as _;
        // Keep the console tool from flashing a window.
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        command.creation_flags(CREATE_NO_WINDOW);
    }

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(command = %invocation, "SqlLocalDB executable not found");
            return Err(HostError::ExecutableUnavailable);
        }
        Err(e) => return Err(e.into()),
    };

    // Drain both pipes while waiting so a chatty child cannot block on a
    // full pipe buffer.
    let stdout_thread = child.stdout.take().map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf).map(|_| buf)
        })
    });
    let stderr_thread = child.stderr.take().map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf).map(|_| buf)
        })
    });

    let status = match timeout {
        Some(limit) => match child.wait_timeout(limit)? {
            Some(status) => status,
            None => {
                debug!(command = %invocation, timeout_secs = limit.as_secs(), "SqlLocalDB timed out, killing process");
                let _ = child.kill();
                let _ = child.wait();
                return Err(HostError::TimedOut {
                    command: invocation.to_string(),
                    seconds: limit.as_secs(),
                });
            }
        },
        None => child.wait()?,
    };

    let stdout = collect(stdout_thread)?;
    let stderr = collect(stderr_thread)?;
    debug!(
        command = %invocation,
        exit_code = ?status.code(),
        stdout_len = stdout.len(),
        stderr_len = stderr.len(),
        "SqlLocalDB finished"
    );

    if !status.success() {
        let message = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        return Err(HostError::CommandFailed {
            command: invocation.to_string(),
            code: status.code(),
            message,
        });
    }
    Ok(stdout)
}

fn collect(
    reader: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
) -> Result<String> {
    let Some(handle) = reader else {
        return Ok(String::new());
    };
    let buf = handle
        .join()
        .map_err(|_| std::io::Error::other("output reader thread panicked"))??;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
