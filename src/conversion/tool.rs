//! chdman detection and health probing.
//!
//! Resolution order: explicit config path, then the bundled tools directory,
//! then `PATH` via [`which::which`]. A resolved binary is only trusted after
//! a `--help` probe, which catches the common broken install where the
//! executable exists but its shared libraries do not.

use crate::config::ToolsConfig;
use crate::state::RecoveryAction;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

pub const TOOL_NAME: &str = "chdman";

#[cfg(windows)]
const TOOL_BINARY: &str = "chdman.exe";
#[cfg(not(windows))]
const TOOL_BINARY: &str = "chdman";

/// Linux package that ships chdman on Debian-family distributions.
const INSTALL_COMMAND: &str = "sudo apt-get install -y mame-tools";

/// Interval between exit polls while a probe runs.
const PROBE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Stderr marker for a binary whose dynamic libraries are missing.
const MISSING_LIBS_MARKER: &str = "error while loading shared libraries";

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{TOOL_NAME} not found in config, bundle directory or PATH")]
    NotFound,
    #[error("{TOOL_NAME} exists but cannot load its libraries: {detail}")]
    MissingLibraries { detail: String },
    #[error("{TOOL_NAME} failed its health probe: {detail}")]
    Broken { detail: String },
}

impl ToolError {
    /// What the user can do about this failure on the current platform.
    pub fn recovery_action(&self, tools: &ToolsConfig) -> RecoveryAction {
        if cfg!(target_os = "linux") {
            RecoveryAction::InstallPackage {
                command: INSTALL_COMMAND.to_string(),
            }
        } else {
            RecoveryAction::PlaceInBundleDir {
                expected: tools.bundled_dir.join(TOOL_BINARY),
            }
        }
    }
}

/// A verified chdman executable, scoped to one conversion run.
#[derive(Debug, Clone)]
pub struct ChdTool {
    pub path: PathBuf,
}

impl ChdTool {
    /// Locate and probe chdman. Only returns `Ok` for a binary that
    /// answered the probe without the missing-libraries marker.
    pub fn resolve(config: &ToolsConfig) -> Result<Self, ToolError> {
        let path = locate(config).ok_or(ToolError::NotFound)?;
        verify(&path, Duration::from_secs(config.probe_timeout_secs))?;
        debug!("Resolved {} at {:?}", TOOL_NAME, path);
        Ok(Self { path })
    }
}

/// Search the configured locations for a chdman binary, without probing it.
pub fn locate(config: &ToolsConfig) -> Option<PathBuf> {
    if let Some(p) = &config.chdman_path {
        if p.is_file() {
            return Some(p.clone());
        }
        warn!("Configured {} path {:?} does not exist", TOOL_NAME, p);
    }

    let bundled = config.bundled_dir.join(TOOL_BINARY);
    if bundled.is_file() {
        return Some(bundled);
    }

    which::which(TOOL_NAME).ok()
}

/// Run `<path> --help` with a deadline and classify the result.
///
/// Any exit within the deadline whose stderr lacks the missing-libraries
/// marker passes, including nonzero exits: chdman's help text historically
/// exits 1, and a binary that can print help can convert.
pub fn verify(path: &Path, timeout: Duration) -> Result<(), ToolError> {
    let mut child = Command::new(path)
        .arg("--help")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ToolError::NotFound,
            _ => ToolError::Broken {
                detail: e.to_string(),
            },
        })?;

    // Drain stderr off-thread so a probe that writes more than the pipe
    // buffer can still exit within the deadline.
    let stderr_reader = child.stderr.take().map(|mut pipe| {
        std::thread::spawn(move || {
            use std::io::Read as _;
            let mut buf = String::new();
            let _ = pipe.read_to_string(&mut buf);
            buf
        })
    });
    let join_stderr = |reader: Option<std::thread::JoinHandle<String>>| {
        reader.and_then(|h| h.join().ok()).unwrap_or_default()
    };

    let started = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(_)) => break,
            Ok(None) if started.elapsed() >= timeout => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = join_stderr(stderr_reader);
                return Err(ToolError::Broken {
                    detail: format!("probe did not finish within {}s", timeout.as_secs()),
                });
            }
            Ok(None) => std::thread::sleep(PROBE_POLL_INTERVAL),
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = join_stderr(stderr_reader);
                return Err(ToolError::Broken {
                    detail: e.to_string(),
                });
            }
        }
    }

    let stderr = join_stderr(stderr_reader);

    if stderr.contains(MISSING_LIBS_MARKER) {
        let detail = stderr
            .lines()
            .find(|l| l.contains(MISSING_LIBS_MARKER))
            .unwrap_or("missing shared libraries")
            .trim()
            .to_string();
        return Err(ToolError::MissingLibraries { detail });
    }

    Ok(())
}

/// Run the platform install command, streaming its output to the terminal.
/// Returns whether the command exited successfully.
pub fn run_install(command: &str) -> std::io::Result<bool> {
    #[cfg(unix)]
    let status = Command::new("sh").arg("-c").arg(command).status()?;
    #[cfg(not(unix))]
    let status = Command::new("cmd").args(["/C", command]).status()?;
    Ok(status.success())
}
