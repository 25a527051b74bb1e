use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use log::{debug, error};
use tokio::process::{Child, Command};

use crate::error_handling::types::CaptureError;

use super::session::CaptureSession;

/// Prefix of `tshark --version` output for the supported tool family.
pub const VERSION_PREFIX: &str = "TShark (Wireshark)";

/// Handle on the tshark executable.
#[derive(Debug, Clone)]
pub struct CaptureTool {
    path: PathBuf,
}

impl CaptureTool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `tshark --version` and returns the first line of its output.
    ///
    /// A missing executable or an unrecognised banner is an
    /// [`CaptureError::EnvironmentError`].
    pub async fn verify_version(&self) -> Result<String, CaptureError> {
        debug!("Checking capture tool version: {}", self.path.display());

        let output = Command::new(&self.path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                let reason = if e.kind() == io::ErrorKind::NotFound {
                    format!("{} not found", self.path.display())
                } else {
                    format!("unable to run {}: {}", self.path.display(), e)
                };
                error!("{}", reason);
                CaptureError::EnvironmentError(reason)
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let banner = stdout.lines().next().unwrap_or_default().trim().to_string();
        if !stdout.starts_with(VERSION_PREFIX) {
            error!("Unsupported capture tool version output: '{}'", banner);
            return Err(CaptureError::EnvironmentError(format!(
                "unsupported capture tool version: '{}'",
                banner
            )));
        }

        Ok(banner)
    }

    /// Spawns a capture run for `session` with piped stdout/stderr.
    ///
    /// The process is killed if its handle is dropped before it exits.
    pub fn spawn(&self, session: &CaptureSession) -> Result<Child, CaptureError> {
        let args = session.tool_arguments();
        debug!(
            "[{}] Spawning {} {:?}",
            session.id,
            self.path.display(),
            args
        );

        Command::new(&self.path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                error!("[{}] Failed to spawn capture tool: {}", session.id, e);
                CaptureError::SpawnFailed(e)
            })
    }
}
