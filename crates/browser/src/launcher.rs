//! External browser process collaborator.
//!
//! The driver only needs a live debug endpoint; it is agnostic to whether
//! the browser was started here or was already running. This launcher
//! exists for the common case of starting one with the remote-debugging
//! flags and a chosen profile directory.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};

use crate::error::Result;

const REAP_TIMEOUT: Duration = Duration::from_secs(8);

/// Builder for a debuggable browser process.
#[derive(Debug, Clone)]
pub struct BrowserLauncher {
    executable: PathBuf,
    user_data_dir: PathBuf,
    profile_directory: String,
    host: String,
    port: u16,
    start_url: Option<String>,
}

impl BrowserLauncher {
    pub fn new(executable: impl Into<PathBuf>, user_data_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            user_data_dir: user_data_dir.into(),
            profile_directory: "Default".to_string(),
            host: "127.0.0.1".to_string(),
            port: 9222,
            start_url: None,
        }
    }

    /// Profile directory under the user data dir ("Default", "Profile 1", ...).
    pub fn profile(mut self, name: impl Into<String>) -> Self {
        self.profile_directory = name.into();
        self
    }

    pub fn endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn start_url(mut self, url: impl Into<String>) -> Self {
        self.start_url = Some(url.into());
        self
    }

    /// Spawn the process. Output is discarded; the debug endpoint is the
    /// only channel we talk to it on.
    pub fn spawn(&self) -> Result<LaunchedBrowser> {
        let mut command = Command::new(&self.executable);
        command
            .arg(format!("--remote-debugging-port={}", self.port))
            .arg(format!("--remote-debugging-address={}", self.host))
            .arg(format!("--user-data-dir={}", self.user_data_dir.display()))
            .arg(format!("--profile-directory={}", self.profile_directory))
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(url) = &self.start_url {
            command.arg(url);
        }

        let child = command.spawn()?;
        tracing::info!(
            profile = %self.profile_directory,
            port = self.port,
            "browser process launched"
        );
        Ok(LaunchedBrowser { child })
    }
}

/// Handle to a browser process we started.
pub struct LaunchedBrowser {
    child: Child,
}

impl LaunchedBrowser {
    /// Kill and reap the process. Tolerant of a child that already exited
    /// on its own.
    pub async fn terminate(mut self) {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!(%status, "browser already exited");
                return;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::debug!("browser status check failed: {}", e);
                return;
            }
        }

        if let Err(e) = self.child.start_kill() {
            tracing::debug!("browser kill failed: {}", e);
            return;
        }
        if tokio::time::timeout(REAP_TIMEOUT, self.child.wait())
            .await
            .is_err()
        {
            tracing::warn!("browser did not exit within {:?}", REAP_TIMEOUT);
        }
    }

    /// Leave the process running and stop tracking it.
    pub fn leave_open(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn terminate_tolerates_already_exited_child() {
        // `true` exits immediately; terminate must not hang or error.
        let child = Command::new("true")
            .stdout(Stdio::null())
            .spawn()
            .expect("spawn true");
        let launched = LaunchedBrowser { child };
        tokio::time::sleep(Duration::from_millis(50)).await;
        launched.terminate().await;
    }

    #[tokio::test]
    async fn terminate_kills_running_child() {
        let child = Command::new("sleep")
            .arg("30")
            .stdout(Stdio::null())
            .spawn()
            .expect("spawn sleep");
        let launched = LaunchedBrowser { child };
        launched.terminate().await;
    }
}
