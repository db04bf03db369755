//! Launching a host process and waiting for its command port.

use std::path::PathBuf;

use scenelink_core::{Endpoint, StartupWaiter};
use tokio::process::{Child, Command};
use tracing::info;

use crate::error::CtlError;

// ── HostLauncher ─────────────────────────────────────────────────

/// Spawns a host executable and polls for its command listener.
#[derive(Debug, Clone)]
pub struct HostLauncher {
    executable: PathBuf,
    args: Vec<String>,
    waiter: StartupWaiter,
}

/// A spawned host whose command port came up.
#[derive(Debug)]
pub struct RunningHost {
    pub child: Child,
    pub endpoint: Endpoint,
}

impl HostLauncher {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            waiter: StartupWaiter::default(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_waiter(mut self, waiter: StartupWaiter) -> Self {
        self.waiter = waiter;
        self
    }

    /// Spawns the host and waits for `endpoint` to start listening.
    ///
    /// Hosts load plugins and assets before their server comes up, so
    /// this polls on the launcher's [`StartupWaiter`] budget. On
    /// [`scenelink_core::LinkError::StartupTimeout`] the spawned
    /// process is left running — it may simply be slow, and the user
    /// can attach once it finishes loading.
    pub async fn launch(&self, endpoint: &Endpoint) -> Result<RunningHost, CtlError> {
        info!(
            "launching {} {}",
            self.executable.display(),
            self.args.join(" ")
        );
        let child = Command::new(&self.executable).args(&self.args).spawn()?;

        self.waiter.wait_for_listener(endpoint).await?;
        info!(%endpoint, "host is up");
        Ok(RunningHost {
            child,
            endpoint: endpoint.clone(),
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────
