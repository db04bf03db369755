//! Polling for a freshly launched host to open its command port.
//!
//! Content-creation hosts load plugins, fonts, and GPU contexts before
//! their embedded servers come up, so a launcher has to poll. The
//! waiter sleeps first and probes second: the instant after spawn the
//! port is never open, so an immediate probe is a wasted round.

use std::time::Duration;

use tokio::time::sleep;

use crate::error::LinkError;
use crate::network::{Endpoint, PortProbe};

/// Interval × attempts polling loop for host startup.
#[derive(Debug, Clone, Copy)]
pub struct StartupWaiter {
    interval: Duration,
    attempts: u32,
}

impl Default for StartupWaiter {
    /// Conventional launch budget: one probe per second for 30 seconds.
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            attempts: 30,
        }
    }
}

impl StartupWaiter {
    pub fn new(interval: Duration, attempts: u32) -> Self {
        Self { interval, attempts }
    }

    /// Total time the waiter is willing to spend.
    pub fn budget(&self) -> Duration {
        self.interval * self.attempts
    }

    /// Resolves as soon as something is listening on `endpoint`.
    ///
    /// "Listening" is observed as the port no longer being bindable.
    /// If every attempt still finds the port free, the host never came
    /// up and the waiter fails with [`LinkError::StartupTimeout`]
    /// carrying the total time waited. The caller decides whether that
    /// is fatal — the launched process may simply still be loading.
    pub async fn wait_for_listener(&self, endpoint: &Endpoint) -> Result<(), LinkError> {
        for attempt in 1..=self.attempts {
            sleep(self.interval).await;
            if !PortProbe::is_free(endpoint).await {
                tracing::debug!(%endpoint, attempt, "host is listening");
                return Ok(());
            }
        }
        Err(LinkError::StartupTimeout {
            waited: self.budget(),
        })
    }
}
