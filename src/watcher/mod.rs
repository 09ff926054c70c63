//! Waiting for a connection to become active.
//!
//! The watcher only reads connection snapshots; it never changes status.
//! Timing out or cancelling a wait leaves the connection as it was.

use crate::connection::{Connection, ConnectionStatus, ConnectionStore};
use crate::error::{ConnectError, FailureReason};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;


/// Default polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Longest wait honored; larger timeouts are clamped
const MAX_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

/// Polls connection status until it settles.
#[derive(Clone)]
pub struct ActivationWatcher {
    connections: Arc<ConnectionStore>,
    poll_interval: Duration,
}

impl ActivationWatcher {
    pub fn new(connections: Arc<ConnectionStore>, poll_interval: Duration) -> Self {
        Self {
            connections,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Wait until the connection is `ACTIVE`.
    ///
    /// # Arguments
    /// * `connection_id` - Connection to watch
    /// * `timeout` - Upper bound on the wait; zero checks exactly once
    ///
    /// # Errors
    /// `ConnectionFailed` once the connection is `FAILED` or `EXPIRED`,
    /// `ConnectionTimeout` if it is still initiated or pending at the deadline.
    pub async fn wait_until_active(
        &self,
        connection_id: &str,
        timeout: Duration,
    ) -> Result<Connection, ConnectError> {
        self.wait_until_active_with_cancel(connection_id, timeout, &CancellationToken::new())
            .await
    }

    /// Like [`wait_until_active`](Self::wait_until_active), but stops with
    /// `WaitCancelled` as soon as `cancel` fires.
    pub async fn wait_until_active_with_cancel(
        &self,
        connection_id: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Connection, ConnectError> {
        let started = Instant::now();
        let deadline = started + timeout.min(MAX_WAIT);

        loop {
            if cancel.is_cancelled() {
                return Err(ConnectError::WaitCancelled {
                    id: connection_id.to_string(),
                });
            }

            let connection = self.connections.get(connection_id)?;
            match connection.status {
                ConnectionStatus::Active => return Ok(connection),
                ConnectionStatus::Failed | ConnectionStatus::Expired => {
                    return Err(ConnectError::ConnectionFailed {
                        id: connection.id,
                        reason: connection.last_error.unwrap_or(FailureReason::Expired),
                    });
                }
                ConnectionStatus::Initiated | ConnectionStatus::Pending => {}
            }

            let now = Instant::now();
            if now >= deadline {
                debug!(
                    connection_id = %connection_id,
                    status = %connection.status,
                    "Wait timed out"
                );
                return Err(ConnectError::ConnectionTimeout {
                    id: connection_id.to_string(),
                    waited: now - started,
                });
            }

            let wake = (now + self.poll_interval).min(deadline);
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep_until(wake) => {}
            }
        }
    }
}
