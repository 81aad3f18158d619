//! Apply with automatic rollback
//!
//! `apply` asks the server to activate committed changes with its rollback
//! timer armed, then keeps calling `confirm` until one succeeds or the
//! deadline passes. If the new configuration cut the client off, no confirm
//! gets through and the server rolls back on its own.

use crate::error::{Error, Result};
use crate::store::{Store, StoreEvent};
use indexmap::IndexMap;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use ucistage_rpc::Rpc;

impl<R: Rpc + 'static> Store<R> {
    /// Apply committed changes and confirm them within `timeout` seconds
    ///
    /// `None` or zero uses the configured default.
    pub async fn apply(&self, timeout: Option<u64>) -> Result<()> {
        self.apply_with_cancel(timeout, &CancellationToken::new())
            .await
    }

    /// Like [`apply`](Self::apply), stopping with [`Error::Cancelled`] when
    /// `cancel` fires
    ///
    /// Cancelling after the apply call went through leaves the server
    /// unconfirmed, so it rolls back when its timer expires.
    pub async fn apply_with_cancel(
        &self,
        timeout: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let timeout = timeout
            .filter(|t| *t >= 1)
            .unwrap_or(self.settings.apply_timeout);
        // No deadline when the timeout is past what the clock can represent.
        let deadline = Instant::now().checked_add(Duration::from_secs(timeout));

        info!(timeout, "Applying changes with rollback");

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            status = self.remote.apply(timeout, true) => status?,
        };

        if !status.is_ok() {
            warn!(%status, "Apply rejected");
            return Err(Error::ApplyRejected(status));
        }

        self.emit(StoreEvent::Applied(timeout));

        let mut delay = self.settings.confirm_delay();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            delay = self.settings.confirm_interval();

            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                attempt = self.remote.confirm() => attempt,
            };

            // Transport failures are retried like non-zero statuses.
            let failure = match attempt {
                Ok(status) if status.is_ok() => {
                    info!("Changes confirmed");
                    self.emit(StoreEvent::Confirmed);
                    return Ok(());
                }
                Ok(status) => {
                    debug!(%status, "Confirm not accepted yet");
                    Error::ConfirmTimeout { status }
                }
                Err(e) => {
                    debug!(error = %e, "Confirm call failed");
                    Error::from(e)
                }
            };

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                warn!(error = %failure, "Giving up on confirm");
                return Err(failure);
            }
        }
    }

    /// Changes pending on the server, keyed by config
    pub async fn changes(&self) -> Result<IndexMap<String, Value>> {
        Ok(self.remote.changes().await?)
    }
}
