//! Reconnect polling loop.
//!
//! Watches the identity service with periodic health probes and, when the
//! network recovers after an offline period, nudges an identity sync for a
//! not-yet-synced local identity. Probe cadence is the breaker interval
//! from `keysync-core`; all retry timing lives here - the orchestrator
//! itself never retries.
//!
//! The remote service offers no connectivity push, so polling is the only
//! available signal. Each tick runs to completion before the next one is
//! scheduled; ticks never overlap.

use crate::client::IdentityClient;
use keysync_core::{BreakerConfig, MonitorState};
use keysync_types::SyncError;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to a spawned reconnect monitor.
pub struct ReconnectMonitor {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

impl ReconnectMonitor {
    /// Spawn the polling loop.
    ///
    /// The first tick runs immediately; each later tick is scheduled only
    /// after the previous one fully settles.
    pub fn spawn(client: Arc<IdentityClient>, config: BreakerConfig) -> Self {
        let stop = CancellationToken::new();
        let token = stop.clone();
        let handle = tokio::spawn(async move {
            run_loop(client, config, token).await;
        });
        Self { stop, handle }
    }

    /// Stop polling.
    ///
    /// Clears the pending timer; no further ticks run. A tick already in
    /// progress finishes first - its in-flight probe or sync call is never
    /// interrupted mid-await.
    pub async fn shutdown(self) {
        self.stop.cancel();
        let _ = self.handle.await;
    }
}

async fn run_loop(client: Arc<IdentityClient>, config: BreakerConfig, stop: CancellationToken) {
    let mut state = MonitorState::new(config);
    tracing::info!(
        interval_ms = state.interval().as_millis() as u64,
        "reconnect monitor started"
    );

    loop {
        state = tick(client.as_ref(), state).await;

        tokio::select! {
            _ = stop.cancelled() => break,
            _ = tokio::time::sleep(state.interval()) => {}
        }
    }

    tracing::info!("reconnect monitor stopped");
}

/// One monitor tick. Never propagates an error; the reschedule in
/// [`run_loop`] happens unconditionally.
async fn tick(client: &IdentityClient, state: MonitorState) -> MonitorState {
    // Cheap skip, not the safety mechanism: overlapping attempts are
    // ultimately serialized by the sync lock.
    if client.is_syncing() || client.is_authenticated() {
        tracing::debug!("tick skipped (sync in flight or signed in)");
        return state;
    }

    match client.health_check().await {
        Err(e) => {
            let next = state.on_probe_failure();
            tracing::debug!(
                failures = next.consecutive_failures(),
                next_probe_ms = next.interval().as_millis() as u64,
                "health probe failed: {e}"
            );
            next
        }
        Ok(()) => {
            // Re-read after the await: a sign-in may have landed meanwhile.
            let (next, attempt) = state.on_probe_success(client.is_authenticated());
            if attempt {
                tracing::info!("network recovered, checking identity sync");
                attempt_sync(client).await;
            }
            next
        }
    }
}

async fn attempt_sync(client: &IdentityClient) {
    if !client.has_identity().await {
        return;
    }
    if client.is_syncing() {
        return;
    }
    if client.is_identity_synced().await {
        return;
    }

    match client.sync().await {
        Ok(outcome) => {
            tracing::info!(
                was_registered = outcome.was_registered,
                "identity synced after reconnect"
            );
        }
        // Expected during onboarding, before a username is chosen.
        Err(e) if e.is_username_required() => {}
        // Transient; the next tick retries.
        Err(e) if e.is_timeout_or_network() => {}
        // Another trigger source won the race; its attempt covers ours.
        Err(SyncError::AlreadyInProgress) => {}
        Err(e) => {
            tracing::warn!("identity sync failed after reconnect: {e}");
        }
    }
}
