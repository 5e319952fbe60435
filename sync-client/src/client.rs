//! IdentityClient - the main interface for Keysync.
//!
//! This module provides [`IdentityClient`], the composition root that
//! applications hold for the lifetime of a session.
//!
//! # Architecture
//!
//! The client wires the one-pass orchestrator ([`crate::sync::SyncService`])
//! to the single-flight lock, the persisted synced flag, and an observable
//! sync state:
//!
//! ```text
//! Application → IdentityClient → collaborator traits → backend
//!                    ↓
//!              sync-core (pure decisions)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use keysync_client::{IdentityClient, MemoryFlagStore, MockApi, MockSession, MockSigner, MockVault};
//!
//! let client = IdentityClient::new(vault, signer, api, session, flags);
//! client.hydrate().await;
//!
//! let outcome = client.sync().await?;
//! println!("signed in as {}", outcome.user.id);
//! ```

use crate::api::{
    FlagStore, IdentityApi, IdentityVault, RegistrationSigner, SessionExpiryHook, SessionGateway,
    SYNCED_FLAG_KEY,
};
use crate::coordinator::SyncCoordinator;
use crate::sync::{SyncOptions, SyncService};
use async_trait::async_trait;
use keysync_types::{ApiError, SyncError, SyncOutcome, SyncState};
use std::sync::Arc;
use tokio::sync::watch;

/// Composition root for identity sync.
///
/// Owns the sync lock, the orchestrator, the persisted synced flag, and an
/// observable [`SyncState`]. One instance per identity-consuming session.
pub struct IdentityClient {
    service: SyncService,
    coordinator: SyncCoordinator,
    vault: Arc<dyn IdentityVault>,
    api: Arc<dyn IdentityApi>,
    session: Arc<dyn SessionGateway>,
    flags: Arc<dyn FlagStore>,
    state: watch::Sender<SyncState>,
}

impl IdentityClient {
    /// Create a client over the given collaborators.
    ///
    /// The in-memory state starts cold; call [`hydrate`] at startup to load
    /// the persisted synced flag into it.
    ///
    /// [`hydrate`]: IdentityClient::hydrate
    pub fn new(
        vault: Arc<dyn IdentityVault>,
        signer: Arc<dyn RegistrationSigner>,
        api: Arc<dyn IdentityApi>,
        session: Arc<dyn SessionGateway>,
        flags: Arc<dyn FlagStore>,
    ) -> Self {
        let service = SyncService::new(
            Arc::clone(&vault),
            signer,
            Arc::clone(&api),
            Arc::clone(&session),
        );
        let (state, _) = watch::channel(SyncState::default());
        Self {
            service,
            coordinator: SyncCoordinator::new(),
            vault,
            api,
            session,
            flags,
            state,
        }
    }

    /// Load the persisted synced flag into the observable state.
    pub async fn hydrate(&self) {
        let synced = self.is_identity_synced().await;
        self.state.send_modify(|s| s.is_synced = synced);
    }

    /// Current sync state snapshot.
    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    /// Subscribe to sync state changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Whether a sync attempt is currently in flight.
    pub fn is_syncing(&self) -> bool {
        self.state().is_syncing
    }

    /// Whether a user session is currently active.
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Whether a local identity exists.
    pub async fn has_identity(&self) -> bool {
        self.vault.has_identity().await
    }

    /// Probe the identity service.
    pub async fn health_check(&self) -> Result<(), ApiError> {
        self.api.health_check().await
    }

    /// Advisory read of the persisted synced flag.
    ///
    /// Lock-free; may observe a slightly stale value while a sync is in
    /// flight. The value gates the fast path, it is not a correctness
    /// lock.
    pub async fn is_identity_synced(&self) -> bool {
        self.flags.get_item(SYNCED_FLAG_KEY).await.as_deref() == Some("true")
    }

    /// Cancel an in-flight sync attempt, if any.
    ///
    /// Idempotent. The attempt stops at its next checkpoint and reports
    /// [`SyncError::Aborted`].
    pub fn cancel_sync(&self) {
        self.coordinator.release();
    }

    /// The sync lock (exposed for composition and testing).
    pub fn coordinator(&self) -> &SyncCoordinator {
        &self.coordinator
    }

    /// Reconcile the local identity with the server.
    ///
    /// Acquires the single-flight lock (failing fast with
    /// [`SyncError::AlreadyInProgress`]), runs one orchestrator pass, and
    /// persists the synced flag on success. `is_syncing` returns to false
    /// on every exit path.
    pub async fn sync(&self) -> Result<SyncOutcome, SyncError> {
        let guard = self.coordinator.acquire()?;
        self.ensure_vault_integrity().await;

        self.state.send_modify(|s| s.is_syncing = true);
        let already_synced = self.is_identity_synced().await;
        let hook = Arc::new(ClearSyncedFlag {
            flags: Arc::clone(&self.flags),
            state: self.state.clone(),
        });

        let result = self
            .service
            .sync_with_server(SyncOptions {
                already_synced,
                signal: Some(guard.signal()),
                on_session_expired: Some(hook as Arc<dyn SessionExpiryHook>),
                request_timeout: None,
            })
            .await;

        match &result {
            Ok(outcome) => {
                self.flags.set_item(SYNCED_FLAG_KEY, "true").await;
                self.state.send_modify(|s| {
                    s.is_synced = true;
                    s.is_syncing = false;
                });
                if outcome.was_registered {
                    self.vault.backup().await;
                }
                tracing::info!(was_registered = outcome.was_registered, "identity synced");
            }
            Err(e) => {
                self.state.send_modify(|s| s.is_syncing = false);
                if !e.is_aborted() {
                    tracing::debug!("identity sync failed: {e}");
                }
            }
        }

        drop(guard);
        result
    }

    /// Best-effort integrity care before touching the network: a corrupt
    /// vault gets one restore attempt so the sync pass sees the repaired
    /// identity.
    async fn ensure_vault_integrity(&self) {
        if !self.vault.has_identity().await {
            return;
        }
        if self.vault.verify_integrity().await {
            return;
        }
        tracing::warn!("identity integrity check failed, attempting restore");
        if self.vault.restore_from_backup().await {
            tracing::info!("identity restored from backup");
        } else {
            tracing::warn!("identity restore failed");
        }
    }
}

/// Expiry hook wired into every sync pass: clears the persisted flag so the
/// registration path runs, and mirrors the clear into the observable state.
struct ClearSyncedFlag {
    flags: Arc<dyn FlagStore>,
    state: watch::Sender<SyncState>,
}

#[async_trait]
impl SessionExpiryHook for ClearSyncedFlag {
    async fn on_session_expired(&self) {
        tracing::info!("server session invalid, clearing synced flag");
        self.flags.remove_item(SYNCED_FLAG_KEY).await;
        self.state.send_modify(|s| s.is_synced = false);
    }
}
