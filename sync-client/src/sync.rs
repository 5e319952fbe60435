//! One-pass identity sync against the remote identity service.
//!
//! [`SyncService`] performs a single sign-in-or-register-then-sign-in pass:
//!
//! ```text
//! public key ── already synced? ──► sign in ──► done (fast path)
//!                     │                 │ session invalid
//!                     ▼                 ▼
//!              registration check ◄─────┘
//!                     │ not registered
//!                     ▼
//!              sign + register (409 = already ours)
//!                     │
//!                     ▼
//!                  sign in ──► done
//! ```
//!
//! One attempt, deterministic outcome: the service never retries. Retry
//! timing, backoff, and circuit breaking live exclusively in the reconnect
//! monitor.

use crate::api::{
    IdentityApi, IdentityVault, RegistrationSigner, SessionExpiryHook, SessionGateway,
};
use keysync_types::{SyncError, SyncOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Options for one sync pass.
#[derive(Default)]
pub struct SyncOptions {
    /// The caller's persisted view: has this identity synced before?
    /// Enables the fast path that skips the registration protocol.
    pub already_synced: bool,

    /// Cancellation signal checked at the protocol checkpoints (start,
    /// before the registration check, before registering). An in-flight
    /// network call is never interrupted; the signal only prevents
    /// starting the next step.
    pub signal: Option<CancellationToken>,

    /// Invoked at most once when the fast-path session proves unusable,
    /// before the flow falls back to the registration path.
    pub on_session_expired: Option<Arc<dyn SessionExpiryHook>>,

    /// Deadline seam for collaborator calls. Not enforced: the sync flow
    /// runs without network timeouts, and a deadline can be wired in here
    /// later without changing the call contract.
    pub request_timeout: Option<Duration>,
}

/// Stateless identity sync orchestrator.
///
/// Owns handles to the four collaborators and performs one sync pass per
/// [`sync_with_server`] call.
///
/// [`sync_with_server`]: SyncService::sync_with_server
pub struct SyncService {
    vault: Arc<dyn IdentityVault>,
    signer: Arc<dyn RegistrationSigner>,
    api: Arc<dyn IdentityApi>,
    session: Arc<dyn SessionGateway>,
}

impl SyncService {
    /// Create a service over the given collaborators.
    pub fn new(
        vault: Arc<dyn IdentityVault>,
        signer: Arc<dyn RegistrationSigner>,
        api: Arc<dyn IdentityApi>,
        session: Arc<dyn SessionGateway>,
    ) -> Self {
        Self {
            vault,
            signer,
            api,
            session,
        }
    }

    /// Reconcile the local identity with the server in one pass.
    ///
    /// Fails with [`SyncError::NoIdentity`] before any network call when no
    /// local key exists, and with [`SyncError::Aborted`] when the signal
    /// fires between steps. All other collaborator errors pass through
    /// unchanged, except the classified swallows documented on each step.
    pub async fn sync_with_server(&self, options: SyncOptions) -> Result<SyncOutcome, SyncError> {
        let key = self.vault.public_key().await.ok_or(SyncError::NoIdentity)?;
        ensure_live(options.signal.as_ref())?;

        if options.already_synced {
            match self.session.sign_in(&key).await {
                Ok(user) => {
                    tracing::debug!("fast-path sign-in succeeded");
                    return Ok(SyncOutcome {
                        user,
                        was_registered: false,
                    });
                }
                Err(e) if e.is_invalid_session() => {
                    // The server no longer honors our assumed state; let
                    // the caller clear its flag and fall through to the
                    // full registration path.
                    tracing::info!("fast-path session unusable ({e}), falling back");
                    if let Some(hook) = &options.on_session_expired {
                        hook.on_session_expired().await;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        ensure_live(options.signal.as_ref())?;
        let registered = match self.api.check_public_key_registered(&key).await {
            Ok(registered) => registered,
            Err(e) => {
                // Fail open toward re-registration rather than blocking.
                tracing::debug!("registration check failed ({e}), assuming unregistered");
                false
            }
        };

        ensure_live(options.signal.as_ref())?;
        if !registered {
            let signature = self.signer.create_registration_signature().await?;
            match self.api.register(&key, &signature).await {
                Ok(()) => tracing::debug!("registered public key"),
                Err(e) if e.is_conflict() => {
                    tracing::debug!("key already registered by another device");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let user = self.session.sign_in(&key).await?;
        Ok(SyncOutcome {
            user,
            was_registered: !registered,
        })
    }
}

fn ensure_live(signal: Option<&CancellationToken>) -> Result<(), SyncError> {
    match signal {
        Some(token) if token.is_cancelled() => Err(SyncError::Aborted),
        _ => Ok(()),
    }
}
