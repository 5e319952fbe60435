//! # sync-client
//!
//! Client library for the Keysync identity synchronization core.
//!
//! This is the crate applications use to keep a locally created
//! cryptographic identity reconciled with the remote identity service.
//!
//! ## Features
//!
//! - **One-pass orchestration**: sign-in-or-register-then-sign-in, no
//!   internal retries
//! - **Single-flight lock**: concurrent sync triggers fail fast instead of
//!   duplicating work
//! - **Reconnect monitor**: health-probe polling with circuit-breaker
//!   backoff, driven by the pure decisions in `keysync-core`
//! - **Trait seams**: key management, signing, the remote API, sign-in,
//!   and flag persistence are pluggable collaborators with in-process
//!   mocks
//!
//! ## Example
//!
//! ```ignore
//! use keysync_client::{IdentityClient, ReconnectMonitor};
//! use keysync_core::BreakerConfig;
//!
//! let client = Arc::new(IdentityClient::new(vault, signer, api, session, flags));
//! client.hydrate().await;
//!
//! // Foreground: sync on demand.
//! let outcome = client.sync().await?;
//!
//! // Background: resync when the network comes back.
//! let monitor = ReconnectMonitor::spawn(client.clone(), BreakerConfig::default());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod client;
pub mod coordinator;
pub mod mock;
pub mod monitor;
pub mod sync;

pub use api::{
    FlagStore, IdentityApi, IdentityVault, MemoryFlagStore, RegistrationSigner, SessionExpiryHook,
    SessionGateway, UnsupportedFlagStore, SYNCED_FLAG_KEY,
};
pub use client::IdentityClient;
pub use coordinator::{SyncCoordinator, SyncGuard};
pub use mock::{CallLog, MockApi, MockSession, MockSigner, MockVault, RecordingExpiryHook};
pub use monitor::ReconnectMonitor;
pub use sync::{SyncOptions, SyncService};
