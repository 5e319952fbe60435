//! Collaborator seams for the Keysync sync flow.
//!
//! The sync core is a pure orchestration layer: key management, signing,
//! the remote identity service, session sign-in, and flag persistence all
//! live behind the traits in this module. Each seam is an async trait so
//! production implementations (platform key stores, HTTP clients) and the
//! in-process mocks in [`crate::mock`] are interchangeable.

use async_trait::async_trait;
use keysync_types::{ApiError, PublicKey, RegistrationSignature, UserRecord};
use std::collections::HashMap;
use std::sync::Mutex;

/// Storage key for the persisted synced flag.
pub const SYNCED_FLAG_KEY: &str = "keysync.identity_synced";

/// Key-management collaborator holding the local identity keypair.
///
/// The keypair is created and destroyed exclusively by the implementation;
/// the sync core only ever reads the public token.
#[async_trait]
pub trait IdentityVault: Send + Sync {
    /// The public key of the local identity, if one exists.
    async fn public_key(&self) -> Option<PublicKey>;

    /// Whether a local identity exists at all.
    async fn has_identity(&self) -> bool;

    /// Verify the stored key material is intact.
    async fn verify_integrity(&self) -> bool;

    /// Attempt to restore the identity from its backup.
    ///
    /// Returns whether the restore succeeded.
    async fn restore_from_backup(&self) -> bool;

    /// Refresh the identity backup.
    async fn backup(&self);
}

/// Signature collaborator producing registration proofs.
#[async_trait]
pub trait RegistrationSigner: Send + Sync {
    /// Create a fresh signature over the registration payload.
    async fn create_registration_signature(&self) -> Result<RegistrationSignature, ApiError>;
}

/// Remote identity service client.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Lightweight liveness probe against the identity service.
    async fn health_check(&self) -> Result<(), ApiError>;

    /// Whether the given public key is registered server-side.
    async fn check_public_key_registered(&self, key: &PublicKey) -> Result<bool, ApiError>;

    /// Register the public key.
    ///
    /// A `Conflict` error means another device registered the key first;
    /// callers treat that as success.
    async fn register(
        &self,
        key: &PublicKey,
        signature: &RegistrationSignature,
    ) -> Result<(), ApiError>;
}

/// Session collaborator: signs in with a public key and tracks the
/// resulting session.
#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// Sign in with the given public key, producing an authenticated user.
    ///
    /// May fail with `SessionExpired` or `NotFound` classified errors when
    /// the server no longer honors the locally assumed state.
    async fn sign_in(&self, key: &PublicKey) -> Result<UserRecord, ApiError>;

    /// Whether a user session is currently active.
    fn is_authenticated(&self) -> bool;
}

/// Callback invoked when the fast-path sign-in finds the session unusable.
///
/// Lets the caller clear its persisted synced flag before the flow falls
/// back to the full registration path. Called at most once per sync pass.
#[async_trait]
pub trait SessionExpiryHook: Send + Sync {
    /// The server rejected the assumed session.
    async fn on_session_expired(&self);
}

/// Persistent key-value store for the synced flag.
///
/// Infallible by contract: implementations degrade internally instead of
/// surfacing storage errors into the sync flow.
#[async_trait]
pub trait FlagStore: Send + Sync {
    /// Read a value. `None` when absent.
    async fn get_item(&self, key: &str) -> Option<String>;

    /// Write a value.
    async fn set_item(&self, key: &str, value: &str);

    /// Delete a value.
    async fn remove_item(&self, key: &str);
}

/// In-process flag store, durable for the life of the process.
#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryFlagStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlagStore for MemoryFlagStore {
    async fn get_item(&self, key: &str) -> Option<String> {
        let items = self.items.lock().unwrap();
        items.get(key).cloned()
    }

    async fn set_item(&self, key: &str, value: &str) {
        let mut items = self.items.lock().unwrap();
        items.insert(key.to_string(), value.to_string());
    }

    async fn remove_item(&self, key: &str) {
        let mut items = self.items.lock().unwrap();
        items.remove(key);
    }
}

/// Flag store for platforms without a storage capability.
///
/// Writes vanish and reads report the assume-synced default, so a fresh
/// process on such a platform never re-runs a registration it cannot
/// remember. The store is scoped to the synced flag; it is not a general
/// key-value store.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedFlagStore;

impl UnsupportedFlagStore {
    /// Create the degraded store.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FlagStore for UnsupportedFlagStore {
    async fn get_item(&self, _key: &str) -> Option<String> {
        Some("true".to_string())
    }

    async fn set_item(&self, _key: &str, _value: &str) {}

    async fn remove_item(&self, _key: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_roundtrips() {
        let store = MemoryFlagStore::new();
        assert_eq!(store.get_item(SYNCED_FLAG_KEY).await, None);

        store.set_item(SYNCED_FLAG_KEY, "true").await;
        assert_eq!(
            store.get_item(SYNCED_FLAG_KEY).await,
            Some("true".to_string())
        );

        store.remove_item(SYNCED_FLAG_KEY).await;
        assert_eq!(store.get_item(SYNCED_FLAG_KEY).await, None);
    }

    #[tokio::test]
    async fn memory_store_overwrites() {
        let store = MemoryFlagStore::new();
        store.set_item("k", "a").await;
        store.set_item("k", "b").await;
        assert_eq!(store.get_item("k").await, Some("b".to_string()));
    }

    #[tokio::test]
    async fn unsupported_store_assumes_synced() {
        let store = UnsupportedFlagStore::new();
        assert_eq!(
            store.get_item(SYNCED_FLAG_KEY).await,
            Some("true".to_string())
        );

        // Writes vanish; the default persists.
        store.set_item(SYNCED_FLAG_KEY, "false").await;
        store.remove_item(SYNCED_FLAG_KEY).await;
        assert_eq!(
            store.get_item(SYNCED_FLAG_KEY).await,
            Some("true".to_string())
        );
    }
}
