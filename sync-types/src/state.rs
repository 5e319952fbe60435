//! Sync progress flags.

use serde::{Deserialize, Serialize};

/// Sync progress for the local identity.
///
/// `is_synced` survives process restarts via the flag-store collaborator;
/// `is_syncing` is transient and always false at process start. A sync
/// attempt must return `is_syncing` to false on every exit path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncState {
    /// The identity has been reconciled with the server at least once.
    pub is_synced: bool,
    /// A sync attempt is currently in flight.
    pub is_syncing: bool,
}
