//! Identity and session record types for Keysync.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque public-key token for a locally held identity.
///
/// The keypair itself lives in the key-management collaborator; only this
/// encoded token crosses into the sync core, and it is handed back to
/// collaborators unchanged.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(String);

impl PublicKey {
    /// Wrap an encoded public-key token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(8).collect();
        write!(f, "PublicKey({prefix})")
    }
}

/// An authenticated user record returned by the sign-in collaborator.
///
/// Opaque to the sync core; it is returned to the caller as part of a
/// [`SyncOutcome`] and never persisted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Server-assigned account identifier.
    pub id: String,
    /// Chosen username, if the account has one yet.
    pub username: Option<String>,
}

/// A freshly created registration signature from the signature collaborator.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationSignature {
    /// The encoded signature over the registration payload.
    pub signature: String,
    /// Unix timestamp (milliseconds) the signature was created at.
    pub timestamp: u64,
}

impl fmt::Debug for RegistrationSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationSignature")
            .field(
                "signature",
                &format!("[{} chars REDACTED]", self.signature.len()),
            )
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

/// Result of one identity sync pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// The signed-in user.
    pub user: UserRecord,
    /// Whether this pass registered the key (as opposed to the key already
    /// being known to the server).
    pub was_registered: bool,
}
