//! Error types for Keysync.

use std::fmt;
use thiserror::Error;

/// Classification of errors surfaced by remote collaborators.
///
/// A closed set matched by the sync flow, so decisions like "fall back to
/// registration" or "retry next tick" never depend on message substrings.
/// API client implementations classify at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The presented session is invalid or expired.
    SessionExpired,
    /// The account was not found on the server.
    NotFound,
    /// The request timed out.
    Timeout,
    /// The network is unreachable or the connection dropped.
    Network,
    /// The resource already exists (HTTP 409).
    Conflict,
    /// The account has no username yet; expected during onboarding.
    UsernameRequired,
    /// Anything else; passed through unchanged.
    Other,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::SessionExpired => write!(f, "session expired"),
            ApiErrorKind::NotFound => write!(f, "not found"),
            ApiErrorKind::Timeout => write!(f, "timeout"),
            ApiErrorKind::Network => write!(f, "network"),
            ApiErrorKind::Conflict => write!(f, "conflict"),
            ApiErrorKind::UsernameRequired => write!(f, "username required"),
            ApiErrorKind::Other => write!(f, "other"),
        }
    }
}

/// An error from a remote collaborator (API client, signature service,
/// sign-in), tagged with its classification.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    /// Classification used by the sync flow.
    pub kind: ApiErrorKind,
    /// Human-readable detail from the collaborator.
    pub message: String,
}

impl ApiError {
    /// Create an error with an explicit classification.
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a [`ApiErrorKind::SessionExpired`] error.
    pub fn session_expired(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::SessionExpired, message)
    }

    /// Shorthand for a [`ApiErrorKind::NotFound`] error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::NotFound, message)
    }

    /// Shorthand for a [`ApiErrorKind::Timeout`] error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Timeout, message)
    }

    /// Shorthand for a [`ApiErrorKind::Network`] error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Network, message)
    }

    /// Shorthand for a [`ApiErrorKind::Conflict`] error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Conflict, message)
    }

    /// Shorthand for a [`ApiErrorKind::UsernameRequired`] error.
    pub fn username_required(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::UsernameRequired, message)
    }

    /// Shorthand for an unclassified error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Other, message)
    }

    /// The session is unusable: expired, or the account is gone server-side.
    ///
    /// Both trigger the same fallback in the sync flow (clear the synced
    /// flag and re-run the registration path).
    pub fn is_invalid_session(&self) -> bool {
        matches!(
            self.kind,
            ApiErrorKind::SessionExpired | ApiErrorKind::NotFound
        )
    }

    /// Transient connectivity failure; safe to retry on a later tick.
    pub fn is_timeout_or_network(&self) -> bool {
        matches!(self.kind, ApiErrorKind::Timeout | ApiErrorKind::Network)
    }

    /// The resource already exists (HTTP 409 equivalent).
    pub fn is_conflict(&self) -> bool {
        self.kind == ApiErrorKind::Conflict
    }

    /// The account has no username yet.
    pub fn is_username_required(&self) -> bool {
        self.kind == ApiErrorKind::UsernameRequired
    }
}

/// Errors surfaced by identity sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No local identity keypair exists.
    #[error("no local identity")]
    NoIdentity,

    /// Another sync attempt currently holds the lock.
    #[error("sync already in progress")]
    AlreadyInProgress,

    /// The attempt was cancelled via its lock signal.
    #[error("sync aborted")]
    Aborted,

    /// A collaborator failed; the error passes through unchanged.
    #[error("api error: {0}")]
    Api(#[from] ApiError),
}

impl SyncError {
    /// Whether this failure was an intentional cancellation.
    ///
    /// Callers suppress user-facing error messaging for these.
    pub fn is_aborted(&self) -> bool {
        matches!(self, SyncError::Aborted)
    }

    /// Whether this failure is a transient connectivity error.
    pub fn is_timeout_or_network(&self) -> bool {
        matches!(self, SyncError::Api(e) if e.is_timeout_or_network())
    }

    /// Whether this failure means the account has no username yet.
    pub fn is_username_required(&self) -> bool {
        matches!(self, SyncError::Api(e) if e.is_username_required())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ApiError::timeout("request exceeded 30s");
        assert_eq!(err.to_string(), "timeout: request exceeded 30s");

        let err = SyncError::NoIdentity;
        assert_eq!(err.to_string(), "no local identity");
    }

    #[test]
    fn invalid_session_covers_expiry_and_missing_account() {
        assert!(ApiError::session_expired("token expired").is_invalid_session());
        assert!(ApiError::not_found("no such user").is_invalid_session());
        assert!(!ApiError::network("unreachable").is_invalid_session());
    }

    #[test]
    fn timeout_and_network_are_transient() {
        assert!(ApiError::timeout("slow").is_timeout_or_network());
        assert!(ApiError::network("down").is_timeout_or_network());
        assert!(!ApiError::conflict("409").is_timeout_or_network());
    }

    #[test]
    fn sync_error_forwards_classification() {
        let err = SyncError::from(ApiError::timeout("slow"));
        assert!(err.is_timeout_or_network());
        assert!(!err.is_aborted());

        let err = SyncError::from(ApiError::username_required("pick one"));
        assert!(err.is_username_required());
    }

    #[test]
    fn aborted_is_distinct_from_failures() {
        assert!(SyncError::Aborted.is_aborted());
        assert!(!SyncError::NoIdentity.is_aborted());
        assert!(!SyncError::from(ApiError::other("boom")).is_aborted());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncError>();
        assert_send_sync::<ApiError>();
    }
}
