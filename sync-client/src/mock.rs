//! Mock collaborators for testing.
//!
//! Each mock mirrors one trait from [`crate::api`]: shared `Arc<Mutex<..>>`
//! state, `queue_*`/`fail_next_*` knobs, and call counters for verification.
//! Cloning a mock shares its state, so a test can keep a handle while the
//! client owns another.

use crate::api::{
    IdentityApi, IdentityVault, RegistrationSigner, SessionExpiryHook, SessionGateway,
};
use async_trait::async_trait;
use keysync_types::{ApiError, PublicKey, RegistrationSignature, UserRecord};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Shared, ordered record of collaborator calls.
///
/// Attach the same log to several mocks to assert cross-collaborator call
/// order (e.g. check → register → sign-in).
#[derive(Debug, Default, Clone)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<&'static str>>>,
}

impl CallLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded calls, oldest first.
    pub fn entries(&self) -> Vec<&'static str> {
        self.entries.lock().unwrap().clone()
    }

    fn push(&self, entry: &'static str) {
        self.entries.lock().unwrap().push(entry);
    }
}

fn record(log: &Option<CallLog>, entry: &'static str) {
    if let Some(log) = log {
        log.push(entry);
    }
}

// ===========================================
// MockVault
// ===========================================

/// Mock key-management collaborator.
#[derive(Debug, Default)]
pub struct MockVault {
    inner: Arc<Mutex<VaultInner>>,
}

#[derive(Debug)]
struct VaultInner {
    public_key: Option<PublicKey>,
    integrity_ok: bool,
    restore_succeeds: bool,
    backup_calls: u32,
    restore_calls: u32,
}

impl Default for VaultInner {
    fn default() -> Self {
        Self {
            public_key: None,
            integrity_ok: true,
            restore_succeeds: false,
            backup_calls: 0,
            restore_calls: 0,
        }
    }
}

impl MockVault {
    /// Create a vault with no identity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a vault holding an identity with the given public-key token.
    pub fn with_identity(token: &str) -> Self {
        let vault = Self::default();
        vault.set_public_key(token);
        vault
    }

    /// Install (or replace) the identity.
    pub fn set_public_key(&self, token: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.public_key = Some(PublicKey::new(token));
    }

    /// Remove the identity.
    pub fn clear_identity(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.public_key = None;
    }

    /// Control the integrity verification result.
    pub fn set_integrity(&self, ok: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.integrity_ok = ok;
    }

    /// Control whether restore-from-backup succeeds.
    pub fn set_restore_succeeds(&self, succeeds: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.restore_succeeds = succeeds;
    }

    /// How many times `backup` was called.
    pub fn backup_calls(&self) -> u32 {
        self.inner.lock().unwrap().backup_calls
    }

    /// How many times `restore_from_backup` was called.
    pub fn restore_calls(&self) -> u32 {
        self.inner.lock().unwrap().restore_calls
    }
}

impl Clone for MockVault {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl IdentityVault for MockVault {
    async fn public_key(&self) -> Option<PublicKey> {
        self.inner.lock().unwrap().public_key.clone()
    }

    async fn has_identity(&self) -> bool {
        self.inner.lock().unwrap().public_key.is_some()
    }

    async fn verify_integrity(&self) -> bool {
        self.inner.lock().unwrap().integrity_ok
    }

    async fn restore_from_backup(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        inner.restore_calls += 1;
        if inner.restore_succeeds {
            inner.integrity_ok = true;
        }
        inner.restore_succeeds
    }

    async fn backup(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.backup_calls += 1;
    }
}

// ===========================================
// MockSigner
// ===========================================

/// Mock signature collaborator.
#[derive(Debug, Default)]
pub struct MockSigner {
    inner: Arc<Mutex<SignerInner>>,
}

#[derive(Debug)]
struct SignerInner {
    signature: RegistrationSignature,
    fail_next: Option<ApiError>,
    calls: u32,
    log: Option<CallLog>,
}

impl Default for SignerInner {
    fn default() -> Self {
        Self {
            signature: RegistrationSignature {
                signature: "mock-signature".to_string(),
                timestamp: 1_705_000_000,
            },
            fail_next: None,
            calls: 0,
            log: None,
        }
    }
}

impl MockSigner {
    /// Create a signer producing a fixed mock signature.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cause the next signature creation to fail with the given error.
    pub fn fail_next(&self, error: ApiError) {
        self.inner.lock().unwrap().fail_next = Some(error);
    }

    /// How many signatures were created.
    pub fn calls(&self) -> u32 {
        self.inner.lock().unwrap().calls
    }

    /// Record calls into the given log.
    pub fn attach_log(&self, log: &CallLog) {
        self.inner.lock().unwrap().log = Some(log.clone());
    }
}

impl Clone for MockSigner {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl RegistrationSigner for MockSigner {
    async fn create_registration_signature(&self) -> Result<RegistrationSignature, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        record(&inner.log, "create_signature");
        if let Some(error) = inner.fail_next.take() {
            return Err(error);
        }
        inner.calls += 1;
        Ok(inner.signature.clone())
    }
}

// ===========================================
// MockApi
// ===========================================

/// Mock remote identity service.
#[derive(Debug, Default)]
pub struct MockApi {
    inner: Arc<Mutex<ApiInner>>,
}

#[derive(Debug)]
struct ApiInner {
    healthy: bool,
    health_queue: VecDeque<Result<(), ApiError>>,
    registered: bool,
    fail_next_check: Option<ApiError>,
    fail_next_register: Option<ApiError>,
    health_calls: u32,
    check_calls: u32,
    register_calls: u32,
    last_registration: Option<(PublicKey, RegistrationSignature)>,
    log: Option<CallLog>,
}

impl Default for ApiInner {
    fn default() -> Self {
        Self {
            healthy: true,
            health_queue: VecDeque::new(),
            registered: false,
            fail_next_check: None,
            fail_next_register: None,
            health_calls: 0,
            check_calls: 0,
            register_calls: 0,
            last_registration: None,
            log: None,
        }
    }
}

impl MockApi {
    /// Create a healthy service with no registered keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Control the fallback health probe result (used once the queue is
    /// drained).
    pub fn set_healthy(&self, healthy: bool) {
        self.inner.lock().unwrap().healthy = healthy;
    }

    /// Queue an explicit result for an upcoming health probe.
    pub fn queue_health_result(&self, result: Result<(), ApiError>) {
        self.inner.lock().unwrap().health_queue.push_back(result);
    }

    /// Mark the key as registered (or not) server-side.
    pub fn set_registered(&self, registered: bool) {
        self.inner.lock().unwrap().registered = registered;
    }

    /// Cause the next registration check to fail with the given error.
    pub fn fail_next_check(&self, error: ApiError) {
        self.inner.lock().unwrap().fail_next_check = Some(error);
    }

    /// Cause the next register call to fail with the given error.
    pub fn fail_next_register(&self, error: ApiError) {
        self.inner.lock().unwrap().fail_next_register = Some(error);
    }

    /// How many health probes were made.
    pub fn health_calls(&self) -> u32 {
        self.inner.lock().unwrap().health_calls
    }

    /// How many registration checks were made.
    pub fn check_calls(&self) -> u32 {
        self.inner.lock().unwrap().check_calls
    }

    /// How many register calls were made.
    pub fn register_calls(&self) -> u32 {
        self.inner.lock().unwrap().register_calls
    }

    /// The key and signature from the most recent register call.
    pub fn last_registration(&self) -> Option<(PublicKey, RegistrationSignature)> {
        self.inner.lock().unwrap().last_registration.clone()
    }

    /// Record calls into the given log.
    pub fn attach_log(&self, log: &CallLog) {
        self.inner.lock().unwrap().log = Some(log.clone());
    }
}

impl Clone for MockApi {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl IdentityApi for MockApi {
    async fn health_check(&self) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.health_calls += 1;
        record(&inner.log, "health_check");
        if let Some(result) = inner.health_queue.pop_front() {
            return result;
        }
        if inner.healthy {
            Ok(())
        } else {
            Err(ApiError::network("health probe failed"))
        }
    }

    async fn check_public_key_registered(&self, _key: &PublicKey) -> Result<bool, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_calls += 1;
        record(&inner.log, "check_registered");
        if let Some(error) = inner.fail_next_check.take() {
            return Err(error);
        }
        Ok(inner.registered)
    }

    async fn register(
        &self,
        key: &PublicKey,
        signature: &RegistrationSignature,
    ) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.register_calls += 1;
        record(&inner.log, "register");
        if let Some(error) = inner.fail_next_register.take() {
            return Err(error);
        }
        inner.registered = true;
        inner.last_registration = Some((key.clone(), signature.clone()));
        Ok(())
    }
}

// ===========================================
// MockSession
// ===========================================

/// Mock sign-in collaborator.
#[derive(Debug, Default)]
pub struct MockSession {
    inner: Arc<Mutex<SessionInner>>,
}

#[derive(Debug)]
struct SessionInner {
    sign_in_queue: VecDeque<Result<UserRecord, ApiError>>,
    default_user: UserRecord,
    authenticated: bool,
    sign_in_calls: u32,
    log: Option<CallLog>,
}

impl Default for SessionInner {
    fn default() -> Self {
        Self {
            sign_in_queue: VecDeque::new(),
            default_user: UserRecord {
                id: "acct_1".to_string(),
                username: Some("mock-user".to_string()),
            },
            authenticated: false,
            sign_in_calls: 0,
            log: None,
        }
    }
}

impl MockSession {
    /// Create a signed-out session that accepts any sign-in.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an explicit result for an upcoming sign-in (used before the
    /// default success).
    pub fn queue_sign_in(&self, result: Result<UserRecord, ApiError>) {
        self.inner.lock().unwrap().sign_in_queue.push_back(result);
    }

    /// Force the authenticated flag (a successful sign-in also sets it).
    pub fn set_authenticated(&self, authenticated: bool) {
        self.inner.lock().unwrap().authenticated = authenticated;
    }

    /// How many sign-ins were attempted.
    pub fn sign_in_calls(&self) -> u32 {
        self.inner.lock().unwrap().sign_in_calls
    }

    /// Record calls into the given log.
    pub fn attach_log(&self, log: &CallLog) {
        self.inner.lock().unwrap().log = Some(log.clone());
    }
}

impl Clone for MockSession {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl SessionGateway for MockSession {
    async fn sign_in(&self, _key: &PublicKey) -> Result<UserRecord, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.sign_in_calls += 1;
        record(&inner.log, "sign_in");
        let result = inner
            .sign_in_queue
            .pop_front()
            .unwrap_or_else(|| Ok(inner.default_user.clone()));
        if result.is_ok() {
            inner.authenticated = true;
        }
        result
    }

    fn is_authenticated(&self) -> bool {
        self.inner.lock().unwrap().authenticated
    }
}

// ===========================================
// RecordingExpiryHook
// ===========================================

/// Expiry hook that counts its invocations.
#[derive(Debug, Default)]
pub struct RecordingExpiryHook {
    calls: AtomicU32,
}

impl RecordingExpiryHook {
    /// Create a hook with zero recorded calls.
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the hook fired.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionExpiryHook for RecordingExpiryHook {
    async fn on_session_expired(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===========================================
    // Vault
    // ===========================================

    #[tokio::test]
    async fn vault_starts_without_identity() {
        let vault = MockVault::new();
        assert!(!vault.has_identity().await);
        assert!(vault.public_key().await.is_none());
    }

    #[tokio::test]
    async fn vault_with_identity_exposes_key() {
        let vault = MockVault::with_identity("pk-test");
        assert!(vault.has_identity().await);
        assert_eq!(vault.public_key().await.unwrap().as_str(), "pk-test");
    }

    #[tokio::test]
    async fn vault_restore_repairs_integrity() {
        let vault = MockVault::with_identity("pk-test");
        vault.set_integrity(false);
        vault.set_restore_succeeds(true);

        assert!(!vault.verify_integrity().await);
        assert!(vault.restore_from_backup().await);
        assert!(vault.verify_integrity().await);
        assert_eq!(vault.restore_calls(), 1);
    }

    #[tokio::test]
    async fn vault_clone_shares_state() {
        let vault1 = MockVault::new();
        let vault2 = vault1.clone();

        vault1.set_public_key("pk-shared");
        assert!(vault2.has_identity().await);

        vault2.backup().await;
        assert_eq!(vault1.backup_calls(), 1);
    }

    // ===========================================
    // Signer
    // ===========================================

    #[tokio::test]
    async fn signer_returns_mock_signature() {
        let signer = MockSigner::new();
        let sig = signer.create_registration_signature().await.unwrap();
        assert_eq!(sig.signature, "mock-signature");
        assert_eq!(signer.calls(), 1);
    }

    #[tokio::test]
    async fn signer_forced_failure_is_one_shot() {
        let signer = MockSigner::new();
        signer.fail_next(ApiError::other("hsm unavailable"));

        assert!(signer.create_registration_signature().await.is_err());
        assert!(signer.create_registration_signature().await.is_ok());
    }

    // ===========================================
    // Api
    // ===========================================

    #[tokio::test]
    async fn api_health_queue_takes_priority() {
        let api = MockApi::new();
        api.queue_health_result(Err(ApiError::network("down")));

        assert!(api.health_check().await.is_err());
        // Queue drained; fallback is healthy.
        assert!(api.health_check().await.is_ok());
        assert_eq!(api.health_calls(), 2);
    }

    #[tokio::test]
    async fn api_unhealthy_fallback() {
        let api = MockApi::new();
        api.set_healthy(false);
        let err = api.health_check().await.unwrap_err();
        assert!(err.is_timeout_or_network());
    }

    #[tokio::test]
    async fn api_register_marks_key_registered() {
        let api = MockApi::new();
        let key = PublicKey::new("pk-1");
        let sig = RegistrationSignature {
            signature: "s".to_string(),
            timestamp: 1,
        };

        assert!(!api.check_public_key_registered(&key).await.unwrap());
        api.register(&key, &sig).await.unwrap();
        assert!(api.check_public_key_registered(&key).await.unwrap());

        let (registered_key, _) = api.last_registration().unwrap();
        assert_eq!(registered_key, key);
    }

    #[tokio::test]
    async fn api_forced_failures_are_one_shot() {
        let api = MockApi::new();
        let key = PublicKey::new("pk-1");
        let sig = RegistrationSignature {
            signature: "s".to_string(),
            timestamp: 1,
        };

        api.fail_next_check(ApiError::timeout("slow"));
        assert!(api.check_public_key_registered(&key).await.is_err());
        assert!(api.check_public_key_registered(&key).await.is_ok());

        api.fail_next_register(ApiError::conflict("409"));
        assert!(api.register(&key, &sig).await.is_err());
        assert!(api.register(&key, &sig).await.is_ok());
    }

    // ===========================================
    // Session
    // ===========================================

    #[tokio::test]
    async fn session_default_sign_in_authenticates() {
        let session = MockSession::new();
        assert!(!session.is_authenticated());

        let user = session.sign_in(&PublicKey::new("pk-1")).await.unwrap();
        assert_eq!(user.id, "acct_1");
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn session_queued_failure_does_not_authenticate() {
        let session = MockSession::new();
        session.queue_sign_in(Err(ApiError::session_expired("stale token")));

        assert!(session.sign_in(&PublicKey::new("pk-1")).await.is_err());
        assert!(!session.is_authenticated());
        assert_eq!(session.sign_in_calls(), 1);
    }

    // ===========================================
    // CallLog
    // ===========================================

    #[tokio::test]
    async fn call_log_orders_across_mocks() {
        let log = CallLog::new();
        let api = MockApi::new();
        let session = MockSession::new();
        api.attach_log(&log);
        session.attach_log(&log);

        let key = PublicKey::new("pk-1");
        api.check_public_key_registered(&key).await.unwrap();
        session.sign_in(&key).await.unwrap();

        assert_eq!(log.entries(), vec!["check_registered", "sign_in"]);
    }

    // ===========================================
    // Expiry hook
    // ===========================================

    #[tokio::test]
    async fn recording_hook_counts_calls() {
        let hook = RecordingExpiryHook::new();
        assert_eq!(hook.calls(), 0);
        hook.on_session_expired().await;
        hook.on_session_expired().await;
        assert_eq!(hook.calls(), 2);
    }
}
