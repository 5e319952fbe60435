//! Single-flight guard for sync attempts.
//!
//! At most one logical sync operation may run at a time. A second caller
//! fails fast with `AlreadyInProgress` instead of queueing: sync attempts
//! are safe to skip, and both trigger sources (a user action, the reconnect
//! monitor) simply drop their turn on rejection. Holding the lock yields a
//! cancellation token that in-flight work checks at its defined
//! checkpoints.
//!
//! The coordinator is an injected instance, not a process global; the
//! composition root that owns the application lifetime owns it.

use keysync_types::SyncError;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Single-flight lock over sync attempts.
///
/// Cloning shares the underlying slot, so every clone guards the same
/// logical operation.
#[derive(Debug, Default, Clone)]
pub struct SyncCoordinator {
    inner: Arc<Mutex<CoordinatorInner>>,
}

#[derive(Debug, Default)]
struct CoordinatorInner {
    held: Option<HeldLock>,
    next_generation: u64,
}

#[derive(Debug)]
struct HeldLock {
    generation: u64,
    token: CancellationToken,
}

impl SyncCoordinator {
    /// Create an unheld coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock, failing fast when it is already held.
    ///
    /// Check-and-set happens under one mutex, so there is no separate
    /// check-then-acquire window.
    pub fn acquire(&self) -> Result<SyncGuard, SyncError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.held.is_some() {
            return Err(SyncError::AlreadyInProgress);
        }

        let generation = inner.next_generation;
        inner.next_generation += 1;
        let token = CancellationToken::new();
        inner.held = Some(HeldLock {
            generation,
            token: token.clone(),
        });

        Ok(SyncGuard {
            slot: Arc::clone(&self.inner),
            generation,
            token,
            released: false,
        })
    }

    /// Release whatever lock is currently held.
    ///
    /// Idempotent; a no-op when nothing is held. Fires the held lock's
    /// cancellation token so in-flight work can stop at its next
    /// checkpoint.
    pub fn release(&self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(held) = inner.held.take() {
            held.token.cancel();
        }
    }

    /// Whether a lock is currently held.
    ///
    /// Read-only introspection; not a substitute for [`acquire`]'s
    /// atomicity.
    ///
    /// [`acquire`]: SyncCoordinator::acquire
    pub fn is_locked(&self) -> bool {
        self.inner.lock().unwrap().held.is_some()
    }
}

/// A held sync lock.
///
/// Releasing (explicitly or on drop) fires the cancellation token and
/// clears the coordinator slot.
#[derive(Debug)]
pub struct SyncGuard {
    slot: Arc<Mutex<CoordinatorInner>>,
    generation: u64,
    token: CancellationToken,
    released: bool,
}

impl SyncGuard {
    /// The cancellation signal observers poll at their checkpoints.
    pub fn signal(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Release explicitly. Equivalent to dropping the guard.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.token.cancel();

        let mut inner = self.slot.lock().unwrap();
        // Only clear the slot while it still belongs to this guard; a
        // standalone release may already have handed it to a newer acquire.
        if inner
            .held
            .as_ref()
            .is_some_and(|held| held.generation == self.generation)
        {
            inner.held = None;
        }
    }
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.release_inner();
    }
}
