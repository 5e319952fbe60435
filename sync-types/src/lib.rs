//! # sync-types
//!
//! Shared types for the Keysync identity synchronization core.
//!
//! This crate provides the foundational types used across all Keysync crates:
//! - [`PublicKey`], [`UserRecord`], [`RegistrationSignature`] - Identity and session types
//! - [`SyncOutcome`], [`SyncState`] - Sync results and progress flags
//! - [`SyncError`], [`ApiError`], [`ApiErrorKind`] - Error types and classification

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod identity;
mod state;

pub use error::{ApiError, ApiErrorKind, SyncError};
pub use identity::{PublicKey, RegistrationSignature, SyncOutcome, UserRecord};
pub use state::SyncState;
