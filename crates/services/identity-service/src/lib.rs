//! Identity Service Library
//!
//! Registration, credential verification and identity bookkeeping on top of
//! the domain `Identity`. Storage is the in-memory `IdentityStore`; any other
//! backend plugs in through `IdentityRepository`.

pub mod config;
pub mod repository;
pub mod service;

use std::sync::Arc;

use tracing::debug;

use common::AppResult;
use domain::{Identity, IdentityRecord, SignUp};

use crate::config::IdentityServiceConfig;
use crate::repository::IdentityStore;
use crate::service::{check_password_policy, IdentityManager};

/// Build an identity service backed by a fresh in-memory store.
pub fn build_manager(config: &IdentityServiceConfig) -> AppResult<IdentityManager> {
    let hasher = config.hashing.hasher()?;
    debug!(?hasher, "Credential hasher configured");

    let repo = Arc::new(IdentityStore::new());
    IdentityManager::new(repo, hasher, config.password_policy)
}

/// Create an unsaved identity and return its storage record.
///
/// The record carries no id; the persistence layer assigns one on insert.
pub fn create_record(config: &IdentityServiceConfig, sign_up: &SignUp) -> AppResult<IdentityRecord> {
    check_password_policy(&config.password_policy, &sign_up.password)?;

    let hasher = config.hashing.hasher()?;
    let identity = Identity::from_sign_up(&hasher, sign_up)?;
    debug!(email = %identity.email(), "Identity record created");

    Ok(IdentityRecord::from(&identity))
}

/// Check `password` against a stored record.
pub fn verify_record(record: IdentityRecord, password: &str) -> bool {
    Identity::from(record).verify(password)
}
