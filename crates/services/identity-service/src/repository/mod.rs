//! Repository layer for data access.

pub mod entities;
mod identity_repository;

#[cfg(any(test, feature = "test-utils"))]
pub use identity_repository::MockIdentityRepository;
pub use identity_repository::{IdSequence, IdentityRepository, IdentityStore};
