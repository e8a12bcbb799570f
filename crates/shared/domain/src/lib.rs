//! Domain layer - Core identity entity and credential value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.
//! Persistence and intake live in the service crates.

pub mod constants;
pub mod credential;
pub mod error;
pub mod identity;
pub mod ids;

pub use constants::*;
pub use credential::{Credential, CredentialHasher, HashingParams};
pub use error::{DomainError, DomainResult};
pub use identity::{Identity, IdentityRecord, IdentityResponse, SignUp, UpdateIdentity};
pub use ids::{IdentityId, OrderId, RoleId};
