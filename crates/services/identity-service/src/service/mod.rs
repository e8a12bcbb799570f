//! Service layer - identity use cases.

mod identity_service;

pub use identity_service::{check_password_policy, IdentityManager, IdentityService};
