//! Identity table rows for the in-memory store.

use chrono::{DateTime, Utc};

use domain::{Identity, IdentityId, IdentityRecord, OrderId, RoleId};

/// Row of the `identity` table. Roles and orders live in association tables.
#[derive(Clone, PartialEq, Eq)]
pub struct Model {
    pub id: IdentityId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Opaque PHC hash string
    pub password: String,
    /// Opaque salt string
    pub salt: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("password", &"[REDACTED]")
            .field("salt", &"[REDACTED]")
            .field("active", &self.active)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl Model {
    /// Build a row for `identity` stored under `id`.
    pub fn from_identity(id: IdentityId, identity: &Identity) -> Self {
        Self {
            id,
            email: identity.email().to_string(),
            first_name: identity.first_name().to_string(),
            last_name: identity.last_name().to_string(),
            password: identity.password().to_string(),
            salt: identity.salt().to_string(),
            active: identity.is_active(),
            created_at: identity.created_at(),
            updated_at: identity.updated_at(),
        }
    }

    /// Convert row plus its association rows to a domain entity.
    pub fn into_identity(self, roles: Vec<RoleId>, orders: Vec<OrderId>) -> Identity {
        Identity::from(IdentityRecord {
            id: Some(self.id),
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            password: self.password,
            salt: self.salt,
            active: self.active,
            roles,
            orders,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
