//! Identity domain entity and related types.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{FIELD_EMAIL, FIELD_ID, MIN_NAME_LENGTH};
use crate::credential::{Credential, CredentialHasher};
use crate::error::{DomainError, DomainResult};
use crate::ids::{IdentityId, OrderId, RoleId};

/// Identity domain entity (a registered user account).
///
/// `id`, `email` and the credential salt are fixed once set. The salt only
/// changes together with the password hash through [`Identity::change_password`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    id: Option<IdentityId>,
    email: String,
    first_name: String,
    last_name: String,
    credential: Credential,
    active: bool,
    roles: BTreeSet<RoleId>,
    orders: BTreeSet<OrderId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Identity {
    /// Create a new identity, hashing `password` with the default hasher.
    pub fn create(
        email: &str,
        first_name: &str,
        last_name: &str,
        password: &str,
    ) -> DomainResult<Self> {
        Self::create_with(&CredentialHasher::default(), email, first_name, last_name, password)
    }

    /// Create a new identity, hashing `password` with `hasher`.
    ///
    /// The identity starts active with no roles or orders and without an id;
    /// the id is assigned by the persistence layer on first save.
    ///
    /// # Errors
    /// * `InvalidCredential` if `password` is empty
    /// * `Validation` if the email or a name is empty
    pub fn create_with(
        hasher: &CredentialHasher,
        email: &str,
        first_name: &str,
        last_name: &str,
        password: &str,
    ) -> DomainResult<Self> {
        let email = validate_email(email)?;
        let first_name = validate_name("First name", first_name)?;
        let last_name = validate_name("Last name", last_name)?;
        let credential = hasher.hash(password)?;

        let now = Utc::now();
        Ok(Self {
            id: None,
            email,
            first_name,
            last_name,
            credential,
            active: true,
            roles: BTreeSet::new(),
            orders: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Create a new identity from a sign-up request.
    pub fn from_sign_up(hasher: &CredentialHasher, sign_up: &SignUp) -> DomainResult<Self> {
        Self::create_with(
            hasher,
            &sign_up.email,
            &sign_up.first_name,
            &sign_up.last_name,
            &sign_up.password,
        )
    }

    pub fn id(&self) -> Option<IdentityId> {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// The salted hash, never the plaintext.
    pub fn password(&self) -> &str {
        self.credential.password()
    }

    pub fn salt(&self) -> &str {
        self.credential.salt()
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn roles(&self) -> &BTreeSet<RoleId> {
        &self.roles
    }

    pub fn orders(&self) -> &BTreeSet<OrderId> {
        &self.orders
    }

    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Check a candidate password against the stored credential.
    pub fn verify(&self, candidate: &str) -> bool {
        self.credential.verify(candidate)
    }

    /// Replace the credential with a fresh salt and hash of `new_password`.
    ///
    /// # Errors
    /// Returns `InvalidCredential` if `new_password` is empty; the old
    /// credential is kept in that case.
    pub fn change_password(
        &mut self,
        hasher: &CredentialHasher,
        new_password: &str,
    ) -> DomainResult<()> {
        self.credential = hasher.hash(new_password)?;
        self.touch();
        Ok(())
    }

    /// Inject the identifier allocated by the persistence layer.
    ///
    /// # Errors
    /// Returns `ImmutableField("id")` if an id is already assigned.
    pub fn assign_id(&mut self, id: IdentityId) -> DomainResult<()> {
        if self.id.is_some() {
            return Err(DomainError::ImmutableField(FIELD_ID));
        }
        self.id = Some(id);
        Ok(())
    }

    /// Check that `email` matches the address fixed at creation.
    ///
    /// # Errors
    /// Returns `ImmutableField("email")` on any difference.
    pub fn confirm_email(&self, email: &str) -> DomainResult<()> {
        if email.trim() != self.email {
            return Err(DomainError::ImmutableField(FIELD_EMAIL));
        }
        Ok(())
    }

    pub fn set_first_name(&mut self, first_name: &str) -> DomainResult<()> {
        self.first_name = validate_name("First name", first_name)?;
        self.touch();
        Ok(())
    }

    pub fn set_last_name(&mut self, last_name: &str) -> DomainResult<()> {
        self.last_name = validate_name("Last name", last_name)?;
        self.touch();
        Ok(())
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        self.touch();
    }

    /// Add a role. Returns `false` if it was already present.
    pub fn add_role(&mut self, role: RoleId) -> bool {
        let inserted = self.roles.insert(role);
        if inserted {
            self.touch();
        }
        inserted
    }

    /// Remove a role. Returns `false` if it was not present.
    pub fn remove_role(&mut self, role: RoleId) -> bool {
        let removed = self.roles.remove(&role);
        if removed {
            self.touch();
        }
        removed
    }

    /// Replace the whole role set.
    pub fn set_roles(&mut self, roles: impl IntoIterator<Item = RoleId>) {
        self.roles = roles.into_iter().collect();
        self.touch();
    }

    /// Add an order. Returns `false` if it was already present.
    pub fn add_order(&mut self, order: OrderId) -> bool {
        let inserted = self.orders.insert(order);
        if inserted {
            self.touch();
        }
        inserted
    }

    /// Remove an order. Returns `false` if it was not present.
    pub fn remove_order(&mut self, order: OrderId) -> bool {
        let removed = self.orders.remove(&order);
        if removed {
            self.touch();
        }
        removed
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn validate_email(email: &str) -> DomainResult<String> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(DomainError::validation("Email must be a non-empty address"));
    }
    Ok(email.to_string())
}

fn validate_name(field: &str, name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.chars().count() < MIN_NAME_LENGTH {
        return Err(DomainError::validation(format!(
            "{} must be at least {} character(s)",
            field, MIN_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

/// Sign-up request supplied by registration intake
#[derive(Clone, Deserialize)]
pub struct SignUp {
    /// Email address
    pub email: String,
    /// First and middle name(s)
    pub first_name: String,
    /// Surname
    pub last_name: String,
    /// Plaintext password
    pub password: String,
}

impl std::fmt::Debug for SignUp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignUp")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl TryFrom<SignUp> for Identity {
    type Error = DomainError;

    fn try_from(sign_up: SignUp) -> DomainResult<Self> {
        Identity::from_sign_up(&CredentialHasher::default(), &sign_up)
    }
}

/// Profile update data transfer object
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateIdentity {
    /// New first name
    pub first_name: Option<String>,
    /// New last name
    pub last_name: Option<String>,
    /// Must match the stored email if present
    pub email: Option<String>,
}

/// Full storage snapshot of an identity, credential included.
///
/// Only for the persistence boundary; use [`IdentityResponse`] for anything
/// that leaves the service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<IdentityId>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub salt: String,
    pub active: bool,
    #[serde(default)]
    pub roles: Vec<RoleId>,
    #[serde(default)]
    pub orders: Vec<OrderId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for IdentityRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("password", &"[REDACTED]")
            .field("salt", &"[REDACTED]")
            .field("active", &self.active)
            .field("roles", &self.roles)
            .field("orders", &self.orders)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl From<&Identity> for IdentityRecord {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            email: identity.email.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            password: identity.password().to_string(),
            salt: identity.salt().to_string(),
            active: identity.active,
            roles: identity.roles.iter().copied().collect(),
            orders: identity.orders.iter().copied().collect(),
            created_at: identity.created_at,
            updated_at: identity.updated_at,
        }
    }
}

/// Convert stored record back to a domain entity
impl From<IdentityRecord> for Identity {
    fn from(record: IdentityRecord) -> Self {
        Self {
            id: record.id,
            email: record.email,
            first_name: record.first_name,
            last_name: record.last_name,
            credential: Credential::from_parts(record.password, record.salt),
            active: record.active,
            roles: record.roles.into_iter().collect(),
            orders: record.orders.into_iter().collect(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Identity response (safe to return to client)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityResponse {
    /// Identifier, absent until persisted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<IdentityId>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub active: bool,
    pub roles: Vec<RoleId>,
    pub orders: Vec<OrderId>,
    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
}

impl From<&Identity> for IdentityResponse {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            email: identity.email.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            active: identity.active,
            roles: identity.roles.iter().copied().collect(),
            orders: identity.orders.iter().copied().collect(),
            created_at: identity.created_at,
        }
    }
}

impl From<Identity> for IdentityResponse {
    fn from(identity: Identity) -> Self {
        IdentityResponse::from(&identity)
    }
}
