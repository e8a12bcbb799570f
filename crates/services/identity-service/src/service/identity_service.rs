//! Identity service - Handles registration and credential use cases.
//!
//! SOLID (SRP): Identity lifecycle only. Hashing is delegated to the domain
//! `CredentialHasher`, storage to the `IdentityRepository`.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use common::{AppError, AppResult, OptionExt, PasswordPolicyConfig};
use domain::{
    Credential, CredentialHasher, Identity, IdentityId, OrderId, RoleId, SignUp, UpdateIdentity,
};

use crate::repository::IdentityRepository;

/// Reject passwords that do not satisfy `policy`.
pub fn check_password_policy(policy: &PasswordPolicyConfig, password: &str) -> AppResult<()> {
    if password.is_empty() {
        return Err(AppError::invalid_credential("Password must not be empty"));
    }
    if password.chars().count() < policy.min_length {
        return Err(AppError::invalid_credential(format!(
            "Password must be at least {} characters",
            policy.min_length
        )));
    }
    Ok(())
}

/// Identity service trait for dependency injection.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Register a new identity from a sign-up request
    async fn register(&self, sign_up: SignUp) -> AppResult<Identity>;

    /// Check credentials and return the identity if active
    async fn authenticate(&self, email: &str, password: &str) -> AppResult<Identity>;

    /// Change password after verifying the current one
    async fn change_password(
        &self,
        id: IdentityId,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<Identity>;

    /// Replace password without the current one (administrative)
    async fn reset_password(&self, id: IdentityId, new_password: &str) -> AppResult<Identity>;

    /// Update display names
    async fn update_profile(&self, id: IdentityId, update: UpdateIdentity) -> AppResult<Identity>;

    /// Enable or disable authentication for an identity
    async fn set_active(&self, id: IdentityId, active: bool) -> AppResult<Identity>;

    /// Add a role (no-op if already present)
    async fn assign_role(&self, id: IdentityId, role: RoleId) -> AppResult<Identity>;

    /// Remove a role (no-op if absent)
    async fn revoke_role(&self, id: IdentityId, role: RoleId) -> AppResult<Identity>;

    /// Link an order (no-op if already linked)
    async fn add_order(&self, id: IdentityId, order: OrderId) -> AppResult<Identity>;

    /// Get identity by ID
    async fn get_identity(&self, id: IdentityId) -> AppResult<Identity>;

    /// Get identity by email
    async fn get_identity_by_email(&self, email: &str) -> AppResult<Identity>;

    /// List all identities
    async fn list_identities(&self) -> AppResult<Vec<Identity>>;

    /// Delete identity
    async fn delete_identity(&self, id: IdentityId) -> AppResult<()>;
}

/// Concrete implementation of IdentityService using repository.
pub struct IdentityManager {
    repo: Arc<dyn IdentityRepository>,
    hasher: CredentialHasher,
    policy: PasswordPolicyConfig,
    // Verified against when the email is unknown so both paths pay for a hash.
    decoy: Credential,
}

impl IdentityManager {
    /// Create new identity service instance with repository.
    ///
    /// # Errors
    /// Returns `Internal` if the hasher cannot produce the decoy credential.
    pub fn new(
        repo: Arc<dyn IdentityRepository>,
        hasher: CredentialHasher,
        policy: PasswordPolicyConfig,
    ) -> AppResult<Self> {
        let decoy = hasher.hash("decoy-credential")?;
        Ok(Self {
            repo,
            hasher,
            policy,
            decoy,
        })
    }

    async fn load(&self, id: IdentityId) -> AppResult<Identity> {
        self.repo.find_by_id(id).await?.ok_or_not_found()
    }

    /// Hash `new_password` and swap it in, provided the stored credential is
    /// still the one `identity` was loaded with.
    async fn rotate(&self, mut identity: Identity, new_password: &str) -> AppResult<Identity> {
        check_password_policy(&self.policy, new_password)?;
        let id = identity.id().ok_or(AppError::NotFound)?;
        let expected = identity.credential().clone();
        identity.change_password(&self.hasher, new_password)?;
        self.repo
            .update_credential(id, expected, identity.credential().clone())
            .await
    }
}

#[async_trait]
impl IdentityService for IdentityManager {
    async fn register(&self, sign_up: SignUp) -> AppResult<Identity> {
        check_password_policy(&self.policy, &sign_up.password)?;

        if self.repo.find_by_email(&sign_up.email).await?.is_some() {
            return Err(AppError::conflict("Email"));
        }

        let identity = Identity::from_sign_up(&self.hasher, &sign_up)?;
        let identity = self.repo.insert(identity).await?;

        if let Some(id) = identity.id() {
            info!(identity_id = %id, "Identity registered");
        }
        Ok(identity)
    }

    async fn authenticate(&self, email: &str, password: &str) -> AppResult<Identity> {
        let found = self.repo.find_by_email(email).await?;

        let credential = found
            .as_ref()
            .map(Identity::credential)
            .unwrap_or(&self.decoy);
        let password_valid = credential.verify(password);

        let identity = match found {
            Some(identity) if password_valid => identity,
            _ => {
                warn!("Authentication failed");
                return Err(AppError::Unauthorized);
            }
        };

        if !identity.is_active() {
            warn!(identity_id = ?identity.id(), "Authentication refused for inactive identity");
            return Err(AppError::Forbidden);
        }

        if !self.hasher.needs_rehash(identity.credential()) {
            return Ok(identity);
        }

        // Stored under weaker cost parameters; the plaintext is at hand now.
        let id = identity.id().ok_or(AppError::NotFound)?;
        let expected = identity.credential().clone();
        let next = self.hasher.hash(password)?;
        match self.repo.update_credential(id, expected, next).await {
            Ok(identity) => {
                info!(identity_id = %id, "Credential rehashed with current parameters");
                Ok(identity)
            }
            Err(AppError::Stale) => {
                warn!(identity_id = %id, "Credential changed during authentication");
                Err(AppError::Unauthorized)
            }
            Err(e) => Err(e),
        }
    }

    async fn change_password(
        &self,
        id: IdentityId,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<Identity> {
        let identity = self.load(id).await?;
        if !identity.verify(current_password) {
            warn!(identity_id = %id, "Password change refused: current password mismatch");
            return Err(AppError::Unauthorized);
        }

        let identity = self.rotate(identity, new_password).await?;
        info!(identity_id = %id, "Password changed");
        Ok(identity)
    }

    async fn reset_password(&self, id: IdentityId, new_password: &str) -> AppResult<Identity> {
        let identity = self.load(id).await?;
        let identity = self.rotate(identity, new_password).await?;
        info!(identity_id = %id, "Password reset");
        Ok(identity)
    }

    async fn update_profile(&self, id: IdentityId, update: UpdateIdentity) -> AppResult<Identity> {
        let mut identity = self.load(id).await?;

        if let Some(email) = &update.email {
            identity.confirm_email(email)?;
        }
        if let Some(first_name) = &update.first_name {
            identity.set_first_name(first_name)?;
        }
        if let Some(last_name) = &update.last_name {
            identity.set_last_name(last_name)?;
        }

        self.repo.update(identity).await
    }

    async fn set_active(&self, id: IdentityId, active: bool) -> AppResult<Identity> {
        let mut identity = self.load(id).await?;
        if identity.is_active() == active {
            return Ok(identity);
        }

        identity.set_active(active);
        let identity = self.repo.update(identity).await?;
        info!(identity_id = %id, active, "Identity activation changed");
        Ok(identity)
    }

    async fn assign_role(&self, id: IdentityId, role: RoleId) -> AppResult<Identity> {
        let mut identity = self.load(id).await?;
        if !identity.add_role(role) {
            return Ok(identity);
        }
        self.repo.update(identity).await
    }

    async fn revoke_role(&self, id: IdentityId, role: RoleId) -> AppResult<Identity> {
        let mut identity = self.load(id).await?;
        if !identity.remove_role(role) {
            return Ok(identity);
        }
        self.repo.update(identity).await
    }

    async fn add_order(&self, id: IdentityId, order: OrderId) -> AppResult<Identity> {
        let mut identity = self.load(id).await?;
        if !identity.add_order(order) {
            return Ok(identity);
        }
        self.repo.update(identity).await
    }

    async fn get_identity(&self, id: IdentityId) -> AppResult<Identity> {
        self.load(id).await
    }

    async fn get_identity_by_email(&self, email: &str) -> AppResult<Identity> {
        self.repo.find_by_email(email).await?.ok_or_not_found()
    }

    async fn list_identities(&self) -> AppResult<Vec<Identity>> {
        self.repo.list().await
    }

    async fn delete_identity(&self, id: IdentityId) -> AppResult<()> {
        self.repo.delete(id).await?;
        info!(identity_id = %id, "Identity deleted");
        Ok(())
    }
}
