//! Identity repository with an in-memory table store.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::entities::identity::Model;
use common::{AppError, AppResult};
use domain::{
    Credential, Identity, IdentityId, OrderId, RoleId, FIELD_EMAIL, FIELD_ID, FIELD_SALT,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Identity repository trait for dependency injection.
///
/// The repository owns identifier allocation and email uniqueness. Email
/// lookups are case-insensitive.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Find identity by ID
    async fn find_by_id(&self, id: IdentityId) -> AppResult<Option<Identity>>;

    /// Find identity by email address
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Identity>>;

    /// Persist a new identity, assigning its id
    async fn insert(&self, identity: Identity) -> AppResult<Identity>;

    /// Persist profile, activation and role/order changes.
    ///
    /// The stored password and salt are kept; credentials only change
    /// through `update_credential`.
    async fn update(&self, identity: Identity) -> AppResult<Identity>;

    /// Replace the credential if the stored one still equals `expected`.
    ///
    /// Fails with `Stale` when another write rotated the credential first.
    async fn update_credential(
        &self,
        id: IdentityId,
        expected: Credential,
        next: Credential,
    ) -> AppResult<Identity>;

    /// Delete identity and its role/order links
    async fn delete(&self, id: IdentityId) -> AppResult<()>;

    /// List all identities ordered by id
    async fn list(&self) -> AppResult<Vec<Identity>>;
}

/// Monotonic identifier allocator.
#[derive(Debug)]
pub struct IdSequence {
    next: AtomicI64,
}

impl IdSequence {
    pub fn starting_at(first: i64) -> Self {
        Self {
            next: AtomicI64::new(first),
        }
    }

    pub fn next_id(&self) -> IdentityId {
        IdentityId::new(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

#[derive(Debug, Default)]
struct Tables {
    identity: BTreeMap<IdentityId, Model>,
    email_index: HashMap<String, IdentityId>,
    identity_role: BTreeSet<(IdentityId, RoleId)>,
    identity_order: BTreeSet<(IdentityId, OrderId)>,
}

impl Tables {
    fn load(&self, id: IdentityId) -> Option<Identity> {
        let row = self.identity.get(&id)?.clone();
        let roles = self
            .identity_role
            .range((id, RoleId::new(i64::MIN))..=(id, RoleId::new(i64::MAX)))
            .map(|(_, role)| *role)
            .collect();
        let orders = self
            .identity_order
            .range((id, OrderId::new(i64::MIN))..=(id, OrderId::new(i64::MAX)))
            .map(|(_, order)| *order)
            .collect();

        Some(row.into_identity(roles, orders))
    }

    fn replace_links(&mut self, id: IdentityId, identity: &Identity) {
        self.identity_role.retain(|(owner, _)| *owner != id);
        self.identity_order.retain(|(owner, _)| *owner != id);
        self.identity_role
            .extend(identity.roles().iter().map(|role| (id, *role)));
        self.identity_order
            .extend(identity.orders().iter().map(|order| (id, *order)));
    }
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// In-memory implementation of IdentityRepository.
#[derive(Debug, Default)]
pub struct IdentityStore {
    tables: RwLock<Tables>,
    sequence: IdSequence,
}

impl IdentityStore {
    /// Create an empty store with ids starting at 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store drawing ids from `sequence`
    pub fn with_sequence(sequence: IdSequence) -> Self {
        Self {
            tables: RwLock::default(),
            sequence,
        }
    }
}

#[async_trait]
impl IdentityRepository for IdentityStore {
    async fn find_by_id(&self, id: IdentityId) -> AppResult<Option<Identity>> {
        Ok(self.tables.read().await.load(id))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Identity>> {
        let tables = self.tables.read().await;
        Ok(tables
            .email_index
            .get(&email_key(email))
            .and_then(|id| tables.load(*id)))
    }

    async fn insert(&self, mut identity: Identity) -> AppResult<Identity> {
        if identity.id().is_some() {
            return Err(AppError::ImmutableField(FIELD_ID));
        }

        let mut tables = self.tables.write().await;
        let key = email_key(identity.email());
        if tables.email_index.contains_key(&key) {
            return Err(AppError::conflict("Email"));
        }

        let id = self.sequence.next_id();
        identity.assign_id(id)?;

        tables.identity.insert(id, Model::from_identity(id, &identity));
        tables.email_index.insert(key, id);
        tables.replace_links(id, &identity);

        debug!(identity_id = %id, "Inserted identity");
        Ok(identity)
    }

    async fn update(&self, identity: Identity) -> AppResult<Identity> {
        let id = identity.id().ok_or(AppError::NotFound)?;

        let mut tables = self.tables.write().await;
        let stored = tables.identity.get(&id).ok_or(AppError::NotFound)?;

        if stored.email != identity.email() {
            return Err(AppError::ImmutableField(FIELD_EMAIL));
        }

        let mut row = Model::from_identity(id, &identity);
        row.password = stored.password.clone();
        row.salt = stored.salt.clone();
        row.created_at = stored.created_at;
        tables.identity.insert(id, row);
        tables.replace_links(id, &identity);

        debug!(identity_id = %id, "Updated identity");
        tables.load(id).ok_or(AppError::NotFound)
    }

    async fn update_credential(
        &self,
        id: IdentityId,
        expected: Credential,
        next: Credential,
    ) -> AppResult<Identity> {
        let mut tables = self.tables.write().await;
        let stored = tables.identity.get_mut(&id).ok_or(AppError::NotFound)?;

        if stored.password != expected.password() || stored.salt != expected.salt() {
            return Err(AppError::Stale);
        }

        let salt_changed = stored.salt != next.salt();
        let hash_changed = stored.password != next.password();
        if salt_changed && !hash_changed {
            return Err(AppError::ImmutableField(FIELD_SALT));
        }
        if hash_changed && !salt_changed {
            return Err(AppError::invalid_credential(
                "Password hash changed without rotating the salt",
            ));
        }

        if salt_changed {
            let (password, salt) = next.into_parts();
            stored.password = password;
            stored.salt = salt;
            stored.updated_at = Utc::now();
            debug!(identity_id = %id, "Rotated identity credential");
        }

        tables.load(id).ok_or(AppError::NotFound)
    }

    async fn delete(&self, id: IdentityId) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let row = tables.identity.remove(&id).ok_or(AppError::NotFound)?;

        tables.email_index.remove(&email_key(&row.email));
        tables.identity_role.retain(|(owner, _)| *owner != id);
        tables.identity_order.retain(|(owner, _)| *owner != id);

        debug!(identity_id = %id, "Deleted identity");
        Ok(())
    }

    async fn list(&self) -> AppResult<Vec<Identity>> {
        let tables = self.tables.read().await;
        Ok(tables
            .identity
            .keys()
            .filter_map(|id| tables.load(*id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{CredentialHasher, HashingParams, IdentityRecord};

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(HashingParams {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    fn identity(email: &str) -> Identity {
        Identity::create_with(&hasher(), email, "Jane", "Doe", "secret123").unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let store = IdentityStore::new();

        let first = store.insert(identity("a@b.com")).await.unwrap();
        let second = store.insert(identity("c@d.com")).await.unwrap();

        assert_eq!(first.id(), Some(IdentityId::new(1)));
        assert_eq!(second.id(), Some(IdentityId::new(2)));
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_email() {
        let store = IdentityStore::new();
        store.insert(identity("a@b.com")).await.unwrap();

        let result = store.insert(identity("A@B.com")).await;

        assert_eq!(result.unwrap_err(), AppError::conflict("Email"));
    }

    #[tokio::test]
    async fn test_insert_rejects_persisted_identity() {
        let store = IdentityStore::new();
        let saved = store.insert(identity("a@b.com")).await.unwrap();

        let result = store.insert(saved).await;

        assert_eq!(result.unwrap_err(), AppError::ImmutableField(FIELD_ID));
    }

    #[tokio::test]
    async fn test_links_round_trip() {
        let store = IdentityStore::new();
        let mut saved = store.insert(identity("a@b.com")).await.unwrap();
        saved.add_role(RoleId::new(1));
        saved.add_role(RoleId::new(2));
        saved.add_order(OrderId::new(10));

        store.update(saved.clone()).await.unwrap();
        let loaded = store.find_by_email("a@b.com").await.unwrap().unwrap();

        assert_eq!(loaded.roles(), saved.roles());
        assert_eq!(loaded.orders(), saved.orders());
    }

    #[tokio::test]
    async fn test_update_credential_rotates() {
        let store = IdentityStore::new();
        let saved = store.insert(identity("a@b.com")).await.unwrap();
        let next = hasher().hash("n3w-secret").unwrap();

        let updated = store
            .update_credential(saved.id().unwrap(), saved.credential().clone(), next)
            .await
            .unwrap();

        assert!(updated.verify("n3w-secret"));
        assert!(!updated.verify("secret123"));
    }

    #[tokio::test]
    async fn test_stale_update_keeps_rotated_credential() {
        let store = IdentityStore::new();
        let saved = store.insert(identity("a@b.com")).await.unwrap();
        let id = saved.id().unwrap();
        let mut stale = store.find_by_id(id).await.unwrap().unwrap();

        let next = hasher().hash("n3w-secret").unwrap();
        store
            .update_credential(id, saved.credential().clone(), next)
            .await
            .unwrap();

        stale.add_role(RoleId::new(1));
        store.update(stale).await.unwrap();

        let loaded = store.find_by_id(id).await.unwrap().unwrap();
        assert!(loaded.has_role(RoleId::new(1)));
        assert!(loaded.verify("n3w-secret"));
        assert!(!loaded.verify("secret123"));
    }

    #[tokio::test]
    async fn test_update_credential_rejects_stale_expected() {
        let store = IdentityStore::new();
        let saved = store.insert(identity("a@b.com")).await.unwrap();
        let id = saved.id().unwrap();
        let original = saved.credential().clone();

        let first = hasher().hash("first-secret").unwrap();
        store
            .update_credential(id, original.clone(), first)
            .await
            .unwrap();

        let second = hasher().hash("second-secret").unwrap();
        let result = store.update_credential(id, original, second).await;

        assert_eq!(result.unwrap_err(), AppError::Stale);
        let loaded = store.find_by_id(id).await.unwrap().unwrap();
        assert!(loaded.verify("first-secret"));
    }

    #[tokio::test]
    async fn test_update_credential_rejects_salt_only_change() {
        let store = IdentityStore::new();
        let saved = store.insert(identity("a@b.com")).await.unwrap();

        let next = Credential::from_parts(
            saved.password().to_string(),
            "c29tZXRoaW5nZWxzZQ".to_string(),
        );
        let result = store
            .update_credential(saved.id().unwrap(), saved.credential().clone(), next)
            .await;

        assert_eq!(result.unwrap_err(), AppError::ImmutableField(FIELD_SALT));
    }

    #[tokio::test]
    async fn test_update_credential_rejects_hash_without_new_salt() {
        let store = IdentityStore::new();
        let saved = store.insert(identity("a@b.com")).await.unwrap();

        let next = Credential::from_parts(
            identity("x@y.com").password().to_string(),
            saved.salt().to_string(),
        );
        let result = store
            .update_credential(saved.id().unwrap(), saved.credential().clone(), next)
            .await;

        assert!(matches!(result, Err(AppError::InvalidCredential(_))));
    }

    #[tokio::test]
    async fn test_update_credential_unknown_id() {
        let store = IdentityStore::new();
        let credential = hasher().hash("secret123").unwrap();

        let result = store
            .update_credential(IdentityId::new(9), credential.clone(), credential)
            .await;

        assert_eq!(result.unwrap_err(), AppError::NotFound);
    }

    #[tokio::test]
    async fn test_update_ignores_credential_fields() {
        let store = IdentityStore::new();
        let saved = store.insert(identity("a@b.com")).await.unwrap();

        let mut record = IdentityRecord::from(&saved);
        record.password = identity("x@y.com").password().to_string();
        record.salt = "c29tZXRoaW5nZWxzZQ".to_string();
        let updated = store.update(Identity::from(record)).await.unwrap();

        assert_eq!(updated.credential(), saved.credential());
        assert!(updated.verify("secret123"));
    }

    #[tokio::test]
    async fn test_update_rejects_email_change() {
        let store = IdentityStore::new();
        let saved = store.insert(identity("a@b.com")).await.unwrap();

        let mut record = IdentityRecord::from(&saved);
        record.email = "other@b.com".to_string();
        let result = store.update(Identity::from(record)).await;

        assert_eq!(result.unwrap_err(), AppError::ImmutableField(FIELD_EMAIL));
    }

    #[tokio::test]
    async fn test_update_unsaved_is_not_found() {
        let store = IdentityStore::new();
        let result = store.update(identity("a@b.com")).await;
        assert_eq!(result.unwrap_err(), AppError::NotFound);
    }

    #[tokio::test]
    async fn test_delete_frees_email() {
        let store = IdentityStore::new();
        let mut saved = store.insert(identity("a@b.com")).await.unwrap();
        saved.add_role(RoleId::new(1));
        let saved = store.update(saved).await.unwrap();
        let id = saved.id().unwrap();

        store.delete(id).await.unwrap();

        assert!(store.find_by_id(id).await.unwrap().is_none());
        assert_eq!(store.delete(id).await.unwrap_err(), AppError::NotFound);
        assert!(store.insert(identity("a@b.com")).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_ordered_by_id() {
        let store = IdentityStore::with_sequence(IdSequence::starting_at(100));
        store.insert(identity("a@b.com")).await.unwrap();
        store.insert(identity("c@d.com")).await.unwrap();

        let ids: Vec<_> = store
            .list()
            .await
            .unwrap()
            .iter()
            .filter_map(Identity::id)
            .collect();

        assert_eq!(ids, vec![IdentityId::new(100), IdentityId::new(101)]);
    }
}
