//! Credential value object - salted password hash handling.
//!
//! A credential is the pair (`password`, `salt`) where `password` is the
//! Argon2id PHC string computed from the plaintext and `salt`. The two fields
//! are only ever replaced together.

use argon2::{
    password_hash::{
        rand_core::{OsRng, RngCore},
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version, RECOMMENDED_SALT_LEN,
};

use crate::constants::{
    DEFAULT_ARGON2_ITERATIONS, DEFAULT_ARGON2_MEMORY_KIB, DEFAULT_ARGON2_PARALLELISM,
};
use crate::error::{DomainError, DomainResult};

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashingParams {
    fn default() -> Self {
        Self {
            memory_kib: DEFAULT_ARGON2_MEMORY_KIB,
            iterations: DEFAULT_ARGON2_ITERATIONS,
            parallelism: DEFAULT_ARGON2_PARALLELISM,
        }
    }
}

/// Produces fresh credentials with a fixed Argon2id configuration.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("params", self.argon2.params())
            .finish()
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl CredentialHasher {
    /// Build a hasher from explicit cost parameters.
    ///
    /// # Errors
    /// Returns `DomainError::Hashing` if Argon2 rejects the parameters.
    pub fn new(params: HashingParams) -> DomainResult<Self> {
        let params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            None,
        )
        .map_err(|e| DomainError::hashing(format!("Invalid Argon2 parameters: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext password under a freshly generated salt.
    ///
    /// # Errors
    /// * `InvalidCredential` if `plain_text` is empty
    /// * `Hashing` if the OS random source or the hash primitive fails
    pub fn hash(&self, plain_text: &str) -> DomainResult<Credential> {
        if plain_text.is_empty() {
            return Err(DomainError::invalid_credential("Password must not be empty"));
        }

        let salt = Self::generate_salt()?;
        let hash = self
            .argon2
            .hash_password(plain_text.as_bytes(), &salt)
            .map_err(|e| DomainError::hashing(format!("Password hash failed: {}", e)))?;

        Ok(Credential {
            password: hash.to_string(),
            salt: salt.as_str().to_string(),
        })
    }

    /// Whether `credential` should be replaced by a hash from this hasher.
    ///
    /// True for a non-Argon2id hash, or when every stored cost parameter is
    /// at most the configured one and at least one is lower. A hash that is
    /// stronger in any dimension is kept, so lowering the configured cost
    /// never downgrades stored credentials.
    pub fn needs_rehash(&self, credential: &Credential) -> bool {
        let Ok(parsed) = PasswordHash::new(&credential.password) else {
            return false;
        };
        if parsed.algorithm != Algorithm::Argon2id.ident() {
            return true;
        }
        let Ok(stored) = Params::try_from(&parsed) else {
            return false;
        };
        let current = self.argon2.params();

        let pairs = [
            (stored.m_cost(), current.m_cost()),
            (stored.t_cost(), current.t_cost()),
            (stored.p_cost(), current.p_cost()),
        ];
        pairs.iter().all(|(have, want)| have <= want)
            && pairs.iter().any(|(have, want)| have < want)
    }

    fn generate_salt() -> DomainResult<SaltString> {
        let mut bytes = [0u8; RECOMMENDED_SALT_LEN];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| DomainError::hashing(format!("Random source failed: {}", e)))?;
        SaltString::encode_b64(&bytes)
            .map_err(|e| DomainError::hashing(format!("Salt encoding failed: {}", e)))
    }
}

/// Salted password hash together with its salt.
///
/// Never holds the plaintext. There is no way to replace the salt alone.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    password: String,
    salt: String,
}

// Don't expose hash or salt in debug output (security)
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("password", &"[REDACTED]")
            .field("salt", &"[REDACTED]")
            .finish()
    }
}

impl Credential {
    /// Hash `plain_text` with the default Argon2id configuration.
    pub fn new(plain_text: &str) -> DomainResult<Self> {
        CredentialHasher::default().hash(plain_text)
    }

    /// Rebuild a credential from stored values (from the persistence layer).
    pub fn from_parts(password: String, salt: String) -> Self {
        Self { password, salt }
    }

    /// The stored PHC hash string.
    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// Consume and return `(password, salt)` for storage.
    pub fn into_parts(self) -> (String, String) {
        (self.password, self.salt)
    }

    /// Verify a candidate plaintext against this credential.
    ///
    /// The comparison of the recomputed hash is constant-time. A stored hash
    /// that is malformed or was computed under a different salt never
    /// verifies.
    pub fn verify(&self, candidate: &str) -> bool {
        Self::verify_hash(candidate, &self.password, &self.salt).unwrap_or(false)
    }

    fn verify_hash(candidate: &str, hash: &str, salt: &str) -> DomainResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| DomainError::hashing(format!("Invalid hash format: {}", e)))?;

        if parsed.salt.map(|s| s.as_str()) != Some(salt) {
            return Ok(false);
        }

        // Cost parameters are read from the PHC string itself.
        Ok(Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok())
    }
}
