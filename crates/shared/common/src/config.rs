//! Shared configuration structures.
//!
//! Every section can be built from environment variables (a `.env` file is
//! honored through `dotenvy`). Unset or unparsable values fall back to the
//! defaults.

use std::env;
use std::str::FromStr;

use domain::{
    CredentialHasher, DomainResult, HashingParams, DEFAULT_ARGON2_ITERATIONS,
    DEFAULT_ARGON2_MEMORY_KIB, DEFAULT_ARGON2_PARALLELISM, DEFAULT_MIN_PASSWORD_LENGTH,
};
use serde::{Deserialize, Serialize};

/// Load a `.env` file if present. Safe to call more than once.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Base service configuration shared by all services.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Service name for logging and tracing
    pub service_name: String,
    /// Log level
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "identity-service".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            service_name: env::var("SERVICE_NAME").unwrap_or(defaults.service_name),
            log_level: env::var("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }
}

/// Argon2id cost configuration for new credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct HashingConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: DEFAULT_ARGON2_MEMORY_KIB,
            iterations: DEFAULT_ARGON2_ITERATIONS,
            parallelism: DEFAULT_ARGON2_PARALLELISM,
        }
    }
}

impl HashingConfig {
    pub fn from_env() -> Self {
        Self {
            memory_kib: env_or("IDENTITY_ARGON2_MEMORY_KIB", DEFAULT_ARGON2_MEMORY_KIB),
            iterations: env_or("IDENTITY_ARGON2_ITERATIONS", DEFAULT_ARGON2_ITERATIONS),
            parallelism: env_or("IDENTITY_ARGON2_PARALLELISM", DEFAULT_ARGON2_PARALLELISM),
        }
    }

    /// Build the hasher. Fails if Argon2 rejects the parameters.
    pub fn hasher(&self) -> DomainResult<CredentialHasher> {
        CredentialHasher::new(HashingParams {
            memory_kib: self.memory_kib,
            iterations: self.iterations,
            parallelism: self.parallelism,
        })
    }
}

/// Password acceptance rules applied at registration and password change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PasswordPolicyConfig {
    /// Minimum number of characters
    pub min_length: usize,
}

impl Default for PasswordPolicyConfig {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_PASSWORD_LENGTH,
        }
    }
}

impl PasswordPolicyConfig {
    pub fn from_env() -> Self {
        Self {
            min_length: env_or("IDENTITY_MIN_PASSWORD_LENGTH", DEFAULT_MIN_PASSWORD_LENGTH),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hashing_config_builds() {
        assert!(HashingConfig::default().hasher().is_ok());
    }

    #[test]
    fn test_invalid_hashing_config_fails() {
        let config = HashingConfig {
            memory_kib: 0,
            iterations: 0,
            parallelism: 0,
        };
        assert!(config.hasher().is_err());
    }

    #[test]
    fn test_env_or_falls_back() {
        assert_eq!(env_or("IDENTITY_TEST_UNSET_VARIABLE", 42u32), 42);
    }
}
