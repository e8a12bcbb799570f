//! Identity service configuration.

use common::{load_dotenv, HashingConfig, PasswordPolicyConfig, ServiceConfig};

/// Identity service configuration.
#[derive(Debug, Clone, Default)]
pub struct IdentityServiceConfig {
    /// Service name and log level
    pub service: ServiceConfig,
    /// Argon2id cost parameters for new credentials
    pub hashing: HashingConfig,
    /// Password acceptance rules
    pub password_policy: PasswordPolicyConfig,
}

impl IdentityServiceConfig {
    /// Load configuration from environment variables (and `.env`).
    pub fn from_env() -> Self {
        load_dotenv();
        Self {
            service: ServiceConfig::from_env(),
            hashing: HashingConfig::from_env(),
            password_policy: PasswordPolicyConfig::from_env(),
        }
    }
}
