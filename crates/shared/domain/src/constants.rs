//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// Validation
// =============================================================================

/// Default minimum password length applied at registration
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 8;

/// Minimum name length requirement
pub const MIN_NAME_LENGTH: usize = 1;

// =============================================================================
// Credential Hashing (Argon2id)
// =============================================================================

/// Default memory cost in KiB (Argon2 recommended minimum)
pub const DEFAULT_ARGON2_MEMORY_KIB: u32 = 19 * 1024;

/// Default number of passes over memory
pub const DEFAULT_ARGON2_ITERATIONS: u32 = 2;

/// Default degree of parallelism
pub const DEFAULT_ARGON2_PARALLELISM: u32 = 1;

// =============================================================================
// Immutable Fields
// =============================================================================

/// Identity identifier, assigned once by the persistence layer
pub const FIELD_ID: &str = "id";

/// Email address, fixed at creation
pub const FIELD_EMAIL: &str = "email";

/// Credential salt, rotated only together with the password hash
pub const FIELD_SALT: &str = "salt";
