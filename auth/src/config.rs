//! Account configuration.
//!
//! Configuration values should be provided by the application, not hardcoded.

use std::time::Duration;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingConfig {
    /// Memory cost in KiB.
    ///
    /// Default: 19456 (19 MiB)
    pub memory_kib: u32,

    /// Number of passes.
    ///
    /// Default: 2
    pub iterations: u32,

    /// Degree of parallelism.
    ///
    /// Default: 1
    pub parallelism: u32,
}

impl HashingConfig {
    /// Create hashing parameters.
    #[must_use]
    pub const fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        Self {
            memory_kib,
            iterations,
            parallelism,
        }
    }

    /// The cheapest parameters Argon2 accepts. For tests only.
    #[must_use]
    pub const fn insecure_fast() -> Self {
        Self::new(8, 1, 1)
    }
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self::new(19_456, 2, 1)
    }
}

/// Registration and sign-in configuration.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    /// Minimum first-name length in characters.
    ///
    /// Default: 3
    pub min_name_length: usize,

    /// Minimum password length in characters.
    ///
    /// Default: 8
    pub min_password_length: usize,

    /// Access level granted at registration.
    ///
    /// Default: 1
    pub access_level: i32,

    /// Bound on every repository call.
    ///
    /// Default: 5 seconds
    pub storage_timeout: Duration,

    /// Password hashing cost.
    pub hashing: HashingConfig,
}

impl AccountConfig {
    /// Create configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min_name_length: 3,
            min_password_length: 8,
            access_level: bookings_core::types::DEFAULT_ACCESS_LEVEL,
            storage_timeout: Duration::from_secs(5),
            hashing: HashingConfig::new(19_456, 2, 1),
        }
    }

    /// Set the minimum password length.
    #[must_use]
    pub const fn with_min_password_length(mut self, length: usize) -> Self {
        self.min_password_length = length;
        self
    }

    /// Set the repository timeout.
    #[must_use]
    pub const fn with_storage_timeout(mut self, timeout: Duration) -> Self {
        self.storage_timeout = timeout;
        self
    }

    /// Set the hashing cost.
    #[must_use]
    pub const fn with_hashing(mut self, hashing: HashingConfig) -> Self {
        self.hashing = hashing;
        self
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self::new()
    }
}
