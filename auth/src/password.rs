//! Argon2id password hashing.
//!
//! Hashes are stored in PHC string format, so the parameters used at
//! registration travel with the hash and verification keeps working after
//! the configured cost changes. Both operations are CPU-bound and run on
//! the blocking thread pool.
//!
//! A decoy hash made with the configured cost lets callers spend the same
//! verification time on an unknown account as on a known one.

use crate::config::HashingConfig;
use crate::error::{AuthError, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

/// Hashes and verifies passwords.
#[derive(Debug, Clone)]
pub struct Passwords {
    params: Params,
    decoy: String,
}

impl Passwords {
    /// Create a hasher with the given cost.
    ///
    /// # Errors
    ///
    /// [`AuthError::Hashing`] if Argon2 rejects the parameters.
    pub fn new(config: HashingConfig) -> Result<Self> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| AuthError::Hashing(e.to_string()))?;
        let decoy = hash_with(&params, DECOY_PASSWORD)?;
        Ok(Self { params, decoy })
    }

    /// A hash of a password nobody is asked to type, with the configured cost.
    #[must_use]
    pub fn decoy_hash(&self) -> &str {
        &self.decoy
    }

    /// Run a full verification against [`Passwords::decoy_hash`] and
    /// discard the outcome.
    pub async fn verify_decoy(&self, password: &str) {
        if let Err(error) = self.verify(password, &self.decoy).await {
            tracing::warn!(error = %error, "Decoy verification failed");
        }
    }

    /// Hash `password` with a fresh random salt.
    ///
    /// # Errors
    ///
    /// [`AuthError::Hashing`] if hashing fails.
    pub async fn hash(&self, password: &str) -> Result<String> {
        let params = self.params.clone();
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || hash_with(&params, &password))
        .await
        .map_err(|e| AuthError::Hashing(format!("hashing task failed: {e}")))?
    }

    /// Check `password` against a stored PHC hash.
    ///
    /// Returns `Ok(false)` for a wrong password.
    ///
    /// # Errors
    ///
    /// [`AuthError::Hashing`] if the stored hash cannot be parsed.
    pub async fn verify(&self, password: &str, stored: &str) -> Result<bool> {
        let password = password.to_owned();
        let stored = stored.to_owned();

        tokio::task::spawn_blocking(move || {
            let parsed =
                PasswordHash::new(&stored).map_err(|e| AuthError::Hashing(e.to_string()))?;
            match Argon2::default().verify_password(password.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(password_hash::Error::Password) => Ok(false),
                Err(e) => Err(AuthError::Hashing(e.to_string())),
            }
        })
        .await
        .map_err(|e| AuthError::Hashing(format!("verification task failed: {e}")))?
    }
}

const DECOY_PASSWORD: &str = "decoy password for unknown accounts";

fn hash_with(params: &Params, password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone())
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn passwords() -> Passwords {
        Passwords::new(HashingConfig::insecure_fast()).unwrap()
    }

    #[tokio::test]
    async fn hash_then_verify() {
        let passwords = passwords();
        let hash = passwords.hash("Secret1!").await.unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(passwords.verify("Secret1!", &hash).await.unwrap());
        assert!(!passwords.verify("secret1!", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn same_password_gets_different_salts() {
        let passwords = passwords();
        let a = passwords.hash("Secret1!").await.unwrap();
        let b = passwords.hash("Secret1!").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn decoy_hash_uses_the_configured_cost_and_rejects_guesses() {
        let passwords = passwords();
        let decoy = passwords.decoy_hash();

        assert!(decoy.starts_with("$argon2id$v=19$m=8,t=1,p=1$"));
        assert!(!passwords.verify("Secret1!", decoy).await.unwrap());
        passwords.verify_decoy("Secret1!").await;
    }

    #[tokio::test]
    async fn garbage_hash_is_a_hashing_error() {
        let result = passwords().verify("Secret1!", "not-a-phc-string").await;
        assert!(matches!(result, Err(AuthError::Hashing(_))));
    }

    #[test]
    fn invalid_params_are_rejected() {
        assert!(Passwords::new(HashingConfig::new(0, 0, 0)).is_err());
    }
}
