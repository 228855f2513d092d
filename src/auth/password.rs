//! Password hashing with Argon2id.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use thiserror::Error;

use crate::config::SecurityConfig;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters")]
    TooShort,

    #[error("Password must be at most {MAX_PASSWORD_LENGTH} characters")]
    TooLong,

    #[error("Invalid Argon2 params: {0}")]
    InvalidParams(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Invalid password hash format: {0}")]
    MalformedHash(String),
}

#[derive(Clone, Debug)]
pub struct PasswordConfig {
    /// Memory cost in KiB
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        // OWASP recommended minimum for Argon2id
        Self {
            memory_cost: 19 * 1024,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl PasswordConfig {
    pub fn from_security(security: &SecurityConfig) -> Self {
        Self {
            memory_cost: security.password_memory_cost_kib,
            time_cost: security.password_time_cost,
            parallelism: 1,
        }
    }

    /// Cheap settings for tests and fixtures. Not for production hashes.
    pub fn fast() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PasswordHasher {
    config: PasswordConfig,
    decoy: Arc<OnceCell<String>>,
}

impl PasswordHasher {
    pub fn new(config: PasswordConfig) -> Self {
        Self {
            config,
            decoy: Arc::default(),
        }
    }

    /// Length policy applied on registration
    pub fn check_policy(password: &str) -> Result<(), PasswordError> {
        let len = password.chars().count();
        if len < MIN_PASSWORD_LENGTH {
            return Err(PasswordError::TooShort);
        }
        if len > MAX_PASSWORD_LENGTH {
            return Err(PasswordError::TooLong);
        }
        Ok(())
    }

    /// Returns the PHC-formatted hash string
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        self.build_argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::Hashing(e.to_string()))
    }

    /// Parameters are read from the stored hash, so older hashes keep verifying
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Spends the same work as a real `verify` when there is no stored hash
    /// to check, so unknown accounts are not distinguishable by timing.
    /// Always returns false.
    pub fn verify_decoy(&self, password: &str) -> Result<bool, PasswordError> {
        let decoy = self.decoy.get_or_try_init(|| self.hash("decoy-password-never-matches"))?;
        self.verify(password, decoy)?;
        Ok(false)
    }

    fn build_argon2(&self) -> Result<Argon2<'static>, PasswordError> {
        let params = Params::new(
            self.config.memory_cost,
            self.config.time_cost,
            self.config.parallelism,
            None,
        )
        .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hasher = PasswordHasher::new(PasswordConfig::fast());
        let hash = hasher.hash("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse battery", &hash).unwrap());
        assert!(!hasher.verify("wrong password", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        let hasher = PasswordHasher::new(PasswordConfig::fast());
        assert!(matches!(
            hasher.verify("whatever", "plaintext"),
            Err(PasswordError::MalformedHash(_))
        ));
    }

    #[test]
    fn decoy_never_matches_and_is_computed_once() {
        let hasher = PasswordHasher::new(PasswordConfig::fast());
        let shared = hasher.clone();
        assert!(!hasher.verify_decoy("decoy-password-never-matches").unwrap());
        assert!(!shared.verify_decoy("anything else").unwrap());
        assert!(hasher.decoy.get().is_some());
        assert_eq!(hasher.decoy.get(), shared.decoy.get());
    }

    #[test]
    fn enforces_length_policy() {
        assert!(matches!(PasswordHasher::check_policy("short"), Err(PasswordError::TooShort)));
        assert!(PasswordHasher::check_policy("long enough").is_ok());
        assert!(matches!(
            PasswordHasher::check_policy(&"x".repeat(MAX_PASSWORD_LENGTH + 1)),
            Err(PasswordError::TooLong)
        ));
    }
}
