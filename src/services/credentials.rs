//! Salted one-way hashing of account secrets.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::sync::Arc;
use thiserror::Error;
use tokio::task;

use crate::config::SecurityConfig;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("Invalid hashing parameters: {0}")]
    Params(String),

    #[error("Failed to hash secret: {0}")]
    Hash(String),

    #[error("Stored hash is malformed: {0}")]
    Malformed(String),

    #[error("Hashing task failed: {0}")]
    Task(String),
}

/// Hash and verify secrets. Implementations must salt every hash.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, secret: &str) -> Result<String, HashError>;

    /// `Ok(false)` for a wrong secret, `Err` only for an unreadable hash.
    fn verify(&self, secret: &str, hash: &str) -> Result<bool, HashError>;
}

/// Argon2id with configurable cost parameters.
#[derive(Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    pub fn new(config: &SecurityConfig) -> Result<Self, HashError> {
        let params = Params::new(
            config.argon2_memory_cost_kib,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| HashError::Params(e.to_string()))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, secret: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| HashError::Hash(e.to_string()))?;

        Ok(hash.to_string())
    }

    fn verify(&self, secret: &str, hash: &str) -> Result<bool, HashError> {
        let parsed = PasswordHash::new(hash).map_err(|e| HashError::Malformed(e.to_string()))?;

        // Parameters come from the PHC string, so hashes made with older
        // settings still verify.
        Ok(Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok())
    }
}

/// Runs the hash on the blocking pool; Argon2 would otherwise stall the runtime.
pub async fn hash_blocking(
    hasher: Arc<dyn CredentialHasher>,
    secret: &str,
) -> Result<String, HashError> {
    let secret = secret.to_string();
    task::spawn_blocking(move || hasher.hash(&secret))
        .await
        .map_err(|e| HashError::Task(e.to_string()))?
}

pub async fn verify_blocking(
    hasher: Arc<dyn CredentialHasher>,
    secret: &str,
    hash: &str,
) -> Result<bool, HashError> {
    let secret = secret.to_string();
    let hash = hash.to_string();
    task::spawn_blocking(move || hasher.verify(&secret, &hash))
        .await
        .map_err(|e| HashError::Task(e.to_string()))?
}
