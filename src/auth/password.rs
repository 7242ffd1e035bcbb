// Password hashing with Argon2id
use crate::config::AuthConfig;
use crate::errors::{AppError, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl From<&AuthConfig> for HashParams {
    fn from(config: &AuthConfig) -> Self {
        Self {
            memory_kib: config.argon2_memory_kib,
            iterations: config.argon2_iterations,
            parallelism: config.argon2_parallelism,
        }
    }
}

/// Checks a candidate password against a stored PHC hash.
///
/// Implementations are CPU bound and synchronous; async callers run them on
/// the blocking pool.
pub trait CredentialVerifier: Send + Sync + 'static {
    fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}

/// Argon2id hasher with configured parameters
#[derive(Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new(params: HashParams) -> Result<Self> {
        let params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            Some(32),
        )
        .map_err(|e| AppError::Cryptographic(format!("Failed to create Argon2 params: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a password into a PHC string
    pub fn hash(&self, password: &str) -> Result<String> {
        if password.is_empty() {
            return Err(AppError::ValidationError("Password cannot be empty".to_string()));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Cryptographic(format!("Failed to hash password: {}", e)))?
            .to_string();

        tracing::debug!("Password hashed successfully");

        Ok(password_hash)
    }
}

impl CredentialVerifier for Argon2Hasher {
    /// Verify using the parameters encoded in `hash`; the comparison is
    /// constant time
    fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::Cryptographic(format!("Failed to parse password hash: {}", e)))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => {
                tracing::error!("Password verification error: {}", e);
                Err(AppError::Cryptographic(format!("Password verification error: {}", e)))
            }
        }
    }
}
