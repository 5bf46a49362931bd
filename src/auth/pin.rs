//! PIN hashing and verification.
//!
//! PINs are stored only as salted Argon2id hashes in PHC string format.
//! Verification recomputes the hash and compares in constant time, so the
//! login path never performs a plain byte-equality check on secrets.

use crate::error::{Result, TwostepError};

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as Argon2Hasher, PasswordVerifier,
        SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

/// Work-factor configuration for PIN hashing.
#[derive(Clone, Debug)]
pub struct PinConfig {
    /// Memory cost in KiB (default: 19456 = 19 MiB)
    pub memory_cost: u32,
    /// Time cost / iterations (default: 2)
    pub time_cost: u32,
    /// Parallelism (default: 1)
    pub parallelism: u32,
}

impl Default for PinConfig {
    fn default() -> Self {
        // OWASP recommended minimum for Argon2id
        Self {
            memory_cost: 19 * 1024,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl PinConfig {
    /// Create a config with custom work factors.
    pub fn new(memory_cost: u32, time_cost: u32, parallelism: u32) -> Self {
        Self {
            memory_cost,
            time_cost,
            parallelism,
        }
    }

    /// Cheap settings for tests (NOT for production).
    pub fn fast() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

/// Hashes and verifies PINs using Argon2id.
#[derive(Clone)]
pub struct PinHasher {
    config: PinConfig,
}

impl Default for PinHasher {
    fn default() -> Self {
        Self::new(PinConfig::default())
    }
}

impl PinHasher {
    /// Create a new PIN hasher with the given work factors.
    pub fn new(config: PinConfig) -> Self {
        Self { config }
    }

    /// Hash a PIN with a fresh random salt.
    ///
    /// Returns the PHC-formatted hash string (algorithm, params, salt,
    /// and digest). The plaintext PIN is never persisted.
    pub fn hash(&self, pin: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = self.build_argon2()?;

        argon2
            .hash_password(pin.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| TwostepError::internal(format!("pin hashing failed: {}", e)))
    }

    /// Verify a PIN against a stored hash.
    ///
    /// `argon2`'s verification is constant-time; a mismatch takes as long
    /// as a match.
    pub fn verify(&self, pin: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| TwostepError::internal(format!("invalid pin hash format: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(pin.as_bytes(), &parsed_hash)
            .is_ok())
    }

    fn build_argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.config.memory_cost,
            self.config.time_cost,
            self.config.parallelism,
            None,
        )
        .map_err(|e| TwostepError::internal(format!("invalid argon2 params: {}", e)))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}
