//! TOTP secret generation and code computation.

use crate::error::{Result, TwostepError};
use totp_rs::{Algorithm, Secret, TOTP};

/// Configuration for TOTP generation.
#[derive(Clone)]
pub struct TotpConfig {
    /// Issuer name shown in authenticator apps.
    pub issuer: String,
    /// Number of digits in the code (default: 6).
    pub digits: usize,
    /// Time step in seconds (default: 30).
    pub step: u64,
    /// Algorithm (default: SHA1 for compatibility).
    pub algorithm: Algorithm,
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            issuer: "Twostep".to_string(),
            digits: 6,
            step: 30,
            algorithm: Algorithm::SHA1,
        }
    }
}

impl TotpConfig {
    /// Create a new TOTP config with the given issuer name.
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            ..Default::default()
        }
    }

    /// Set the number of digits.
    pub fn digits(mut self, digits: usize) -> Self {
        self.digits = digits;
        self
    }

    /// Set the time step in seconds.
    pub fn step(mut self, step: u64) -> Self {
        self.step = step;
        self
    }
}

/// Generates shared secrets and computes time-step codes.
///
/// Codes are compared for exact current-step equality at login; there is
/// no skew window. A code remains valid until its 30 second step rolls
/// over, and nothing invalidates a code that was already used within its
/// step.
#[derive(Clone)]
pub struct TotpManager {
    config: TotpConfig,
}

impl TotpManager {
    /// Create a new TOTP manager with the given configuration.
    pub fn new(config: TotpConfig) -> Self {
        Self { config }
    }

    /// Generate a fresh random shared secret for an account.
    ///
    /// Returns the base32-encoded secret. This is the only time the
    /// secret leaves the system in plaintext; afterwards it is held in
    /// storage solely for code verification.
    pub fn generate_secret(&self, account_name: &str) -> Result<String> {
        let secret = Secret::generate_secret();
        let encoded = secret.to_encoded().to_string();

        // Round-trip through the builder so a secret we hand out is one
        // we can later verify against.
        self.build_totp(&encoded, account_name)?;

        Ok(encoded)
    }

    /// Compute the currently valid code for a stored secret.
    pub fn current_code(&self, secret: &str) -> Result<String> {
        self.build_totp(secret, "")?
            .generate_current()
            .map_err(|e| TwostepError::internal(format!("system clock error: {}", e)))
    }

    /// Compute the code for a specific unix timestamp (useful for testing).
    pub fn code_at(&self, secret: &str, time: u64) -> Result<String> {
        Ok(self.build_totp(secret, "")?.generate(time))
    }

    fn build_totp(&self, secret: &str, account_name: &str) -> Result<TOTP> {
        TOTP::new(
            self.config.algorithm,
            self.config.digits,
            0, // exact-step matching, no skew
            self.config.step,
            Secret::Encoded(secret.to_string())
                .to_bytes()
                .map_err(|e| TwostepError::internal(format!("invalid totp secret: {}", e)))?,
            Some(self.config.issuer.clone()),
            account_name.to_string(),
        )
        .map_err(|e| TwostepError::internal(format!("failed to create totp: {}", e)))
    }
}

impl Default for TotpManager {
    fn default() -> Self {
        Self::new(TotpConfig::default())
    }
}
