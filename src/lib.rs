//! Twostep - a PIN+TOTP two-factor credential backend
//!
//! Twostep verifies logins made of a username and a concatenated
//! `pin + one-time-code` credential: the PIN must match a stored salted
//! Argon2id hash and the code must match a currently valid TOTP secret
//! attached to the user, before an authenticated identity with its
//! authorization parameters (policies, TTLs, bound network ranges) is
//! issued. Storage is a pluggable key-value collaborator.
//!
//! # Features
//!
//! - **Verification core**: multi-token matching, constant-time PIN
//!   comparison, exact time-step code validation, origin restriction
//! - **Token lifecycle**: named TOTP tokens with replace-by-name
//!   semantics; secrets disclosed exactly once at creation
//! - **User administration**: CRUD and listing over the user namespace
//! - **Renewal**: policy-drift detection with TTL refresh
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use twostep::{Backend, BackendConfig, MemoryStorage, TokenParams};
//!
//! #[tokio::main]
//! async fn main() -> twostep::Result<()> {
//!     twostep::init_tracing();
//!
//!     let backend = Backend::with_config(
//!         Arc::new(MemoryStorage::new()),
//!         BackendConfig::new("MyApp"),
//!     );
//!
//!     backend.write_user("alice", TokenParams::default()).await?;
//!     let secret = backend.create_totp_token("alice", "phone", "1234").await?;
//!     // Hand `secret` to the user's authenticator app; it is not
//!     // retrievable again.
//!
//!     // Later: login with pin + current code.
//!     // let auth = backend.login("alice", "1234492039", None).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod backend;
mod error;
pub mod storage;

// Re-exports for public API
pub use auth::{split_credential, PinConfig, PinHasher, TotpConfig, TotpManager, CODE_WIDTH};
pub use backend::{
    Auth, Backend, BackendConfig, Connection, Request, Response, TokenParams, TotpEntry,
    UserEntry, UserView,
};
pub use error::{Result, TwostepError};
pub use storage::{MemoryStorage, Storage};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging with sensible defaults
///
/// This should be called early in your application, before constructing
/// a [`Backend`].
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "twostep=debug")
/// - `TWOSTEP_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("TWOSTEP_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
