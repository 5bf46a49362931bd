//! Storage collaborator interface.
//!
//! The backend consumes a generic key-value store and never implements
//! locking itself; the store is expected to provide per-key
//! read-then-write consistency. Keys are structured under two prefixes:
//! a user namespace (`users/<username>`) and a per-user TOTP
//! sub-namespace (`users/<username>/totp/<name>`).

use crate::error::Result;
use async_trait::async_trait;

mod memory;

pub use memory::MemoryStorage;

/// Prefix under which user entries are stored.
pub const USER_PREFIX: &str = "users/";

/// Sub-namespace suffix for a user's TOTP keys.
pub const TOTP_SUFFIX: &str = "/totp/";

/// Storage key for a user entry.
pub fn user_key(username: &str) -> String {
    format!("{USER_PREFIX}{username}")
}

/// Prefix of a user's TOTP sub-namespace.
pub fn user_totp_prefix(username: &str) -> String {
    format!("{USER_PREFIX}{username}{TOTP_SUFFIX}")
}

/// Key-value storage trait.
///
/// Implement this for your durable store to back a
/// [`Backend`](crate::Backend). All values are opaque bytes; the backend
/// encodes its entries as JSON.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch the value at `key`. Absence is `Ok(None)`, never an error.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` at `key`, replacing any existing value.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Remove the value at `key` (no-op if absent).
    async fn delete(&self, key: &str) -> Result<()>;

    /// List the immediate child names under `prefix`.
    ///
    /// A key `prefix + "a"` yields `"a"`; a deeper key
    /// `prefix + "a/b"` yields the directory entry `"a/"`. Results are
    /// sorted and deduplicated.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}
