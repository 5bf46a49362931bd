//! User records: persisted entries, store accessors, and CRUD handlers.

use crate::backend::types::{TokenParams, UserView};
use crate::backend::Backend;
use crate::error::{Result, TwostepError};
use crate::storage::{user_key, user_totp_prefix, USER_PREFIX};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};

/// Persisted user record, stored as JSON at `users/<username>`.
///
/// The username itself is the storage key, not a field; it is immutable
/// once set and case-normalized by every handler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserEntry {
    #[serde(flatten)]
    pub token_params: TokenParams,

    /// Attached TOTP tokens, in insertion order.
    #[serde(default)]
    pub totp_tokens: Vec<TotpEntry>,
}

/// A named TOTP token attached to a user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotpEntry {
    /// Unique within the owning user's token sequence.
    pub name: String,

    /// PHC-format Argon2id hash of the PIN. Never exposed.
    pub pin_hash: String,

    /// Base32-encoded shared secret. Generated once at creation; replacing
    /// a token means delete-then-create.
    pub secret: String,

    /// Token-level origin restriction; consulted before the user-level one.
    #[serde(default)]
    pub bound_cidrs: Vec<IpNet>,
}

/// Normalize a username: trim, lower-case, reject empty.
pub(crate) fn normalize_username(raw: &str) -> Result<String> {
    let username = raw.trim().to_lowercase();
    if username.is_empty() {
        return Err(TwostepError::MissingField("username"));
    }
    Ok(username)
}

impl Backend {
    /// Load a user entry. Absence is `Ok(None)`; an entry that exists but
    /// cannot be decoded is a [`TwostepError::CorruptEntry`], distinct
    /// from not-found.
    pub(crate) async fn get_user(&self, username: &str) -> Result<Option<UserEntry>> {
        let key = user_key(username);
        let Some(raw) = self.storage.get(&key).await? else {
            return Ok(None);
        };

        match serde_json::from_slice(&raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "undecodable user entry");
                Err(TwostepError::corrupt_entry(key, e.to_string()))
            }
        }
    }

    pub(crate) async fn put_user(&self, username: &str, entry: &UserEntry) -> Result<()> {
        let bytes = serde_json::to_vec(entry)
            .map_err(|e| TwostepError::internal(format!("encoding user entry: {}", e)))?;
        self.storage.put(&user_key(username), bytes).await
    }

    /// Whether a user record exists. Lets dispatch layers distinguish
    /// create from update.
    pub async fn user_exists(&self, username: &str) -> Result<bool> {
        let username = normalize_username(username)?;
        Ok(self.get_user(&username).await?.is_some())
    }

    /// Create or update a user record (upsert).
    ///
    /// Replaces the authorization parameters while preserving any attached
    /// TOTP tokens.
    pub async fn write_user(&self, username: &str, params: TokenParams) -> Result<()> {
        let username = normalize_username(username)?;

        let mut entry = self.get_user(&username).await?.unwrap_or_default();
        entry.token_params = params;

        self.put_user(&username, &entry).await
    }

    /// Administrative read of a user record. Absence is `Ok(None)`.
    pub async fn read_user(&self, username: &str) -> Result<Option<UserView>> {
        let username = normalize_username(username)?;

        let Some(entry) = self.get_user(&username).await? else {
            return Ok(None);
        };

        let totp_token_names = entry
            .totp_tokens
            .iter()
            .map(|token| token.name.clone())
            .collect();

        Ok(Some(UserView {
            params: entry.token_params,
            totp_token_names,
        }))
    }

    /// Delete a user record and everything under its TOTP sub-namespace.
    ///
    /// The sub-namespace is swept first so a failure part-way through never
    /// leaves token data reachable without an owning user record.
    pub async fn delete_user(&self, username: &str) -> Result<()> {
        let username = normalize_username(username)?;

        let totp_prefix = user_totp_prefix(&username);
        for child in self.storage.list(&totp_prefix).await? {
            self.storage
                .delete(&format!("{totp_prefix}{child}"))
                .await?;
        }

        self.storage.delete(&user_key(&username)).await
    }

    /// List all usernames in the user namespace.
    pub async fn list_users(&self) -> Result<Vec<String>> {
        self.storage.list(USER_PREFIX).await
    }
}
