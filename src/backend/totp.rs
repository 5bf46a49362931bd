//! TOTP token lifecycle: create and delete named tokens on a user record.

use crate::backend::users::{normalize_username, TotpEntry};
use crate::backend::Backend;
use crate::error::{Result, TwostepError};

impl Backend {
    /// Create a TOTP token named `name` on an existing user, protected by
    /// `pin`.
    ///
    /// Any existing token with the same name is replaced: the sequence is
    /// filtered before the new token is appended, so the old hash and
    /// secret stop validating. Returns the freshly generated base32
    /// secret — the only time it is ever disclosed.
    pub async fn create_totp_token(&self, username: &str, name: &str, pin: &str) -> Result<String> {
        let username = normalize_username(username)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(TwostepError::MissingField("name"));
        }
        if pin.is_empty() {
            return Err(TwostepError::MissingField("pin"));
        }

        let mut user = self
            .get_user(&username)
            .await?
            .ok_or_else(|| TwostepError::UserNotFound(username.clone()))?;

        user.totp_tokens.retain(|token| token.name != name);

        let pin_hash = self.pin_hasher.hash(pin)?;
        let secret = self.totp.generate_secret(&username)?;

        user.totp_tokens.push(TotpEntry {
            name: name.to_string(),
            pin_hash,
            secret: secret.clone(),
            bound_cidrs: Vec::new(),
        });

        self.put_user(&username, &user).await?;

        tracing::debug!(user = %username, token = %name, "created totp token");
        Ok(secret)
    }

    /// Delete the token named `name` from a user record.
    ///
    /// Idempotent: deleting a name that does not exist persists the record
    /// unchanged and is not an error.
    pub async fn delete_totp_token(&self, username: &str, name: &str) -> Result<()> {
        let username = normalize_username(username)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(TwostepError::MissingField("name"));
        }

        let mut user = self
            .get_user(&username)
            .await?
            .ok_or_else(|| TwostepError::UserNotFound(username.clone()))?;

        user.totp_tokens.retain(|token| token.name != name);

        self.put_user(&username, &user).await
    }
}
