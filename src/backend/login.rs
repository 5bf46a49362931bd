//! Login verification and grant renewal.
//!
//! The login path walks `Start → CredentialParsed → UserLoaded →
//! TokenScan → OriginCheck → Granted | Denied`: split the credential,
//! load the user, scan attached tokens until one matches both factors,
//! enforce origin restrictions, then copy the user's authorization
//! parameters into a grant.

use crate::auth::split_credential;
use crate::backend::types::{Auth, Connection};
use crate::backend::users::normalize_username;
use crate::backend::Backend;
use crate::error::{Result, TwostepError};
use ipnet::IpNet;
use std::collections::HashSet;

impl Backend {
    /// Authenticate a username and `pin + code` credential.
    ///
    /// The credential is parsed before any storage access, so malformed
    /// input never reaches the store. Every attached token is a
    /// candidate: a token matches iff its Argon2id hash verifies the PIN
    /// (constant-time) **and** its secret's current time-step code equals
    /// the supplied code. First match wins. The denial for an exhausted
    /// scan does not say which factor failed.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        connection: Option<&Connection>,
    ) -> Result<Auth> {
        let username = normalize_username(username)?;
        if password.is_empty() {
            return Err(TwostepError::MissingField("password"));
        }

        let (pin, code) = split_credential(password)?;

        let user = self
            .get_user(&username)
            .await?
            .ok_or_else(|| TwostepError::UserNotFound(username.clone()))?;

        let mut matched = None;
        for token in &user.totp_tokens {
            let current = self.totp.current_code(&token.secret)?;
            if self.pin_hasher.verify(pin, &token.pin_hash)? && current == code {
                matched = Some(token);
                break;
            }
        }

        let Some(token) = matched else {
            tracing::debug!(user = %username, "no matching totp token");
            return Err(TwostepError::NoMatchingToken(username));
        };

        check_origin(&token.bound_cidrs, connection)?;
        check_origin(&user.token_params.bound_cidrs, connection)?;

        let mut auth = Auth::new(&username);
        user.token_params.populate_auth(&mut auth);
        Ok(auth)
    }

    /// Resolve a username to its identity alias without authenticating.
    ///
    /// Used by identity plumbing ahead of a real login; touches no
    /// storage and fails only on a missing username.
    pub fn alias_lookahead(&self, username: &str) -> Result<Auth> {
        let username = normalize_username(username)?;
        Ok(Auth::alias_only(&username))
    }

    /// Renew a previously issued grant.
    ///
    /// Reloads the current user record and refuses with
    /// [`TwostepError::PolicyChanged`] if the record's policy set no
    /// longer equals the grant's (order- and duplicate-independent). On
    /// match, the TTL, max-TTL, and period are refreshed from the current
    /// record so administrative duration changes take effect; the
    /// identity is otherwise unchanged.
    pub async fn renew(&self, mut auth: Auth) -> Result<Auth> {
        let username = auth
            .metadata
            .get("username")
            .cloned()
            .ok_or(TwostepError::MissingField("username"))?;

        let user = self
            .get_user(&username)
            .await?
            .ok_or_else(|| TwostepError::UserNotFound(username.clone()))?;

        if !equivalent_policies(&user.token_params.policies, &auth.policies) {
            tracing::debug!(user = %username, "refusing renewal, policies changed");
            return Err(TwostepError::PolicyChanged);
        }

        auth.ttl = user.token_params.ttl;
        auth.max_ttl = user.token_params.max_ttl;
        auth.period = user.token_params.period;
        Ok(auth)
    }
}

/// Check a remote address against a set of allowed ranges.
///
/// An empty set means unrestricted. A configured set with no connection
/// information is a hard denial, distinct from a credential mismatch; an
/// address outside every range is a permission-denied signal.
fn check_origin(bound_cidrs: &[IpNet], connection: Option<&Connection>) -> Result<()> {
    if bound_cidrs.is_empty() {
        return Ok(());
    }

    let connection = connection.ok_or(TwostepError::MissingConnection)?;

    if bound_cidrs
        .iter()
        .any(|net| net.contains(&connection.remote_addr))
    {
        Ok(())
    } else {
        Err(TwostepError::PermissionDenied)
    }
}

/// Set-equality of two policy lists, ignoring order and duplicates.
fn equivalent_policies(a: &[String], b: &[String]) -> bool {
    let a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let b: HashSet<&str> = b.iter().map(String::as_str).collect();
    a == b
}
