//! Request and response types shared across backend operations.

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

/// Authorization parameters attached to a user record.
///
/// Owned entirely by the user record and copied into an [`Auth`] grant at
/// login time, never aliased.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenParams {
    /// Policies granted on login.
    #[serde(default)]
    pub policies: Vec<String>,

    /// Initial TTL of issued grants.
    #[serde(default)]
    pub ttl: Duration,

    /// Hard upper bound on grant lifetime.
    #[serde(default)]
    pub max_ttl: Duration,

    /// Renewal period for periodic grants.
    #[serde(default)]
    pub period: Duration,

    /// Network ranges a login must originate from (empty = unrestricted).
    #[serde(default)]
    pub bound_cidrs: Vec<IpNet>,
}

impl TokenParams {
    /// Copy these parameters into a grant.
    pub fn populate_auth(&self, auth: &mut Auth) {
        auth.policies = self.policies.clone();
        auth.ttl = self.ttl;
        auth.max_ttl = self.max_ttl;
        auth.period = self.period;
        auth.bound_cidrs = self.bound_cidrs.clone();
    }
}

/// The grant produced by a successful login.
///
/// Ephemeral: this crate never persists it; ownership passes to the
/// calling session layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Auth {
    /// Identity alias (the username).
    pub alias: String,

    /// Display name (the username).
    pub display_name: String,

    /// Identity metadata; contains at least `username`.
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    #[serde(default)]
    pub policies: Vec<String>,

    #[serde(default)]
    pub ttl: Duration,

    #[serde(default)]
    pub max_ttl: Duration,

    #[serde(default)]
    pub period: Duration,

    #[serde(default)]
    pub bound_cidrs: Vec<IpNet>,
}

impl Auth {
    /// Build a grant skeleton for a username: alias, display name, and
    /// `username` metadata, with empty authorization parameters.
    pub fn new(username: &str) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("username".to_string(), username.to_string());
        Self {
            alias: username.to_string(),
            display_name: username.to_string(),
            metadata,
            policies: Vec::new(),
            ttl: Duration::ZERO,
            max_ttl: Duration::ZERO,
            period: Duration::ZERO,
            bound_cidrs: Vec::new(),
        }
    }

    /// A bare alias, as returned by the alias-lookahead operation before
    /// any authentication has happened.
    pub fn alias_only(username: &str) -> Self {
        Self {
            alias: username.to_string(),
            display_name: String::new(),
            metadata: HashMap::new(),
            policies: Vec::new(),
            ttl: Duration::ZERO,
            max_ttl: Duration::ZERO,
            period: Duration::ZERO,
            bound_cidrs: Vec::new(),
        }
    }
}

/// Origin information for a login request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Remote address the request originated from.
    pub remote_addr: IpAddr,
}

impl Connection {
    pub fn new(remote_addr: IpAddr) -> Self {
        Self { remote_addr }
    }
}

/// Administrative read view of a user record.
///
/// Exposes authorization parameters and attached token names; never
/// secrets or PIN hashes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserView {
    #[serde(flatten)]
    pub params: TokenParams,

    /// Names of the user's TOTP tokens, in sequence order.
    pub totp_token_names: Vec<String>,
}
