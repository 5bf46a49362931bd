//! The credential backend service object and its operation dispatch.
//!
//! A [`Backend`] holds only its collaborator handles: a storage
//! implementation, a PIN hasher, and a TOTP manager. All operations are
//! request-scoped; no state is retained between calls beyond what the
//! store owns. Callers either invoke the typed methods directly
//! (`login`, `create_totp_token`, …) or route a tagged [`Request`]
//! through [`Backend::handle`].

use crate::auth::{PinConfig, PinHasher, TotpConfig, TotpManager};
use crate::error::Result;
use crate::storage::Storage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod login;
pub mod totp;
pub mod types;
pub mod users;

pub use types::{Auth, Connection, TokenParams, UserView};
pub use users::{TotpEntry, UserEntry};

/// Configuration for a [`Backend`].
#[derive(Clone, Default)]
pub struct BackendConfig {
    /// PIN hashing work factors.
    pub pin: PinConfig,
    /// TOTP parameters (issuer, digits, step, algorithm).
    pub totp: TotpConfig,
}

impl BackendConfig {
    /// Create a config with the given issuer and default work factors.
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            pin: PinConfig::default(),
            totp: TotpConfig::new(issuer),
        }
    }

    /// Config with cheap hashing for tests (NOT for production).
    pub fn fast(issuer: impl Into<String>) -> Self {
        Self {
            pin: PinConfig::fast(),
            totp: TotpConfig::new(issuer),
        }
    }

    /// Override the PIN hashing work factors.
    pub fn pin(mut self, pin: PinConfig) -> Self {
        self.pin = pin;
        self
    }

    /// Override the TOTP parameters.
    pub fn totp(mut self, totp: TotpConfig) -> Self {
        self.totp = totp;
        self
    }
}

/// The PIN+TOTP credential backend.
#[derive(Clone)]
pub struct Backend {
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) pin_hasher: PinHasher,
    pub(crate) totp: TotpManager,
}

impl Backend {
    /// Create a backend over the given storage with default configuration.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_config(storage, BackendConfig::default())
    }

    /// Create a backend over the given storage with explicit configuration.
    pub fn with_config(storage: Arc<dyn Storage>, config: BackendConfig) -> Self {
        Self {
            storage,
            pin_hasher: PinHasher::new(config.pin),
            totp: TotpManager::new(config.totp),
        }
    }

    /// Dispatch a structured request to its handler.
    pub async fn handle(&self, request: Request) -> Result<Response> {
        match request {
            // Create and update share upsert semantics; `user_exists`
            // lets callers tell them apart beforehand.
            Request::CreateUser { username, params }
            | Request::UpdateUser { username, params } => {
                self.write_user(&username, params).await?;
                Ok(Response::Empty)
            }
            Request::ReadUser { username } => Ok(match self.read_user(&username).await? {
                Some(user) => Response::User(user),
                None => Response::Empty,
            }),
            Request::DeleteUser { username } => {
                self.delete_user(&username).await?;
                Ok(Response::Empty)
            }
            Request::ListUsers => Ok(Response::UserList {
                users: self.list_users().await?,
            }),
            Request::CreateTotpToken {
                username,
                name,
                pin,
            } => Ok(Response::Secret {
                totp_secret: self.create_totp_token(&username, &name, &pin).await?,
            }),
            Request::DeleteTotpToken { username, name } => {
                self.delete_totp_token(&username, &name).await?;
                Ok(Response::Empty)
            }
            Request::Login {
                username,
                password,
                connection,
            } => Ok(Response::Auth(
                self.login(&username, &password, connection.as_ref()).await?,
            )),
            Request::AliasLookahead { username } => {
                Ok(Response::Auth(self.alias_lookahead(&username)?))
            }
            Request::Renew { auth } => Ok(Response::Auth(self.renew(auth).await?)),
        }
    }
}

/// A backend operation with its fields, replacing path-pattern routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Request {
    CreateUser {
        username: String,
        #[serde(default)]
        params: TokenParams,
    },
    UpdateUser {
        username: String,
        #[serde(default)]
        params: TokenParams,
    },
    ReadUser {
        username: String,
    },
    DeleteUser {
        username: String,
    },
    ListUsers,
    CreateTotpToken {
        username: String,
        name: String,
        pin: String,
    },
    DeleteTotpToken {
        username: String,
        name: String,
    },
    Login {
        username: String,
        password: String,
        #[serde(default)]
        connection: Option<Connection>,
    },
    AliasLookahead {
        username: String,
    },
    Renew {
        auth: Auth,
    },
}

/// Structured result of a dispatched operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Response {
    /// The operation succeeded with nothing to return (also used for
    /// reads of absent records).
    Empty,
    /// A freshly created TOTP secret, disclosed exactly once.
    Secret { totp_secret: String },
    /// Administrative view of a user record.
    User(UserView),
    /// Usernames under the user namespace.
    UserList { users: Vec<String> },
    /// An authentication grant.
    Auth(Auth),
}
