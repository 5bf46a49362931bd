use std::collections::HashMap;

/// The main error type for twostep operations.
///
/// Variants split along the lines callers handle differently: input
/// problems never reach storage, credential denials never reveal which
/// factor failed, and origin-restriction failures stay distinguishable
/// from bad credentials.
#[derive(Debug, thiserror::Error)]
pub enum TwostepError {
    /// A required request field was missing or empty.
    #[error("missing {0}")]
    MissingField(&'static str),

    /// The supplied credential string is too short to hold a PIN and a code.
    #[error("credential has invalid length")]
    InvalidCredential,

    /// No user record exists under the given username.
    #[error("user {0:?} could not be found")]
    UserNotFound(String),

    /// No attached token matched both the PIN and the current code.
    /// Deliberately silent about which factor failed.
    #[error("user {0:?} does not have a matching token")]
    NoMatchingToken(String),

    /// An origin restriction is configured but the request carried no
    /// connection information.
    #[error("cannot check origin, no connection information provided")]
    MissingConnection,

    /// The request's remote address falls outside every configured range.
    #[error("permission denied")]
    PermissionDenied,

    /// The policy set on the user record no longer matches the grant being
    /// renewed; the caller must re-authenticate.
    #[error("not renewing due to policy changes")]
    PolicyChanged,

    /// The storage collaborator failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A stored entry exists but could not be decoded.
    #[error("corrupt entry at {key}: {reason}")]
    CorruptEntry { key: String, reason: String },

    /// Hashing or code-generation machinery failed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TwostepError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn corrupt_entry(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CorruptEntry {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is a login denial, as opposed to an input,
    /// storage, or internal failure.
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_)
                | Self::NoMatchingToken(_)
                | Self::MissingConnection
                | Self::PermissionDenied
        )
    }

    /// Stable machine-readable tag for logs and structured responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "missing_field",
            Self::InvalidCredential => "invalid_credential",
            Self::UserNotFound(_) => "user_not_found",
            Self::NoMatchingToken(_) => "no_matching_token",
            Self::MissingConnection => "missing_connection",
            Self::PermissionDenied => "permission_denied",
            Self::PolicyChanged => "policy_changed",
            Self::Storage(_) => "storage",
            Self::CorruptEntry { .. } => "corrupt_entry",
            Self::Internal(_) => "internal",
        }
    }

    /// Render this error as the structured map a dispatch layer returns.
    pub fn to_response_fields(&self) -> HashMap<String, String> {
        let mut fields = HashMap::new();
        fields.insert("error".to_string(), self.to_string());
        fields.insert("kind".to_string(), self.kind().to_string());
        fields
    }
}

pub type Result<T> = std::result::Result<T, TwostepError>;
