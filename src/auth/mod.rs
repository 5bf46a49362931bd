//! Credential verification primitives: splitting, PIN hashing, TOTP codes.

pub mod credential;
pub mod pin;
pub mod totp;

pub use credential::{split_credential, CODE_WIDTH};
pub use pin::{PinConfig, PinHasher};
pub use totp::{TotpConfig, TotpManager};
