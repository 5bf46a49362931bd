//! Credential splitting.
//!
//! A login credential is the user's PIN immediately followed by the
//! current one-time code. The split is positional: the trailing
//! [`CODE_WIDTH`] characters are always the code, everything before them
//! is the PIN, regardless of character content.

use crate::error::{Result, TwostepError};

/// Width of the one-time code portion of a credential, in characters.
pub const CODE_WIDTH: usize = 6;

/// Split a concatenated `pin + code` credential into its two parts.
///
/// Returns [`TwostepError::InvalidCredential`] if the string holds fewer
/// than `CODE_WIDTH + 1` characters (there must be at least one PIN
/// character). Pure and side-effect free; callers invoke it before any
/// storage access.
pub fn split_credential(credential: &str) -> Result<(&str, &str)> {
    // Byte offset of the CODE_WIDTH-th character from the end. Counting
    // characters, not bytes, keeps multi-byte PINs intact.
    let split_at = credential
        .char_indices()
        .rev()
        .nth(CODE_WIDTH - 1)
        .map(|(idx, _)| idx)
        .ok_or(TwostepError::InvalidCredential)?;

    if split_at == 0 {
        return Err(TwostepError::InvalidCredential);
    }

    Ok((&credential[..split_at], &credential[split_at..]))
}
