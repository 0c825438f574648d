//! Site identity tags
//!
//! Every saved plaintext ends with the site's identifier so that a client can
//! tell, after decrypting, that the content really belongs to the site it
//! asked for (and not to another site sharing the same passphrase).

use std::fmt;

use super::hash::hex_sha512;
use crate::error::{ProtectedTextError, ProtectedTextResult};

/// Length in characters of a hex SHA-512 digest
pub const TAG_LEN: usize = 128;

/// Deterministic identifier of a site: `hex_sha512("/" + name)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SiteId(String);

impl SiteId {
    /// Derive the identifier for a site name
    pub fn for_site(name: &str) -> Self {
        Self(hex_sha512(&format!("/{}", name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append this site's tag to `text`, ready for encryption
    pub fn tag(&self, text: &str) -> String {
        let mut tagged = String::with_capacity(text.len() + TAG_LEN);
        tagged.push_str(text);
        tagged.push_str(&self.0);
        tagged
    }

    /// Verify and strip the trailing tag from decrypted text.
    ///
    /// Fails with [`ProtectedTextError::IntegrityMismatch`] when the text has
    /// no well-formed trailing tag or the tag belongs to another site.
    pub fn untag<'a>(&self, decrypted: &'a str) -> ProtectedTextResult<&'a str> {
        let (body, tag) =
            split_trailing_tag(decrypted).ok_or(ProtectedTextError::IntegrityMismatch)?;
        if tag != self.0 {
            return Err(ProtectedTextError::IntegrityMismatch);
        }
        Ok(body)
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Split off the last 128 characters if they are lowercase hex.
fn split_trailing_tag(text: &str) -> Option<(&str, &str)> {
    let start = text.len().checked_sub(TAG_LEN)?;
    // Hex is ASCII, so a valid tag always starts on a char boundary
    if !text.is_char_boundary(start) {
        return None;
    }
    let (body, tag) = text.split_at(start);
    tag.bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        .then_some((body, tag))
}
