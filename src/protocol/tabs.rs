//! Tab splitting and joining
//!
//! A site's document is a sequence of tabs glued together with a fixed
//! 128-hex-character separator that real content will not contain.

use once_cell::sync::Lazy;

use super::hash::hex_sha512;

/// Separator between tabs: `hex_sha512("-- tab separator --")`
pub static TAB_SEPARATOR: Lazy<String> = Lazy::new(|| hex_sha512("-- tab separator --"));

/// Split a document into tabs. An empty document has no tabs.
pub fn split_tabs(document: &str) -> Vec<String> {
    if document.is_empty() {
        return Vec::new();
    }
    document
        .split(TAB_SEPARATOR.as_str())
        .map(str::to_owned)
        .collect()
}

/// Join tabs back into a single document
pub fn join_tabs<S: AsRef<str>>(tabs: &[S]) -> String {
    tabs.iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(TAB_SEPARATOR.as_str())
}
