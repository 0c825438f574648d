//! Pure protocol helpers
//!
//! Hashing, site tagging and tab handling shared by the client. Nothing in
//! here performs I/O.

pub mod hash;
pub mod site;
pub mod tabs;

pub use hash::{concurrency_token, hex_sha512, DbVersion};
pub use site::SiteId;
pub use tabs::{join_tabs, split_tabs, TAB_SEPARATOR};
