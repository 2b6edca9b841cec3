//! JSON container format.
//!
//! ```json
//! {
//!   "Version": "KMU Transaction Format 1.0",
//!   "KMUHandle": "<base62>-T",
//!   "AdminEmail": "admin@example.com",
//!   "Contents": { "<handle>-P": { "KeyAlgorithm": "Ed25519", ... }, ... }
//! }
//! ```
//!
//! `KMUHandle` and `AdminEmail` appear only for transactions. Block order and
//! entry order are kept as written in both directions.

mod blocks;
mod reader;
mod writer;

pub use blocks::{blocks_to_contents, contents_to_blocks, LINE_WIDTH};
pub use reader::{from_str, from_value, read_file};
pub use writer::{to_string, to_value, write_file, write_keys};

/// Top-level member names.
pub mod field {
    pub const VERSION: &str = "Version";
    pub const KMU_HANDLE: &str = "KMUHandle";
    pub const ADMIN_EMAIL: &str = "AdminEmail";
    pub const CONTENTS: &str = "Contents";
}
