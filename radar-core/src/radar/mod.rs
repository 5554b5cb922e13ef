/*
    radar - Named reputation lists and their registry

    Handles:
    - list entries and their attribution metadata
    - public lists mirrored from a remote document
    - private lists owned and persisted locally
    - cross-list lookups for render hooks and commands
*/

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod codec;
pub mod entry;
pub mod errors;
pub mod list;
pub mod refresh;
pub mod registry;

pub use entry::ListEntry;
pub use errors::{RadarError, RadarResult};
pub use list::RadarList;
pub use refresh::RefreshHandle;
pub use registry::ListRegistry;

/// Longest accepted namespace
pub const MAX_NAMESPACE_LEN: usize = 64;

/// Where a list's entries come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    /// Mirrored read-only from a remote document
    Public,
    /// Owned locally and persisted to disk
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => f.write_str("public"),
            Visibility::Private => f.write_str("private"),
        }
    }
}

/// Namespaces double as file names: ASCII letters, digits, `_` and `-`
pub fn is_valid_namespace(namespace: &str) -> bool {
    !namespace.is_empty()
        && namespace.len() <= MAX_NAMESPACE_LEN
        && namespace
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}
