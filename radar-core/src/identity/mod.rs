//! Identity handling
//!
//! Identities are account UUIDs. This module turns names into identities:
//! the [`IdentityResolver`] fallback chain, the [`SessionRoster`] seam for
//! the players of the current session, and chat-line sender extraction.

use uuid::Uuid;

mod chat;
mod resolver;
mod roster;

pub use chat::ChatSenderPattern;
pub use resolver::{IdentityResolver, ResolveSource};
pub use roster::{RosterPlayer, SessionRoster, StaticRoster};

/// Parse a directory id (32 hex digits, no separators) into an identity
///
/// The digits are regrouped into the dashed `8-4-4-4-12` form before parsing,
/// so only the compact representation is accepted here.
pub fn normalize_compact_id(raw: &str) -> Option<Uuid> {
    let raw = raw.trim();
    if raw.len() != 32 || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let dashed = format!(
        "{}-{}-{}-{}-{}",
        &raw[0..8],
        &raw[8..12],
        &raw[12..16],
        &raw[16..20],
        &raw[20..32]
    );
    Uuid::parse_str(&dashed).ok()
}

/// Parse either the dashed or the compact identity representation
pub fn parse_identity(raw: &str) -> Option<Uuid> {
    let raw = raw.trim();
    if raw.len() == 32 {
        return normalize_compact_id(raw);
    }
    if raw.len() == 36 {
        return Uuid::parse_str(raw).ok();
    }
    None
}
