/*
    entry.rs - One identity's record inside a radar list

    Entries are values: every change produces a new ListEntry, so a map
    snapshot handed to a reader never changes underneath it.
*/

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Display format for entry timestamps, e.g. `21.12.2023 17:41:37`
pub const READABLE_TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Attribution record for a listed identity
///
/// `updated_at >= created_at` holds for every value; the constructors clamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    identity: Uuid,
    display_name: String,
    cause: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ListEntry {
    /// Entry first seen at `at`
    pub fn new(
        identity: Uuid,
        display_name: impl Into<String>,
        cause: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self::with_timestamps(identity, display_name, cause, at, at)
    }

    /// Entry with explicit timestamps; an `updated_at` older than
    /// `created_at` is raised to `created_at`
    pub fn with_timestamps(
        identity: Uuid,
        display_name: impl Into<String>,
        cause: impl Into<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            identity,
            display_name: display_name.into(),
            cause: cause.into(),
            created_at,
            updated_at: updated_at.max(created_at),
        }
    }

    /// Re-add under the same identity: new name and cause, creation kept
    pub fn readd(
        &self,
        display_name: impl Into<String>,
        cause: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self::with_timestamps(self.identity, display_name, cause, self.created_at, at)
    }

    pub fn identity(&self) -> Uuid {
        self.identity
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn cause(&self) -> &str {
        &self.cause
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Render a timestamp with [`READABLE_TIMESTAMP_FORMAT`]
    pub fn format_timestamp(at: DateTime<Utc>) -> String {
        at.format(READABLE_TIMESTAMP_FORMAT).to_string()
    }
}
