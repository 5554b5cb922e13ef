/*
    codec.rs - On-disk and remote list formats

    Private list file (pretty JSON, one per namespace):
    {
      "namespace": "vip",
      "prefix": "[VIP]",
      "visibility": "PRIVATE",
      "players": [
        { "uuid": "...", "name": "Alice", "cause": "trusted trader",
          "entryCreatedAt": "2024-03-01T12:00:00Z",
          "entryUpdatedAt": "2024-03-01T12:00:00Z" }
      ]
    }

    Remote public list: either a bare array of player records or an object
    carrying the array under "players" (or "entries"). Records need an
    identity ("uuid"/"id", dashed or compact) and a "name"; the rest is
    optional.
*/

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::entry::ListEntry;
use super::errors::{RadarError, RadarResult};
use super::Visibility;
use crate::identity::parse_identity;

/// Decoded contents of a private list file
#[derive(Debug, Clone)]
pub struct ListDocument {
    pub namespace: String,
    pub prefix: String,
    pub visibility: Visibility,
    pub entries: HashMap<Uuid, ListEntry>,
}

#[derive(Serialize, Deserialize)]
struct StoredList {
    namespace: String,
    prefix: String,
    visibility: Visibility,
    #[serde(default)]
    players: Vec<StoredEntry>,
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    uuid: Uuid,
    name: String,
    #[serde(default)]
    cause: String,
    #[serde(rename = "entryCreatedAt")]
    created_at: DateTime<Utc>,
    #[serde(rename = "entryUpdatedAt")]
    updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RemoteDocument {
    Bare(Vec<RemoteEntry>),
    Wrapped {
        #[serde(alias = "entries")]
        players: Vec<RemoteEntry>,
    },
}

#[derive(Deserialize)]
struct RemoteEntry {
    #[serde(alias = "id")]
    uuid: String,
    name: String,
    #[serde(default)]
    cause: Option<String>,
    #[serde(default, rename = "entryCreatedAt", alias = "createdAt")]
    created_at: Option<String>,
    #[serde(default, rename = "entryUpdatedAt", alias = "updatedAt")]
    updated_at: Option<String>,
}

/// Serialize a list for its backing file
///
/// Entries are written oldest first (ties by identity) so that files diff
/// cleanly between saves.
pub fn encode_list(
    namespace: &str,
    prefix: &str,
    visibility: Visibility,
    entries: &HashMap<Uuid, ListEntry>,
) -> RadarResult<String> {
    let mut players: Vec<StoredEntry> = entries
        .values()
        .map(|entry| StoredEntry {
            uuid: entry.identity(),
            name: entry.display_name().to_string(),
            cause: entry.cause().to_string(),
            created_at: entry.created_at(),
            updated_at: entry.updated_at(),
        })
        .collect();
    players.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.uuid.cmp(&b.uuid)));

    let stored = StoredList {
        namespace: namespace.to_string(),
        prefix: prefix.to_string(),
        visibility,
        players,
    };
    Ok(serde_json::to_string_pretty(&stored)?)
}

/// Parse a private list file
pub fn decode_list(text: &str) -> RadarResult<ListDocument> {
    let stored: StoredList = serde_json::from_str(text)?;

    let entries = stored
        .players
        .into_iter()
        .map(|p| {
            let entry = ListEntry::with_timestamps(p.uuid, p.name, p.cause, p.created_at, p.updated_at);
            (p.uuid, entry)
        })
        .collect();

    Ok(ListDocument {
        namespace: stored.namespace,
        prefix: stored.prefix,
        visibility: stored.visibility,
        entries,
    })
}

/// Parse a remote list body into a full replacement entry map
///
/// A single unusable record rejects the whole document.
pub fn parse_remote(
    url: &str,
    body: &str,
    fetched_at: DateTime<Utc>,
) -> RadarResult<HashMap<Uuid, ListEntry>> {
    let malformed = |reason: String| RadarError::MalformedDocument {
        url: url.to_string(),
        reason,
    };

    let document: RemoteDocument = serde_json::from_str(body).map_err(|e| {
        malformed(format!(
            "expected an array of players or an object with `players`: {}",
            e
        ))
    })?;
    let records = match document {
        RemoteDocument::Bare(records) => records,
        RemoteDocument::Wrapped { players } => players,
    };

    let mut entries = HashMap::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let identity = parse_identity(&record.uuid)
            .ok_or_else(|| malformed(format!("record {}: bad identity {:?}", index, record.uuid)))?;
        if record.name.trim().is_empty() {
            return Err(malformed(format!("record {}: empty name", index)));
        }

        let created_at = optional_timestamp(record.created_at.as_deref())
            .map_err(|raw| malformed(format!("record {}: bad timestamp {:?}", index, raw)))?
            .unwrap_or(fetched_at);
        let updated_at = optional_timestamp(record.updated_at.as_deref())
            .map_err(|raw| malformed(format!("record {}: bad timestamp {:?}", index, raw)))?
            .unwrap_or(created_at);

        let entry = ListEntry::with_timestamps(
            identity,
            record.name,
            record.cause.unwrap_or_default(),
            created_at,
            updated_at,
        );
        entries.insert(identity, entry);
    }

    Ok(entries)
}

fn optional_timestamp(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, String> {
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_timestamp(s).map(Some).ok_or_else(|| s.to_string()),
    }
}

/// Accepts RFC 3339 and zone-less `YYYY-MM-DD[T ]HH:MM:SS[.fff]` (read as UTC)
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
