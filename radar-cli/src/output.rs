//! Plain and JSON renderings of lists and entries

use radar_core::{ListEntry, RadarList};
use serde_json::{json, Value};

pub fn list_line(list: &RadarList) -> String {
    format!(
        "{} {} ({}, {} entries)",
        list.prefix(),
        list.namespace(),
        list.visibility(),
        list.len()
    )
}

pub fn list_json(list: &RadarList) -> Value {
    json!({
        "namespace": list.namespace(),
        "prefix": list.prefix(),
        "visibility": list.visibility(),
        "source": list.source_url(),
        "entries": list.len(),
    })
}

pub fn entry_line(namespace: &str, entry: &ListEntry) -> String {
    let mut line = format!("{} [{}]", entry.display_name(), namespace);
    if !entry.cause().is_empty() {
        line.push_str(&format!(" {}", entry.cause()));
    }
    line.push_str(&format!(
        " (added {}, updated {})",
        ListEntry::format_timestamp(entry.created_at()),
        ListEntry::format_timestamp(entry.updated_at())
    ));
    line
}

pub fn entry_json(namespace: &str, entry: &ListEntry) -> Value {
    json!({
        "namespace": namespace,
        "uuid": entry.identity(),
        "name": entry.display_name(),
        "cause": entry.cause(),
        "entryCreatedAt": entry.created_at(),
        "entryUpdatedAt": entry.updated_at(),
    })
}
