/*
    list.rs - A single radar list (one namespace)

    Concurrency:
    - `entries` holds an Arc'd map that is replaced whole, never edited in
      place. Readers clone the Arc and work on a stable snapshot.
    - `write_lock` serializes writers so clone -> persist -> swap sequences
      of concurrent mutations cannot lose each other's updates.
    - Private lists only swap after the new state reached disk.
    - Once unregistered a list is retired: late writers holding an Arc to
      it fail instead of recreating its file.
    - `sync_lock` is held from fetch to swap, so overlapping syncs of one
      list apply in call order and a slow stale response never lands last.
*/

use chrono::Utc;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::codec::{self, ListDocument};
use super::entry::ListEntry;
use super::errors::{RadarError, RadarResult};
use super::Visibility;
use crate::http::{FetchError, HttpFetch};

type EntryMap = HashMap<Uuid, ListEntry>;

/// One namespace of listed identities
#[derive(Debug)]
pub struct RadarList {
    namespace: String,
    visibility: Visibility,
    /// Remote document url, public lists only
    source_url: Option<String>,
    /// Backing file, private lists only
    backing_file: Option<PathBuf>,
    prefix: RwLock<String>,
    entries: RwLock<Arc<EntryMap>>,
    write_lock: Mutex<()>,
    sync_lock: tokio::sync::Mutex<()>,
    retired: AtomicBool,
}

impl RadarList {
    /// Empty remotely synchronized list
    pub fn public(namespace: impl Into<String>, prefix: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            visibility: Visibility::Public,
            source_url: Some(url.into()),
            backing_file: None,
            prefix: RwLock::new(prefix.into()),
            entries: RwLock::new(Arc::new(HashMap::new())),
            write_lock: Mutex::new(()),
            sync_lock: tokio::sync::Mutex::new(()),
            retired: AtomicBool::new(false),
        }
    }

    /// Empty locally owned list stored at `backing_file`; nothing is written yet
    pub fn private(namespace: impl Into<String>, prefix: impl Into<String>, backing_file: PathBuf) -> Self {
        Self {
            namespace: namespace.into(),
            visibility: Visibility::Private,
            source_url: None,
            backing_file: Some(backing_file),
            prefix: RwLock::new(prefix.into()),
            entries: RwLock::new(Arc::new(HashMap::new())),
            write_lock: Mutex::new(()),
            sync_lock: tokio::sync::Mutex::new(()),
            retired: AtomicBool::new(false),
        }
    }

    /// Private list rebuilt from a decoded file; the stored visibility is ignored
    pub(crate) fn from_document(doc: ListDocument, backing_file: PathBuf) -> Self {
        if doc.visibility != Visibility::Private {
            debug!(
                namespace = %doc.namespace,
                path = %backing_file.display(),
                "list file claims {} visibility, loading as private",
                doc.visibility
            );
        }
        let list = Self::private(doc.namespace, doc.prefix, backing_file);
        *list.entries.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(doc.entries);
        list
    }

    /// Read and decode a private list file
    pub fn load(path: &Path) -> RadarResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| RadarError::io(path, e))?;
        let doc = codec::decode_list(&text)?;
        Ok(Self::from_document(doc, path.to_path_buf()))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_private(&self) -> bool {
        self.visibility == Visibility::Private
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    pub fn backing_file(&self) -> Option<&Path> {
        self.backing_file.as_deref()
    }

    pub fn prefix(&self) -> String {
        self.prefix.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Change the prefix in memory only; see [`RadarList::save`]
    pub fn set_prefix(&self, text: impl Into<String>) {
        *self.prefix.write().unwrap_or_else(PoisonError::into_inner) = text.into();
    }

    /// Current entry map; later mutations never show up in it
    pub fn snapshot(&self) -> Arc<EntryMap> {
        Arc::clone(&self.entries.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn is_member(&self, identity: &Uuid) -> bool {
        self.snapshot().contains_key(identity)
    }

    pub fn entry(&self, identity: &Uuid) -> Option<ListEntry> {
        self.snapshot().get(identity).cloned()
    }

    /// All entries, oldest first
    pub fn entries(&self) -> Vec<ListEntry> {
        let mut entries: Vec<ListEntry> = self.snapshot().values().cloned().collect();
        entries.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.identity().cmp(&b.identity()))
        });
        entries
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Write the current state to the backing file; no-op for public lists
    pub fn save(&self) -> RadarResult<()> {
        if !self.is_private() {
            return Ok(());
        }
        let _guard = self.write_lock.lock()?;
        self.ensure_active()?;
        self.persist(&self.prefix(), &self.snapshot())
    }

    /// Insert or refresh an entry and persist before it becomes visible
    pub(crate) fn upsert(
        &self,
        identity: Uuid,
        display_name: &str,
        cause: &str,
    ) -> RadarResult<ListEntry> {
        self.ensure_private()?;
        let _guard = self.write_lock.lock()?;
        self.ensure_active()?;

        let now = Utc::now();
        let mut next = EntryMap::clone(&self.snapshot());
        let entry = match next.get(&identity) {
            Some(existing) => existing.readd(display_name, cause, now),
            None => ListEntry::new(identity, display_name, cause, now),
        };
        next.insert(identity, entry.clone());

        self.persist(&self.prefix(), &next)?;
        self.swap(next);
        Ok(entry)
    }

    /// Drop an entry and persist before the removal becomes visible
    pub(crate) fn remove(&self, identity: &Uuid) -> RadarResult<ListEntry> {
        self.ensure_private()?;
        let _guard = self.write_lock.lock()?;
        self.ensure_active()?;

        let mut next = EntryMap::clone(&self.snapshot());
        let removed = next.remove(identity).ok_or_else(|| RadarError::NotListed {
            namespace: self.namespace.clone(),
            identity: *identity,
        })?;

        self.persist(&self.prefix(), &next)?;
        self.swap(next);
        Ok(removed)
    }

    /// Change the prefix; private lists persist it first
    pub(crate) fn update_prefix(&self, prefix: &str) -> RadarResult<()> {
        let _guard = self.write_lock.lock()?;
        if self.is_private() {
            self.ensure_active()?;
            self.persist(prefix, &self.snapshot())?;
        }
        self.set_prefix(prefix);
        Ok(())
    }

    /// Fetch the remote document and replace all entries with it
    ///
    /// On any failure the previous entries stay untouched. Returns the new
    /// entry count.
    pub async fn synchronize(&self, fetcher: &dyn HttpFetch, timeout: Duration) -> RadarResult<usize> {
        let url = self
            .source_url
            .as_deref()
            .ok_or_else(|| RadarError::NotPublic(self.namespace.clone()))?;

        let _sync = self.sync_lock.lock().await;
        let result = Self::fetch_document(fetcher, url, timeout).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(RadarError::MalformedDocument { .. }) => "malformed",
            Err(_) => "unreachable",
        };
        metrics::counter!("radar_list_sync_total", "outcome" => outcome).increment(1);

        let entries = match result {
            Ok(entries) => entries,
            Err(e) => {
                warn!(namespace = %self.namespace, url, error = %e, "keeping previous list snapshot");
                return Err(e);
            }
        };

        let count = entries.len();
        {
            let _guard = self.write_lock.lock()?;
            self.swap(entries);
        }
        metrics::gauge!("radar_list_entries", "namespace" => self.namespace.clone()).set(count as f64);
        info!(namespace = %self.namespace, count, "synchronized public list");
        Ok(count)
    }

    async fn fetch_document(fetcher: &dyn HttpFetch, url: &str, timeout: Duration) -> RadarResult<EntryMap> {
        let response = fetcher.get(url, timeout).await?;
        if !response.is_ok() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status,
            }
            .into());
        }
        codec::parse_remote(url, &response.body, Utc::now())
    }

    /// Remove the backing file and retire the list
    ///
    /// An already missing file counts as removed. On error the list stays
    /// active and its file untouched.
    pub(crate) fn retire(&self) -> RadarResult<()> {
        let _guard = self.write_lock.lock()?;
        if let Some(path) = self.backing_file.as_deref() {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "list file already gone");
                }
                Err(e) => return Err(RadarError::io(path, e)),
            }
        }
        self.retired.store(true, Ordering::Release);
        Ok(())
    }

    fn ensure_active(&self) -> RadarResult<()> {
        if self.retired.load(Ordering::Acquire) {
            Err(RadarError::UnknownNamespace(self.namespace.clone()))
        } else {
            Ok(())
        }
    }

    fn ensure_private(&self) -> RadarResult<()> {
        if self.is_private() {
            Ok(())
        } else {
            Err(RadarError::NotPrivate(self.namespace.clone()))
        }
    }

    fn swap(&self, next: EntryMap) {
        *self.entries.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
    }

    /// Write to a sibling temp file, then rename over the real one
    fn persist(&self, prefix: &str, entries: &EntryMap) -> RadarResult<()> {
        let Some(path) = self.backing_file.as_deref() else {
            return Ok(());
        };
        let text = codec::encode_list(&self.namespace, prefix, self.visibility, entries)?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, text).map_err(|e| RadarError::io(&temp_path, e))?;
        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(RadarError::io(path, e));
        }
        debug!(namespace = %self.namespace, path = %path.display(), "saved list");
        Ok(())
    }
}
