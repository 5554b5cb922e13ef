/*
    registry.rs - Namespace -> list mapping

    The registry is the single owner of all lists for the process. It is
    built explicitly and shared behind an Arc by whoever needs it (command
    layer, render hooks, refresh task).

    Lookup order is registration order: public lists configured at startup
    come first, then private lists loaded from disk, then lists created at
    runtime. When an identity is on several lists the first registered one
    answers.

    Structural changes (register, load, unregister) take `admin` first and
    do their file I/O under it. The map lock is only held to check and to
    insert or remove, so lookups never wait on the disk.

    Lock order: admin, then the registry map, then a list's write lock.
    None of these is held across an await.
*/

use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::entry::ListEntry;
use super::errors::{RadarError, RadarResult};
use super::list::RadarList;
use super::{is_valid_namespace, Visibility};
use crate::http::HttpFetch;

/// Extension of private list files
const LIST_FILE_EXTENSION: &str = "json";

/// Owner of every registered list
pub struct ListRegistry {
    storage_dir: PathBuf,
    fetcher: Arc<dyn HttpFetch>,
    fetch_timeout: Duration,
    lists: RwLock<IndexMap<String, Arc<RadarList>>>,
    admin: Mutex<()>,
}

impl ListRegistry {
    /// Create an empty registry storing private lists under `storage_dir`
    ///
    /// The directory is created if missing. Failing to create it is logged;
    /// the registry still works for public lists.
    pub fn new(storage_dir: impl Into<PathBuf>, fetcher: Arc<dyn HttpFetch>, fetch_timeout: Duration) -> Self {
        let storage_dir = storage_dir.into();
        if let Err(e) = fs::create_dir_all(&storage_dir) {
            error!(path = %storage_dir.display(), error = %e, "could not create list directory");
        }

        Self {
            storage_dir,
            fetcher,
            fetch_timeout,
            lists: RwLock::new(IndexMap::new()),
            admin: Mutex::new(()),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    fn file_for(&self, namespace: &str) -> PathBuf {
        self.storage_dir
            .join(namespace)
            .with_extension(LIST_FILE_EXTENSION)
    }

    /// Register a public list and fetch it once
    ///
    /// Fails only for a malformed or taken namespace. An unreachable source
    /// leaves the list registered and empty until the next refresh.
    pub async fn register_public(
        &self,
        namespace: &str,
        prefix: &str,
        url: &str,
    ) -> RadarResult<Arc<RadarList>> {
        let list = Arc::new(RadarList::public(namespace, prefix, url));
        {
            let _admin = self.admin.lock()?;
            let mut lists = self.lists.write()?;
            Self::check_free(&lists, namespace)?;
            lists.insert(namespace.to_string(), Arc::clone(&list));
        }
        info!(namespace, url, "registered public list");

        if let Err(e) = list.synchronize(self.fetcher.as_ref(), self.fetch_timeout).await {
            warn!(namespace, error = %e, "public list starts empty");
        }
        Ok(list)
    }

    /// Create an empty private list and write its file before registering it
    pub fn register_private(&self, namespace: &str, prefix: &str) -> RadarResult<Arc<RadarList>> {
        let _admin = self.admin.lock()?;
        Self::check_free(&self.read_lists(), namespace)?;

        let list = Arc::new(RadarList::private(namespace, prefix, self.file_for(namespace)));
        if let Err(e) = list.save() {
            error!(namespace, error = %e, "could not create list file");
            return Err(e);
        }

        self.lists.write()?.insert(namespace.to_string(), Arc::clone(&list));
        info!(namespace, "registered private list");
        Ok(list)
    }

    /// Load every private list file from the storage directory
    ///
    /// Call after the public lists are registered: a file whose namespace is
    /// already taken is skipped. Unreadable files are skipped as well.
    /// Returns the number of lists loaded.
    pub fn load_private_lists(&self) -> RadarResult<usize> {
        let _admin = self.admin.lock()?;
        let dir = match fs::read_dir(&self.storage_dir) {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(RadarError::io(&self.storage_dir, e)),
        };

        let mut paths: Vec<PathBuf> = dir
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path.extension().and_then(|ext| ext.to_str()) == Some(LIST_FILE_EXTENSION)
            })
            .collect();
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            let list = match RadarList::load(&path) {
                Ok(list) => list,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable list file");
                    continue;
                }
            };

            let namespace = list.namespace().to_string();
            let stem = path.file_stem().and_then(|s| s.to_str());
            if !is_valid_namespace(&namespace) || stem != Some(namespace.as_str()) {
                warn!(path = %path.display(), namespace = %namespace, "list file name does not match its namespace");
                continue;
            }

            let mut lists = self.lists.write()?;
            if lists.contains_key(&namespace) {
                warn!(path = %path.display(), namespace = %namespace, "namespace already registered, ignoring private file");
                continue;
            }
            lists.insert(namespace, Arc::new(list));
            loaded += 1;
        }

        info!(loaded, dir = %self.storage_dir.display(), "loaded private lists");
        Ok(loaded)
    }

    /// Drop a list; private lists lose their file first
    ///
    /// If the file cannot be deleted the list stays registered.
    pub fn unregister(&self, namespace: &str) -> RadarResult<Arc<RadarList>> {
        let _admin = self.admin.lock()?;
        let list = self.require(namespace)?;

        if let Err(e) = list.retire() {
            error!(namespace, error = %e, "could not delete list file");
            return Err(e);
        }
        self.lists.write()?.shift_remove(namespace);
        info!(namespace, visibility = %list.visibility(), "unregistered list");
        Ok(list)
    }

    pub fn get_list(&self, namespace: &str) -> Option<Arc<RadarList>> {
        self.read_lists().get(namespace).cloned()
    }

    /// Registered namespaces in lookup order
    pub fn namespaces(&self) -> Vec<String> {
        self.read_lists().keys().cloned().collect()
    }

    /// Namespaces of public lists, in lookup order
    pub fn public_namespaces(&self) -> Vec<String> {
        self.read_lists()
            .values()
            .filter(|list| list.visibility() == Visibility::Public)
            .map(|list| list.namespace().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read_lists().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_lists().is_empty()
    }

    /// First list containing `identity`, in registration order
    pub fn find_entry(&self, identity: &Uuid) -> Option<(String, ListEntry)> {
        self.read_lists().values().find_map(|list| {
            list.entry(identity)
                .map(|entry| (list.namespace().to_string(), entry))
        })
    }

    /// Every list containing `identity`, in registration order
    pub fn find_all_entries(&self, identity: &Uuid) -> Vec<(String, ListEntry)> {
        self.read_lists()
            .values()
            .filter_map(|list| {
                list.entry(identity)
                    .map(|entry| (list.namespace().to_string(), entry))
            })
            .collect()
    }

    /// Prefix to render in front of `identity`, empty when unlisted
    ///
    /// Only takes the map read lock, which no file operation holds.
    pub fn prefix_for(&self, identity: &Uuid) -> String {
        self.read_lists()
            .values()
            .find(|list| list.is_member(identity))
            .map(|list| list.prefix())
            .unwrap_or_default()
    }

    pub fn is_in_any_list(&self, identity: &Uuid) -> bool {
        self.read_lists().values().any(|list| list.is_member(identity))
    }

    /// Add or refresh an entry on a private list; persisted before returning
    pub fn add_entry(
        &self,
        namespace: &str,
        identity: Uuid,
        display_name: &str,
        cause: &str,
    ) -> RadarResult<ListEntry> {
        let list = self.require(namespace)?;
        let entry = list.upsert(identity, display_name, cause)?;
        info!(namespace, %identity, name = display_name, "added list entry");
        Ok(entry)
    }

    /// Remove an entry from a private list; persisted before returning
    pub fn remove_entry(&self, namespace: &str, identity: &Uuid) -> RadarResult<ListEntry> {
        let list = self.require(namespace)?;
        let removed = list.remove(identity)?;
        info!(namespace, %identity, "removed list entry");
        Ok(removed)
    }

    /// Change a list's prefix; private lists persist it
    pub fn set_prefix(&self, namespace: &str, prefix: &str) -> RadarResult<()> {
        self.require(namespace)?.update_prefix(prefix)
    }

    /// Re-fetch one public list
    pub async fn refresh_public(&self, namespace: &str) -> RadarResult<usize> {
        let list = self.require(namespace)?;
        list.synchronize(self.fetcher.as_ref(), self.fetch_timeout).await
    }

    /// Re-fetch every public list, one after another
    pub async fn refresh_all_public(&self) -> Vec<(String, RadarResult<usize>)> {
        let public: Vec<Arc<RadarList>> = self
            .read_lists()
            .values()
            .filter(|list| list.visibility() == Visibility::Public)
            .cloned()
            .collect();

        let mut results = Vec::with_capacity(public.len());
        for list in public {
            let result = list.synchronize(self.fetcher.as_ref(), self.fetch_timeout).await;
            results.push((list.namespace().to_string(), result));
        }
        results
    }

    fn require(&self, namespace: &str) -> RadarResult<Arc<RadarList>> {
        self.get_list(namespace)
            .ok_or_else(|| RadarError::UnknownNamespace(namespace.to_string()))
    }

    fn check_free(lists: &IndexMap<String, Arc<RadarList>>, namespace: &str) -> RadarResult<()> {
        if !is_valid_namespace(namespace) {
            return Err(RadarError::InvalidNamespace(namespace.to_string()));
        }
        if lists.contains_key(namespace) {
            return Err(RadarError::DuplicateNamespace(namespace.to_string()));
        }
        Ok(())
    }

    /// Readers recover from poisoning: the map itself is never left half-written
    fn read_lists(&self) -> std::sync::RwLockReadGuard<'_, IndexMap<String, Arc<RadarList>>> {
        self.lists.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ListRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListRegistry")
            .field("storage_dir", &self.storage_dir)
            .field("namespaces", &self.namespaces())
            .finish()
    }
}
