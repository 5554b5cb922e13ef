/*
    resolver.rs - Name -> identity resolution

    Fallback chain, first hit wins:
    1. positive cache
    2. session roster (case-insensitive)
    3. alias marker / non-queryable name / negative cache -> None
    4. directory GET <directory_url><name>

    Only definite answers are cached: a directory id, or 204/404 meaning
    "no such account". Transport errors and odd responses are retried on the
    next call. Caches live as long as the resolver.
*/

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use super::chat::ChatSenderPattern;
use super::normalize_compact_id;
use super::roster::SessionRoster;
use crate::config::ResolverConfig;
use crate::http::HttpFetch;

/// Longest account name the directory knows
const MAX_ACCOUNT_NAME_LEN: usize = 16;

/// Where a resolved identity came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveSource {
    Cache,
    Roster,
    Directory,
}

impl ResolveSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolveSource::Cache => "cache",
            ResolveSource::Roster => "roster",
            ResolveSource::Directory => "directory",
        }
    }
}

impl fmt::Display for ResolveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize)]
struct DirectoryProfile {
    id: String,
    #[allow(dead_code)]
    name: String,
}

/// Resolves player names to identities
pub struct IdentityResolver {
    fetcher: Arc<dyn HttpFetch>,
    directory_url: String,
    timeout: Duration,
    alias_markers: Vec<char>,
    nick_markers: Vec<char>,
    chat_pattern: ChatSenderPattern,
    known: RwLock<HashMap<String, Uuid>>,
    unknown: RwLock<HashSet<String>>,
    roster: RwLock<Option<Arc<dyn SessionRoster>>>,
}

impl IdentityResolver {
    pub fn new(fetcher: Arc<dyn HttpFetch>, config: &ResolverConfig) -> Self {
        Self {
            fetcher,
            directory_url: config.directory_url.clone(),
            timeout: config.timeout,
            alias_markers: config.alias_markers.clone(),
            nick_markers: config.nick_markers.clone(),
            chat_pattern: ChatSenderPattern::default(),
            known: RwLock::new(HashMap::new()),
            unknown: RwLock::new(HashSet::new()),
            roster: RwLock::new(None),
        }
    }

    pub fn with_chat_pattern(mut self, pattern: ChatSenderPattern) -> Self {
        self.chat_pattern = pattern;
        self
    }

    /// Attach the roster of a joined session, or detach with `None`
    pub fn set_roster(&self, roster: Option<Arc<dyn SessionRoster>>) {
        *self.roster.write().unwrap_or_else(PoisonError::into_inner) = roster;
    }

    pub fn roster(&self) -> Option<Arc<dyn SessionRoster>> {
        self.roster
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True when `name` starts with one of the alias markers
    pub fn is_alias(&self, name: &str) -> bool {
        starts_with_any(name, &self.alias_markers)
    }

    /// True when `name` is a nick (hidden account) rather than an account name
    pub fn is_nick(&self, name: &str) -> bool {
        starts_with_any(name, &self.nick_markers)
    }

    /// Resolve `name` to an identity; `None` when it cannot be resolved
    pub async fn resolve(&self, name: &str) -> Option<Uuid> {
        self.lookup(name).await.map(|(identity, _)| identity)
    }

    /// Like [`IdentityResolver::resolve`], also reporting the answering source
    pub async fn lookup(&self, name: &str) -> Option<(Uuid, ResolveSource)> {
        let result = self.lookup_inner(name).await;
        let source = result.map_or("miss", |(_, source)| source.as_str());
        metrics::counter!("radar_resolver_lookups_total", "source" => source).increment(1);
        result
    }

    async fn lookup_inner(&self, name: &str) -> Option<(Uuid, ResolveSource)> {
        let key = cache_key(name);
        if key.is_empty() {
            return None;
        }

        if let Some(identity) = self.cached(&key) {
            return Some((identity, ResolveSource::Cache));
        }

        if let Some(identity) = self.roster().and_then(|roster| roster.find(name.trim())) {
            self.remember(key, identity);
            return Some((identity, ResolveSource::Roster));
        }

        if self.is_alias(name.trim()) || !is_queryable(&key) || self.is_known_missing(&key) {
            debug!(name, "name not resolvable without a session");
            return None;
        }

        let identity = self.query_directory(&key).await?;
        self.remember(key, identity);
        Some((identity, ResolveSource::Directory))
    }

    /// Sender of a rendered chat line, resolved
    ///
    /// Lines without a sender and nicked senders give `None` without any
    /// lookup. Other alias names still go through the roster.
    pub async fn resolve_chat_sender(&self, line: &str) -> Option<Uuid> {
        let sender = self.chat_pattern.sender(line)?;
        if self.is_nick(sender) {
            return None;
        }
        self.resolve(sender).await
    }

    async fn query_directory(&self, key: &str) -> Option<Uuid> {
        let url = format!("{}{}", self.directory_url, key);
        let response = match self.fetcher.get(&url, self.timeout).await {
            Ok(response) => response,
            Err(e) => {
                warn!(name = key, error = %e, "directory lookup failed");
                return None;
            }
        };

        match response.status {
            200 => {}
            204 | 404 => {
                debug!(name = key, status = response.status, "no such account");
                self.forget(key);
                return None;
            }
            status => {
                warn!(name = key, url = %url, status, "directory returned unexpected status");
                return None;
            }
        }

        let profile: DirectoryProfile = match serde_json::from_str(&response.body) {
            Ok(profile) => profile,
            Err(e) => {
                warn!(name = key, error = %e, "malformed directory response");
                return None;
            }
        };
        let identity = normalize_compact_id(&profile.id);
        if identity.is_none() {
            warn!(name = key, id = %profile.id, "directory returned a malformed id");
        }
        identity
    }

    fn cached(&self, key: &str) -> Option<Uuid> {
        self.known
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
    }

    fn is_known_missing(&self, key: &str) -> bool {
        self.unknown
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    fn remember(&self, key: String, identity: Uuid) {
        self.known
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, identity);
    }

    fn forget(&self, key: &str) {
        self.unknown
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string());
    }
}

impl fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("directory_url", &self.directory_url)
            .field("timeout", &self.timeout)
            .field("alias_markers", &self.alias_markers)
            .field("nick_markers", &self.nick_markers)
            .finish_non_exhaustive()
    }
}

fn starts_with_any(name: &str, markers: &[char]) -> bool {
    name.chars()
        .next()
        .is_some_and(|first| markers.contains(&first))
}

/// Account names are case-insensitive
fn cache_key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Names the directory can answer for: ASCII letters, digits and `_`
fn is_queryable(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_ACCOUNT_NAME_LEN
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{RosterPlayer, StaticRoster};
    use crate::test_utils::ScriptedFetcher;

    const DIRECTORY: &str = "http://directory.test/profiles/";

    fn resolver(fetcher: &Arc<ScriptedFetcher>) -> IdentityResolver {
        let config = ResolverConfig {
            directory_url: DIRECTORY.to_string(),
            timeout: Duration::from_secs(3),
            alias_markers: vec!['!', '~'],
            nick_markers: vec!['~'],
        };
        let shared: Arc<dyn HttpFetch> = fetcher.clone();
        IdentityResolver::new(shared, &config)
    }

    fn notch() -> Uuid {
        Uuid::parse_str("069a79f4-44e9-4726-a5be-fca90e38aaf5").unwrap()
    }

    #[tokio::test]
    async fn test_directory_hit_is_cached() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.respond(
            &format!("{}notch", DIRECTORY),
            200,
            r#"{"id": "069a79f444e94726a5befca90e38aaf5", "name": "Notch"}"#,
        );
        let resolver = resolver(&fetcher);

        assert_eq!(resolver.lookup("Notch").await, Some((notch(), ResolveSource::Directory)));
        assert_eq!(resolver.lookup("notch").await, Some((notch(), ResolveSource::Cache)));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_alias_names_skip_network() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let resolver = resolver(&fetcher);

        assert_eq!(resolver.resolve("!anything").await, None);
        assert_eq!(resolver.resolve("~nick").await, None);
        assert_eq!(resolver.resolve("with space").await, None);
        assert_eq!(resolver.resolve("../etc").await, None);
        assert_eq!(resolver.resolve("").await, None);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_roster_wins_over_directory() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let resolver = resolver(&fetcher);
        let bedrock = Uuid::from_bytes([7; 16]);
        let roster = StaticRoster::new(vec![RosterPlayer::new("!Bedrock", bedrock)]);
        resolver.set_roster(Some(Arc::new(roster)));

        assert_eq!(resolver.lookup("!bedrock").await, Some((bedrock, ResolveSource::Roster)));
        assert_eq!(resolver.lookup("!Bedrock").await, Some((bedrock, ResolveSource::Cache)));
        assert_eq!(fetcher.calls(), 0);

        resolver.set_roster(None);
        assert!(resolver.roster().is_none());
        assert_eq!(resolver.resolve("!BEDROCK").await, Some(bedrock));
    }

    #[tokio::test]
    async fn test_unknown_account_is_negative_cached() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.respond(&format!("{}ghost", DIRECTORY), 404, "");
        fetcher.respond(&format!("{}empty", DIRECTORY), 204, "");
        let resolver = resolver(&fetcher);

        assert_eq!(resolver.resolve("ghost").await, None);
        assert_eq!(resolver.resolve("ghost").await, None);
        assert_eq!(resolver.resolve("empty").await, None);
        assert_eq!(resolver.resolve("Empty").await, None);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_transient_failures_are_not_cached() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let url = format!("{}notch", DIRECTORY);
        let resolver = resolver(&fetcher);

        fetcher.fail(&url);
        assert_eq!(resolver.resolve("Notch").await, None);
        fetcher.respond(&url, 429, "slow down");
        assert_eq!(resolver.resolve("Notch").await, None);
        fetcher.respond(&url, 200, "not json");
        assert_eq!(resolver.resolve("Notch").await, None);
        fetcher.respond(&url, 200, r#"{"id": "xyz", "name": "Notch"}"#);
        assert_eq!(resolver.resolve("Notch").await, None);

        fetcher.respond(&url, 200, r#"{"id": "069a79f444e94726a5befca90e38aaf5", "name": "Notch"}"#);
        assert_eq!(resolver.resolve("Notch").await, Some(notch()));
        assert_eq!(fetcher.calls(), 5);
    }

    #[tokio::test]
    async fn test_chat_sender() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let resolver = resolver(&fetcher);
        let alice = Uuid::from_bytes([1; 16]);
        resolver.set_roster(Some(Arc::new(StaticRoster::new(vec![RosterPlayer::new("Alice", alice)]))));

        assert_eq!(resolver.resolve_chat_sender("Spieler ┃ Alice » hi").await, Some(alice));
        assert_eq!(resolver.resolve_chat_sender("Spieler ┃ ~Alice » hi").await, None);
        assert_eq!(resolver.resolve_chat_sender("[Server] restart soon").await, None);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_bedrock_chat_sender_uses_roster() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let resolver = resolver(&fetcher);
        let carol = Uuid::from_bytes([3; 16]);

        assert_eq!(resolver.resolve_chat_sender("Spieler ┃ !Carol » hi").await, None);

        resolver.set_roster(Some(Arc::new(StaticRoster::new(vec![
            RosterPlayer::new("!Carol", carol),
            RosterPlayer::new("~Ghost", Uuid::from_bytes([4; 16])),
        ]))));
        assert!(!resolver.is_nick("!Carol"));
        assert_eq!(resolver.resolve_chat_sender("Spieler ┃ !Carol » hi").await, Some(carol));
        assert_eq!(resolver.resolve_chat_sender("Spieler ┃ ~Ghost » hi").await, None);
        assert_eq!(fetcher.calls(), 0);
    }

    #[test]
    fn test_queryable_names() {
        assert!(is_queryable("notch"));
        assert!(is_queryable("a_b_3"));
        assert!(!is_queryable("seventeen_chars_x"));
        assert!(!is_queryable("a/b"));
        assert!(!is_queryable("ümlaut"));
    }
}
