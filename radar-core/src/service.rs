//! Radar service
//!
//! Wires configuration, the list registry and the identity resolver into the
//! operations the command layer and the render hooks call. Construct it once
//! with [`RadarService::start`] and share it behind an `Arc`.

use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{Config, ConfigError};
use crate::host::is_tracked_host;
use crate::http::HttpFetch;
use crate::identity::IdentityResolver;
use crate::radar::{ListEntry, ListRegistry, RadarError, RefreshHandle};

/// Result of checking one player name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The name could not be resolved to an identity
    Unresolved,
    /// Resolved, but on no list
    NotListed,
    /// First list containing the player
    Listed {
        namespace: String,
        prefix: String,
        entry: ListEntry,
    },
}

/// Result of adding or removing a player by name
#[derive(Debug)]
pub enum PlayerOutcome {
    Added(ListEntry),
    Removed(ListEntry),
    UnknownList,
    /// `alias` is set when the name carried an alias marker
    NameUnresolved { alias: bool },
    AlreadyListed,
    NotListed,
    /// The registry refused the change (public list, storage failure)
    Rejected(RadarError),
}

impl PlayerOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PlayerOutcome::Added(_) | PlayerOutcome::Removed(_))
    }
}

/// Process-wide radar state
pub struct RadarService {
    config: Config,
    registry: Arc<ListRegistry>,
    resolver: IdentityResolver,
    refresh: Mutex<Option<RefreshHandle>>,
}

impl RadarService {
    /// Validate `config`, register its public lists, then load private lists
    ///
    /// Unreachable list sources and unreadable list files are logged and do
    /// not fail startup. Spawns the refresh task when an interval is
    /// configured, so it must run inside a tokio runtime.
    pub async fn start(config: Config, fetcher: Arc<dyn HttpFetch>) -> Result<Self, ConfigError> {
        config.validate()?;

        let registry = Arc::new(ListRegistry::new(
            config.storage.lists_dir.clone(),
            Arc::clone(&fetcher),
            config.sync.fetch_timeout,
        ));
        let resolver = IdentityResolver::new(fetcher, &config.resolver);

        for list in &config.public_lists {
            if let Err(e) = registry
                .register_public(&list.namespace, &list.prefix, &list.url)
                .await
            {
                error!(namespace = %list.namespace, error = %e, "could not register public list");
            }
        }

        if let Err(e) = registry.load_private_lists() {
            error!(dir = %registry.storage_dir().display(), error = %e, "could not load private lists");
        }

        let refresh = config
            .sync
            .refresh_interval
            .map(|interval| registry.spawn_refresh(interval));

        info!(lists = registry.len(), "radar started");
        Ok(Self {
            config,
            registry,
            resolver,
            refresh: Mutex::new(refresh),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ListRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    /// Whether the radar should decorate players on `host`
    pub fn is_active_on(&self, host: &str) -> bool {
        is_tracked_host(host, &self.config.hosts.tracked_suffixes)
    }

    pub async fn check_player(&self, name: &str) -> CheckOutcome {
        let Some(identity) = self.resolver.resolve(name).await else {
            return CheckOutcome::Unresolved;
        };
        match self.registry.find_entry(&identity) {
            Some((namespace, entry)) => {
                let prefix = self
                    .registry
                    .get_list(&namespace)
                    .map(|list| list.prefix())
                    .unwrap_or_default();
                CheckOutcome::Listed {
                    namespace,
                    prefix,
                    entry,
                }
            }
            None => CheckOutcome::NotListed,
        }
    }

    /// Listed players of the attached roster, roster order
    pub fn check_roster(&self) -> Vec<(String, ListEntry)> {
        let Some(roster) = self.resolver.roster() else {
            return Vec::new();
        };
        roster
            .players()
            .iter()
            .filter_map(|player| self.registry.find_entry(&player.identity))
            .collect()
    }

    pub async fn add_player(&self, namespace: &str, name: &str, cause: &str) -> PlayerOutcome {
        let Some(list) = self.registry.get_list(namespace) else {
            return PlayerOutcome::UnknownList;
        };
        let Some(identity) = self.resolver.resolve(name).await else {
            return PlayerOutcome::NameUnresolved {
                alias: self.resolver.is_alias(name),
            };
        };
        if list.is_member(&identity) {
            return PlayerOutcome::AlreadyListed;
        }

        match self.registry.add_entry(namespace, identity, name, cause) {
            Ok(entry) => PlayerOutcome::Added(entry),
            Err(e) => {
                warn!(namespace, name, error = %e, "could not add player");
                PlayerOutcome::Rejected(e)
            }
        }
    }

    pub async fn remove_player(&self, namespace: &str, name: &str) -> PlayerOutcome {
        let Some(list) = self.registry.get_list(namespace) else {
            return PlayerOutcome::UnknownList;
        };
        let Some(identity) = self.resolver.resolve(name).await else {
            return PlayerOutcome::NameUnresolved {
                alias: self.resolver.is_alias(name),
            };
        };
        if !list.is_member(&identity) {
            return PlayerOutcome::NotListed;
        }

        match self.registry.remove_entry(namespace, &identity) {
            Ok(entry) => PlayerOutcome::Removed(entry),
            Err(RadarError::NotListed { .. }) => PlayerOutcome::NotListed,
            Err(e) => {
                warn!(namespace, name, error = %e, "could not remove player");
                PlayerOutcome::Rejected(e)
            }
        }
    }

    /// Prefix for a known identity, empty when unlisted
    pub fn prefix_for(&self, identity: &Uuid) -> String {
        self.registry.prefix_for(identity)
    }

    /// Prefix for the sender of a rendered chat line
    pub async fn chat_prefix(&self, line: &str) -> Option<String> {
        let identity = self.resolver.resolve_chat_sender(line).await?;
        let prefix = self.registry.prefix_for(&identity);
        (!prefix.is_empty()).then_some(prefix)
    }

    /// Stop the refresh task, if any
    pub async fn shutdown(&self) {
        let handle = self
            .refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.stop().await;
        }
        info!("radar stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PublicListConfig;
    use crate::test_utils::{player_id, sample_roster, ScriptedFetcher};
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    const SCAMMER_URL: &str = "http://lists.test/scammer.json";

    async fn service(fetcher: &Arc<ScriptedFetcher>) -> (RadarService, TempDir) {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.storage.lists_dir = dir.path().join("lists");
        config.resolver.directory_url = "http://directory.test/".to_string();
        config.public_lists = vec![PublicListConfig::new("scammer", "&7[&cScammer&7]", SCAMMER_URL)];

        let shared: Arc<dyn HttpFetch> = fetcher.clone();
        let service = RadarService::start(config, shared).await.unwrap();
        service.resolver().set_roster(Some(Arc::new(sample_roster())));
        (service, dir)
    }

    fn scammer_fetcher() -> Arc<ScriptedFetcher> {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.respond(
            SCAMMER_URL,
            200,
            r#"[{"uuid": "02020202020202020202020202020202", "name": "Bob", "cause": "chargeback"}]"#,
        );
        fetcher
    }

    #[tokio::test]
    async fn test_start_registers_and_loads() {
        let fetcher = scammer_fetcher();
        let (service, _dir) = service(&fetcher).await;
        assert_eq!(service.registry().namespaces(), vec!["scammer".to_string()]);
        assert!(service.registry().is_in_any_list(&player_id(2)));
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let mut config = Config::default();
        config.public_lists = vec![PublicListConfig::new("bad name", "", SCAMMER_URL)];
        let fetcher: Arc<dyn HttpFetch> = Arc::new(ScriptedFetcher::new());
        assert!(RadarService::start(config, fetcher).await.is_err());
    }

    #[tokio::test]
    async fn test_check_player() {
        let fetcher = scammer_fetcher();
        let (service, _dir) = service(&fetcher).await;

        match service.check_player("bob").await {
            CheckOutcome::Listed { namespace, prefix, entry } => {
                assert_eq!(namespace, "scammer");
                assert_eq!(prefix, "&7[&cScammer&7]");
                assert_eq!(entry.cause(), "chargeback");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(service.check_player("Alice").await, CheckOutcome::NotListed);
        assert_eq!(service.check_player("~nicked").await, CheckOutcome::Unresolved);
    }

    #[tokio::test]
    async fn test_add_and_remove_player() {
        let fetcher = scammer_fetcher();
        let (service, _dir) = service(&fetcher).await;
        service.registry().register_private("vip", "[VIP]").unwrap();

        assert!(matches!(service.add_player("vip", "Alice", "trader").await, PlayerOutcome::Added(_)));
        assert!(matches!(service.add_player("vip", "alice", "again").await, PlayerOutcome::AlreadyListed));
        assert!(matches!(service.add_player("nope", "Alice", "").await, PlayerOutcome::UnknownList));
        assert!(matches!(
            service.add_player("vip", "!Unknown", "").await,
            PlayerOutcome::NameUnresolved { alias: true }
        ));
        assert!(matches!(
            service.add_player("scammer", "Alice", "").await,
            PlayerOutcome::Rejected(RadarError::NotPrivate(_))
        ));

        assert_eq!(service.prefix_for(&player_id(1)), "[VIP]");
        assert!(matches!(service.remove_player("vip", "Alice").await, PlayerOutcome::Removed(_)));
        assert!(matches!(service.remove_player("vip", "Alice").await, PlayerOutcome::NotListed));
        assert_eq!(service.prefix_for(&player_id(1)), "");
    }

    #[tokio::test]
    async fn test_check_roster_and_chat_prefix() {
        let fetcher = scammer_fetcher();
        let (service, _dir) = service(&fetcher).await;
        service.registry().register_private("watch", "[W]").unwrap();
        service.add_player("watch", "!Carol", "griefing").await;

        let listed: Vec<String> = service
            .check_roster()
            .into_iter()
            .map(|(namespace, entry)| format!("{}:{}", namespace, entry.display_name()))
            .collect();
        assert_eq!(listed, vec!["scammer:Bob".to_string(), "watch:!Carol".to_string()]);

        assert_eq!(
            service.chat_prefix("Spieler ┃ Bob » cheap items").await,
            Some("&7[&cScammer&7]".to_string())
        );
        assert_eq!(service.chat_prefix("Spieler ┃ Alice » hi").await, None);
        assert_eq!(
            service.chat_prefix("Spieler ┃ !Carol » hi").await,
            Some("[W]".to_string())
        );
        assert_eq!(service.chat_prefix("Spieler ┃ ~Carol » hi").await, None);
    }

    #[tokio::test]
    async fn test_hosts_and_shutdown() {
        let fetcher = scammer_fetcher();
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.storage.lists_dir = dir.path().to_path_buf();
        config.sync.refresh_interval = Some(Duration::from_secs(3600));

        let shared: Arc<dyn HttpFetch> = fetcher.clone();
        let service = RadarService::start(config, shared).await.unwrap();
        assert!(service.is_active_on("play.griefergames.net"));
        assert!(!service.is_active_on("localhost"));
        service.shutdown().await;
        service.shutdown().await;
    }
}
