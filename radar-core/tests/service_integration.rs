//! End-to-end radar scenarios: startup, private lists across restarts,
//! lookups across lists

mod common;

use radar_core::config::PublicListConfig;
use radar_core::http::HttpFetch;
use radar_core::identity::{RosterPlayer, StaticRoster};
use radar_core::{CheckOutcome, Config, PlayerOutcome, RadarService, ReqwestFetcher};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

const BOB_COMPACT: &str = "22222222222222222222222222222222";

fn bob() -> Uuid {
    Uuid::parse_str("22222222-2222-2222-2222-222222222222").unwrap()
}

fn alice() -> Uuid {
    Uuid::from_bytes([0xa1; 16])
}

fn config(server: &common::TestServer, lists_dir: &Path) -> Config {
    let mut config = Config::default();
    config.storage.lists_dir = lists_dir.to_path_buf();
    config.resolver.directory_url = server.directory_url();
    config.public_lists = vec![
        PublicListConfig::new("scammer", "&7[&cScammer&7]", server.list_url("scammer.json")),
        PublicListConfig::new("trusted", "&7[&aTrusted&7]", server.list_url("trusted.json")),
    ];
    config
}

async fn start(server: &common::TestServer, lists_dir: &Path) -> RadarService {
    let fetcher: Arc<dyn HttpFetch> = Arc::new(ReqwestFetcher::new().unwrap());
    let service = RadarService::start(config(server, lists_dir), fetcher)
        .await
        .unwrap();
    let roster = StaticRoster::new(vec![RosterPlayer::new("Alice", alice())]);
    service.resolver().set_roster(Some(Arc::new(roster)));
    service
}

#[tokio::test]
async fn test_unreachable_list_does_not_block_startup() {
    let server = common::start().await;
    server.remote.serve_list("scammer.json", 200, "[]");
    // trusted.json is not served
    let dir = tempfile::tempdir().unwrap();

    let service = start(&server, dir.path()).await;
    assert_eq!(
        service.registry().namespaces(),
        vec!["scammer".to_string(), "trusted".to_string()]
    );
    assert!(service.registry().get_list("trusted").unwrap().is_empty());
}

#[tokio::test]
async fn test_private_list_lifecycle_across_restarts() {
    let server = common::start().await;
    server.remote.serve_list("scammer.json", 200, "[]");
    server.remote.serve_list("trusted.json", 200, "[]");
    server.remote.add_profile("Bob", BOB_COMPACT);
    let dir = tempfile::tempdir().unwrap();

    {
        let service = start(&server, dir.path()).await;
        service.registry().register_private("vip", "[VIP]").unwrap();
        assert!(matches!(
            service.add_player("vip", "Alice", "trusted trader").await,
            PlayerOutcome::Added(_)
        ));
        assert!(matches!(
            service.add_player("vip", "Bob", "middleman").await,
            PlayerOutcome::Added(_)
        ));
        service.registry().set_prefix("vip", "[V]").unwrap();
        service.shutdown().await;
    }

    let service = start(&server, dir.path()).await;
    assert_eq!(
        service.registry().namespaces(),
        vec!["scammer".to_string(), "trusted".to_string(), "vip".to_string()]
    );
    match service.check_player("alice").await {
        CheckOutcome::Listed { namespace, prefix, entry } => {
            assert_eq!(namespace, "vip");
            assert_eq!(prefix, "[V]");
            assert_eq!(entry.cause(), "trusted trader");
            assert_eq!(entry.created_at(), entry.updated_at());
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(service.registry().is_in_any_list(&bob()));

    assert!(matches!(
        service.remove_player("vip", "Bob").await,
        PlayerOutcome::Removed(_)
    ));
    service.registry().unregister("vip").unwrap();
    assert!(!dir.path().join("vip.json").exists());
    service.shutdown().await;

    let service = start(&server, dir.path()).await;
    assert!(service.registry().get_list("vip").is_none());
    assert_eq!(service.check_player("Alice").await, CheckOutcome::NotListed);
}

#[tokio::test]
async fn test_public_list_shadows_private_match() {
    let server = common::start().await;
    let scammers = format!(r#"[{{"uuid": "{}", "name": "Bob", "cause": "chargeback"}}]"#, BOB_COMPACT);
    server.remote.serve_list("scammer.json", 200, &scammers);
    server.remote.serve_list("trusted.json", 200, "[]");
    server.remote.add_profile("Bob", BOB_COMPACT);
    let dir = tempfile::tempdir().unwrap();

    let service = start(&server, dir.path()).await;
    service.registry().register_private("friends", "[F]").unwrap();
    assert!(matches!(
        service.add_player("friends", "Bob", "old friend").await,
        PlayerOutcome::Added(_)
    ));

    assert_eq!(service.prefix_for(&bob()), "&7[&cScammer&7]");
    let all = service.registry().find_all_entries(&bob());
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].0, "scammer");
    assert_eq!(all[1].0, "friends");

    assert_eq!(
        service.chat_prefix("Spieler ┃ Bob » selling cheap").await,
        Some("&7[&cScammer&7]".to_string())
    );
    assert!(matches!(
        service.add_player("scammer", "Alice", "").await,
        PlayerOutcome::Rejected(_)
    ));
}
