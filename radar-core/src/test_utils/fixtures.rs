//! Test fixtures

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::http::{FetchError, HttpFetch, HttpResponse};
use crate::identity::{RosterPlayer, StaticRoster};

#[derive(Debug, Clone)]
enum Script {
    Respond(HttpResponse),
    Fail,
}

/// In-memory [`HttpFetch`] answering from a per-url script
///
/// Unscripted urls fail with a transport error. Every `get` is counted,
/// scripted or not.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, Script>>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `status` and `body` from now on
    pub fn respond(&self, url: &str, status: u16, body: &str) {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), Script::Respond(HttpResponse::new(status, body)));
    }

    /// Fail requests to `url` from now on
    pub fn fail(&self, url: &str) {
        self.scripts.lock().unwrap().insert(url.to_string(), Script::Fail);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpFetch for ScriptedFetcher {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<HttpResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.lock().unwrap().get(url).cloned();
        match script {
            Some(Script::Respond(response)) => Ok(response),
            Some(Script::Fail) | None => Err(FetchError::Transport {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}

/// [`HttpFetch`] answering calls in order, each after its own delay
///
/// The response is taken when the call starts, so a slow first call still
/// returns the first response. Calls beyond the queue fail.
#[derive(Debug)]
pub struct SequencedFetcher {
    queue: Mutex<VecDeque<(Duration, HttpResponse)>>,
}

impl SequencedFetcher {
    pub fn new(responses: Vec<(Duration, HttpResponse)>) -> Self {
        Self {
            queue: Mutex::new(responses.into()),
        }
    }
}

#[async_trait]
impl HttpFetch for SequencedFetcher {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<HttpResponse, FetchError> {
        let next = self.queue.lock().unwrap().pop_front();
        let Some((delay, response)) = next else {
            return Err(FetchError::Transport {
                url: url.to_string(),
                reason: "no response queued".to_string(),
            });
        };
        tokio::time::sleep(delay).await;
        Ok(response)
    }
}

/// Deterministic identity for player number `n`
pub fn player_id(n: u8) -> Uuid {
    Uuid::from_bytes([n; 16])
}

/// Roster with Alice (1), Bob (2) and the bedrock player !Carol (3)
pub fn sample_roster() -> StaticRoster {
    StaticRoster::new(vec![
        RosterPlayer::new("Alice", player_id(1)),
        RosterPlayer::new("Bob", player_id(2)),
        RosterPlayer::new("!Carol", player_id(3)),
    ])
}
