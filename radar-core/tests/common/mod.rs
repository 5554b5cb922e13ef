//! Local HTTP server standing in for the list host and the name directory

#![allow(dead_code)]

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// Mutable server state shared with the test
#[derive(Default)]
pub struct Remote {
    /// (status, body) served for `/lists/<file>`
    lists: Mutex<HashMap<String, (u16, String)>>,
    /// name (lowercase) -> compact id
    profiles: Mutex<HashMap<String, String>>,
    directory_hits: AtomicUsize,
    last_user_agent: Mutex<Option<String>>,
}

impl Remote {
    pub fn serve_list(&self, file: &str, status: u16, body: &str) {
        self.lists
            .lock()
            .unwrap()
            .insert(file.to_string(), (status, body.to_string()));
    }

    pub fn add_profile(&self, name: &str, compact_id: &str) {
        self.profiles
            .lock()
            .unwrap()
            .insert(name.to_lowercase(), compact_id.to_string());
    }

    pub fn directory_hits(&self) -> usize {
        self.directory_hits.load(Ordering::SeqCst)
    }

    pub fn last_user_agent(&self) -> Option<String> {
        self.last_user_agent.lock().unwrap().clone()
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub remote: Arc<Remote>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn list_url(&self, file: &str) -> String {
        self.url(&format!("/lists/{}", file))
    }

    pub fn directory_url(&self) -> String {
        self.url("/profiles/")
    }
}

async fn list(
    State(remote): State<Arc<Remote>>,
    Path(file): Path<String>,
    headers: HeaderMap,
) -> (StatusCode, String) {
    let agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *remote.last_user_agent.lock().unwrap() = agent;

    match remote.lists.lock().unwrap().get(&file) {
        Some((status, body)) => (
            StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body.clone(),
        ),
        None => (StatusCode::NOT_FOUND, String::new()),
    }
}

async fn profile(
    State(remote): State<Arc<Remote>>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    remote.directory_hits.fetch_add(1, Ordering::SeqCst);
    let id = remote.profiles.lock().unwrap().get(&name.to_lowercase()).cloned();
    match id {
        Some(id) => Ok(Json(json!({ "id": id, "name": name }))),
        None => Err(StatusCode::NOT_FOUND),
    }
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "[]"
}

/// Start the server on an ephemeral port
pub async fn start() -> TestServer {
    let remote = Arc::new(Remote::default());
    let app = Router::new()
        .route("/lists/:file", get(list))
        .route("/profiles/:name", get(profile))
        .route("/slow", get(slow))
        .with_state(Arc::clone(&remote));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer { addr, remote }
}
