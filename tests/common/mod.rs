//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use api_gatekeeper::config::GatekeeperConfig;
use api_gatekeeper::http::GatekeeperServer;
use api_gatekeeper::mailer::{MailError, Mailer};
use api_gatekeeper::security::TokenScope;
use api_gatekeeper::store::MemoryStore;
use async_trait::async_trait;
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

/// Records every mail instead of sending it, optionally after a delay.
#[derive(Default)]
pub struct RecordingMailer {
    delay: Duration,
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, recipient: &str, template: &str, _data: Value) -> Result<(), MailError> {
        tokio::time::sleep(self.delay).await;
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), template.to_string()));
        Ok(())
    }
}

/// Tokens for the seeded users.
pub struct Tokens {
    /// Activated, holds `permissions:read`.
    pub admin: String,
    /// Activated, no permissions.
    pub member: String,
    /// Not activated, holds `permissions:read`.
    pub pending: String,
}

pub struct Harness {
    pub server: GatekeeperServer,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub tokens: Tokens,
}

impl Harness {
    pub fn new(config: GatekeeperConfig) -> Self {
        Self::with_mailer(config, RecordingMailer::default())
    }

    pub fn with_mailer(config: GatekeeperConfig, mailer: RecordingMailer) -> Self {
        let store = Arc::new(MemoryStore::new());
        let tokens = Tokens {
            admin: seed(&store, "Ada", "ada@example.com", true, &["permissions:read"]),
            member: seed(&store, "Grace", "grace@example.com", true, &[]),
            pending: seed(&store, "Linus", "linus@example.com", false, &["permissions:read"]),
        };
        let mailer = Arc::new(mailer);
        let server = GatekeeperServer::new(config, store.clone(), store.clone(), mailer.clone());

        Self {
            server,
            store,
            mailer,
            tokens,
        }
    }
}

fn seed(store: &MemoryStore, name: &str, email: &str, activated: bool, permissions: &[&str]) -> String {
    let user = store.insert_user(name, email, activated);
    store.grant(user.id, permissions.iter().copied());
    store.issue_token(user.id, TokenScope::Authentication, Duration::from_secs(3600))
}

/// Send one request through `router` as if it came from `peer`.
pub async fn send(
    router: &Router,
    peer: &str,
    method: Method,
    uri: &str,
    authorization: Option<&str>,
) -> Response {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        request = request.header("authorization", value);
    }
    let peer: SocketAddr = format!("{peer}:40000").parse().unwrap();

    router
        .clone()
        .layer(MockConnectInfo(peer))
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn get(router: &Router, peer: &str, uri: &str, authorization: Option<&str>) -> Response {
    send(router, peer, Method::GET, uri, authorization).await
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
