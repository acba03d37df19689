//! Scripted HTTP backend for driving the real gateway end to end.
#![allow(dead_code)]

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header::AUTHORIZATION};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use wallet_client::config::FlowConfig;
use wallet_client::{
    ApiGateway, AuthService, MoneyMovementOrchestrator, NavigationLog, ProfileSync,
    SessionContext, SessionLifecycle, SessionStore, WalletApi,
};

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Default)]
struct Script {
    replies: HashMap<String, (u16, Value)>,
    delays: HashMap<String, Duration>,
    calls: Vec<Recorded>,
}

type Shared = Arc<Mutex<Script>>;

/// Wallet backend on 127.0.0.1 answering each path with a scripted reply.
#[derive(Clone)]
pub struct FakeBackend {
    script: Shared,
    pub base_url: String,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let script: Shared = Arc::new(Mutex::new(Script::default()));
        let app = Router::new().fallback(handle).with_state(script.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            script,
            base_url: format!("http://{}/api/", addr),
        }
    }

    /// Reply to `path` (relative to `/api/`) with `status` and `body`
    pub fn reply(&self, path: &str, status: u16, body: Value) {
        self.script
            .lock()
            .replies
            .insert(path.to_string(), (status, body));
    }

    pub fn delay(&self, path: &str, delay: Duration) {
        self.script.lock().delays.insert(path.to_string(), delay);
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.script.lock().calls.clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.path).collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.script
            .lock()
            .calls
            .iter()
            .filter(|c| c.path == path)
            .count()
    }

    pub fn last(&self, path: &str) -> Option<Recorded> {
        self.script
            .lock()
            .calls
            .iter()
            .rev()
            .find(|c| c.path == path)
            .cloned()
    }
}

async fn handle(
    State(script): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let path = uri.path().trim_start_matches("/api/").to_string();
    let (reply, delay) = {
        let mut s = script.lock();
        s.calls.push(Recorded {
            method: method.to_string(),
            path: path.clone(),
            authorization: headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(String::from),
            body: serde_json::from_slice(&body).unwrap_or(Value::Null),
        });
        (s.replies.get(&path).cloned(), s.delays.get(&path).copied())
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    match reply {
        Some((status, body)) => (StatusCode::from_u16(status).unwrap(), Json(body)),
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))),
    }
}

/// Everything a host wires together, pointed at a fake backend.
pub struct Wallet {
    pub session: SessionContext,
    pub nav: Arc<NavigationLog>,
    pub lifecycle: SessionLifecycle,
    pub auth: AuthService,
    pub orchestrator: MoneyMovementOrchestrator,
}

impl Wallet {
    pub fn connect(backend: &FakeBackend, flows: FlowConfig) -> Self {
        let session = SessionStore::page_scoped();
        let nav = Arc::new(NavigationLog::new());
        let lifecycle = SessionLifecycle::new(session.clone(), nav.clone());
        let api: Arc<dyn WalletApi> = Arc::new(
            ApiGateway::with_timeout(&backend.base_url, Duration::from_secs(5), session.clone())
                .unwrap(),
        );
        let sync = ProfileSync::new(api.clone(), lifecycle.clone());
        Self {
            auth: AuthService::new(api.clone(), lifecycle.clone()),
            orchestrator: MoneyMovementOrchestrator::new(api, sync, lifecycle.clone(), flows),
            session,
            nav,
            lifecycle,
        }
    }

    pub fn sync(&self) -> &ProfileSync {
        self.orchestrator.sync()
    }
}

pub fn profile(balance: &str) -> Value {
    json!({
        "user_id": 7,
        "username": "alice",
        "first_name": "Alice",
        "wallet_currency": "KES",
        "wallet_balance": balance,
        "transactions": [
            {
                "type": "DEPOSIT",
                "amount": "10000.00",
                "currency": "KES",
                "description": "Initial deposit",
                "timestamp": "2025-01-01T09:00:00Z"
            }
        ]
    })
}

/// Decimal fields may arrive as JSON strings or numbers.
pub fn decimal_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
