use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use slotbook_api::{ApiState, build_router, middleware::auth::hash_password};
use slotbook_core::{models::policy::WorkingHoursPolicy, store::SharedStore};
use slotbook_db::memory::MemoryStore;
use slotbook_sync::{HubConfig, SyncHub, notify::LogNotifier};
use tower::ServiceExt;

pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

pub struct TestContext {
    pub store: MemoryStore,
    pub hub: SyncHub,
    pub app: Router,
}

impl TestContext {
    /// Server over a fresh memory store with a 09:00 to 10:00 working day.
    pub fn new() -> Self {
        Self::build(Some(hash_password(ADMIN_PASSWORD).unwrap()))
    }

    pub fn without_admin() -> Self {
        Self::build(None)
    }

    fn build(admin_password_hash: Option<String>) -> Self {
        let store = MemoryStore::new();
        let shared: SharedStore = Arc::new(store.clone());
        let config = HubConfig {
            policy: WorkingHoursPolicy::new(9, 10, 30).unwrap(),
            ..HubConfig::default()
        };
        let hub = SyncHub::new(shared, config, Arc::new(LogNotifier));
        let app = build_router(Arc::new(ApiState {
            hub: hub.clone(),
            admin_password_hash,
        }));
        Self { store, hub, app }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

pub fn future_date(days: i64) -> NaiveDate {
    Utc::now().date_naive() + chrono::Duration::days(days)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn admin(method: Method, uri: &str, password: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(password) = password {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", password));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
