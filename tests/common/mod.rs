#![allow(dead_code)]

use std::path::PathBuf;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header},
};
use rango::{
    configuration::SearchSettings,
    routes::auth::issue_token,
    services::search::SearchService,
    startup::{AppState, router},
    store::{Database, SessionRepository, UserRepository},
};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &[u8] = b"integration-test-secret";

/// A router over in-memory stores, with handles on those stores so tests can
/// seed and inspect them directly.
pub struct TestApp {
    pub state: AppState,
    pub db: Database,
    pub sessions: SessionRepository,
    // Keeps the credential files alive for the lifetime of the app.
    _credentials: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_search_endpoint("http://127.0.0.1:1/customsearch/v1")
    }

    pub fn with_search_endpoint(endpoint: &str) -> Self {
        let credentials = tempfile::tempdir().expect("temp dir");
        let settings = search_settings(&credentials, endpoint, "test-key", "test-engine");

        let db = Database::in_memory();
        let sessions = SessionRepository::in_memory();
        let search = SearchService::new(&settings).expect("search service");
        let state = AppState::new(db.clone(), sessions.clone(), search, JWT_SECRET);

        Self {
            state,
            db,
            sessions,
            _credentials: credentials,
        }
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router().oneshot(request).await.expect("infallible router")
    }

    /// Creates a user and returns an `Authorization` header value for them.
    pub async fn login_as(&self, username: &str) -> (Uuid, String) {
        let users = UserRepository::new(self.db.clone());
        let id = users
            .create_user(username, &format!("{username}@example.com"), "not-a-real-hash")
            .await
            .expect("user created");
        let token = issue_token(&self.state.keys, id, username).expect("token issued");
        (id, format!("Bearer {token}"))
    }
}

/// Writes the two credential files into `dir` and points the settings at them.
pub fn search_settings(dir: &TempDir, endpoint: &str, key: &str, engine: &str) -> SearchSettings {
    let api_key_path = dir.path().join("API_KEY.key");
    let search_engine_id_path = dir.path().join("SEARCH_ENGINE_ID.key");
    std::fs::write(&api_key_path, format!("{key}\n")).expect("write key");
    std::fs::write(&search_engine_id_path, format!("{engine}\n")).expect("write engine id");

    SearchSettings {
        endpoint: endpoint.to_string(),
        api_key_path,
        search_engine_id_path,
        timeout_seconds: 2,
    }
}

pub fn missing_credentials(endpoint: &str) -> SearchSettings {
    SearchSettings {
        endpoint: endpoint.to_string(),
        api_key_path: PathBuf::from("/nonexistent/API_KEY.key"),
        search_engine_id_path: PathBuf::from("/nonexistent/SEARCH_ENGINE_ID.key"),
        timeout_seconds: 2,
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

pub fn get_with_auth(uri: &str, auth: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, auth)
        .body(Body::empty())
        .expect("request")
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}
