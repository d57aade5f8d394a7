mod common;

use std::collections::HashMap;

use axum::{Json, Router, extract::Query, http::StatusCode, routing::get};
use rango::{
    errors::SearchError,
    models::category::CategoryDraft,
    services::search::{SearchResult, SearchService},
    store::CategoryRepository,
};
use serde_json::{Value, json};

use common::{TestApp, body_text, form_request, missing_credentials, search_settings};

/// Serves a canned custom-search response and echoes the query back in the
/// first title so tests can check the request parameters.
async fn spawn_search_stub() -> String {
    async fn search(Query(params): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
        if params.get("key").map(String::as_str) != Some("test-key")
            || params.get("cx").map(String::as_str) != Some("test-engine")
        {
            return (StatusCode::FORBIDDEN, Json(json!({ "error": "bad key" })));
        }
        let q = params.get("q").cloned().unwrap_or_default();
        let num = params.get("num").cloned().unwrap_or_default();
        (
            StatusCode::OK,
            Json(json!({
                "items": [
                    { "title": format!("{q} ({num})"), "link": "https://www.djangoproject.com/", "snippet": "The web framework" },
                    { "title": "No link here", "snippet": "skipped" },
                    { "title": "Django Tutorial", "link": "https://docs.djangoproject.com/", "snippet": "Writing your first app" }
                ]
            })),
        )
    }

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/customsearch/v1", get(search));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/customsearch/v1")
}

#[tokio::test]
async fn results_are_mapped_and_malformed_items_skipped() {
    let endpoint = spawn_search_stub().await;
    let dir = tempfile::tempdir().unwrap();
    let service = SearchService::new(&search_settings(&dir, &endpoint, "test-key", "test-engine")).unwrap();

    let results = service.run_query("django").await.unwrap();
    assert_eq!(
        results,
        vec![
            SearchResult {
                title: "django (10)".into(),
                link: "https://www.djangoproject.com/".into(),
                snippet: "The web framework".into(),
            },
            SearchResult {
                title: "Django Tutorial".into(),
                link: "https://docs.djangoproject.com/".into(),
                snippet: "Writing your first app".into(),
            },
        ]
    );
}

#[tokio::test]
async fn rejected_requests_yield_no_results() {
    let endpoint = spawn_search_stub().await;
    let dir = tempfile::tempdir().unwrap();
    let service = SearchService::new(&search_settings(&dir, &endpoint, "wrong", "test-engine")).unwrap();

    assert!(matches!(
        service.try_query("django").await,
        Err(SearchError::Status(status)) if status == StatusCode::FORBIDDEN
    ));
    assert_eq!(service.run_query("django").await.unwrap(), Vec::new());
}

#[tokio::test]
async fn unreachable_service_yields_no_results() {
    let dir = tempfile::tempdir().unwrap();
    let service = SearchService::new(&search_settings(
        &dir,
        "http://127.0.0.1:1/customsearch/v1",
        "test-key",
        "test-engine",
    ))
    .unwrap();

    assert!(matches!(
        service.try_query("rust").await,
        Err(SearchError::Transport(_))
    ));
    assert!(service.run_query("rust").await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_credential_files_are_a_configuration_error() {
    let service = SearchService::new(&missing_credentials("http://127.0.0.1:1/")).unwrap();

    assert!(matches!(
        service.run_query("rust").await,
        Err(SearchError::Config { .. })
    ));
    assert!(service.check_credentials().await.is_err());
}

#[tokio::test]
async fn empty_credentials_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let service = SearchService::new(&search_settings(&dir, "http://127.0.0.1:1/", "", "")).unwrap();

    assert!(matches!(
        service.run_query("rust").await,
        Err(SearchError::Credentials)
    ));
}

#[tokio::test]
async fn category_search_shows_results_with_add_buttons() {
    let endpoint = spawn_search_stub().await;
    let app = TestApp::with_search_endpoint(&endpoint);
    CategoryRepository::new(app.db.clone())
        .insert(&CategoryDraft::new("Django", 0, 0))
        .await
        .unwrap();

    let response = app
        .send(form_request("/rango/category/django/", "query=forms"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("forms (10)"));
    assert!(html.contains("class=\"rango-add\""));
    assert!(!html.contains("Web search is not available"));
}

#[tokio::test]
async fn category_search_survives_an_unreachable_service() {
    let app = TestApp::new();
    CategoryRepository::new(app.db.clone())
        .insert(&CategoryDraft::new("Django", 0, 0))
        .await
        .unwrap();

    let response = app
        .send(form_request("/rango/category/django/", "query=forms"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!body_text(response).await.contains("Results"));
}
