use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::startup::AppState;

#[derive(Debug, Deserialize)]
pub struct GotoParams {
    pub page_id: Option<String>,
}

/// Counts the click-through and redirects to the page. Unknown pages land on
/// the index instead.
#[instrument(name = "HTTP: Goto request", skip(state))]
pub async fn goto(
    State(state): State<AppState>,
    Query(params): Query<GotoParams>,
) -> impl IntoResponse {
    let target = state
        .page_service
        .track_view(params.page_id.as_deref())
        .await;
    info!(page_id = ?params.page_id, "Redirecting to {}", target);
    Redirect::to(&target)
}
