//! Small endpoints called from `static/js/rango-ajax.js`.

use askama::Template;
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse},
};
use serde::Deserialize;
use tracing::instrument;

use crate::{
    errors::{AppError, FieldErrors},
    models::{category::CategoryModel, page::PageModel},
    routes::auth::Claims,
    startup::AppState,
};

#[derive(Template)]
#[template(path = "rango/cats.html")]
struct CategoryListTemplate {
    categories: Vec<CategoryModel>,
}

#[derive(Template)]
#[template(path = "rango/page_list.html")]
struct PageListTemplate {
    pages: Vec<PageModel>,
}

#[derive(Debug, Deserialize)]
pub struct LikeParams {
    pub category_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestParams {
    pub suggestion: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AutoAddParams {
    pub category_id: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
}

fn parse_category_id(raw: &str) -> Result<i32, AppError> {
    raw.trim().parse().map_err(|_| {
        AppError::Validation(FieldErrors::single("category_id", "A valid integer is required."))
    })
}

/// Answers with the category's new like count as plain text, or `0` when no
/// category was given.
#[instrument(name = "Web: Like category", skip(state, claims), fields(user = %claims))]
pub async fn like_category(
    State(state): State<AppState>,
    claims: Claims,
    Query(params): Query<LikeParams>,
) -> Result<impl IntoResponse, AppError> {
    let Some(raw_id) = params.category_id.filter(|id| !id.trim().is_empty()) else {
        return Ok(0.to_string());
    };
    let category_id = parse_category_id(&raw_id)?;

    let likes = state
        .category_service
        .like(claims.user_id()?, category_id)
        .await?;
    Ok(likes.to_string())
}

#[instrument(name = "Web: Suggest categories", skip(state))]
pub async fn suggest_category(
    State(state): State<AppState>,
    Query(params): Query<SuggestParams>,
) -> Result<impl IntoResponse, AppError> {
    let categories = state
        .category_service
        .suggest(params.suggestion.as_deref())
        .await;
    Ok(Html(CategoryListTemplate { categories }.render()?))
}

#[instrument(name = "Web: Auto add page", skip(state, claims), fields(user = %claims))]
pub async fn auto_add_page(
    State(state): State<AppState>,
    claims: Claims,
    Query(params): Query<AutoAddParams>,
) -> Result<impl IntoResponse, AppError> {
    let pages = match params.category_id.filter(|id| !id.trim().is_empty()) {
        Some(raw_id) => {
            let category_id = parse_category_id(&raw_id)?;
            state
                .page_service
                .auto_add(category_id, &params.title, &params.url, claims.user_id()?)
                .await?
        }
        None => Vec::new(),
    };
    Ok(Html(PageListTemplate { pages }.render()?))
}
