use askama::Template;
use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use axum_extra::extract::CookieJar;
use tracing::instrument;

use crate::{
    errors::AppError,
    models::{category::CategoryModel, page::PageModel},
    routes::session::current_session,
    startup::AppState,
};

const TOP_LIMIT: usize = 5;

#[derive(Template)]
#[template(path = "rango/index.html")]
struct IndexTemplate {
    categories: Vec<CategoryModel>,
    pages: Vec<PageModel>,
    visits: u32,
}

#[derive(Template)]
#[template(path = "rango/about.html")]
struct AboutTemplate;

#[instrument(name = "Web: Index", skip(state, jar))]
pub async fn index(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let (jar, session_id) = current_session(jar, &state.visit_service).await;
    let visits = state
        .visit_service
        .record_visit(&session_id, chrono::Utc::now().naive_utc())
        .await;

    let categories = state.category_service.top_by_likes(TOP_LIMIT).await?;
    let pages = state.page_service.top_by_views(TOP_LIMIT).await?;

    let page = IndexTemplate {
        categories,
        pages,
        visits,
    };
    Ok((jar, Html(page.render()?)))
}

pub async fn about() -> Result<impl IntoResponse, AppError> {
    Ok(Html(AboutTemplate.render()?))
}
