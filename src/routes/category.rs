use askama::Template;
use axum::{
    Form,
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect},
};
use serde::Deserialize;
use tracing::instrument;

use crate::{
    errors::{AppError, FieldErrors},
    models::{category::CategoryModel, page::PageModel},
    services::search::SearchResult,
    startup::AppState,
};

#[derive(Template)]
#[template(path = "rango/category.html")]
struct CategoryTemplate {
    category: CategoryModel,
    pages: Vec<PageModel>,
    query: String,
    results: Vec<SearchResult>,
    search_unavailable: bool,
}

#[derive(Template)]
#[template(path = "rango/add_category.html")]
struct AddCategoryTemplate {
    name: String,
    errors: FieldErrors,
}

#[derive(Template)]
#[template(path = "rango/add_page.html")]
struct AddPageTemplate {
    category: CategoryModel,
    title: String,
    url: String,
    errors: FieldErrors,
}

#[derive(Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub query: String,
}

#[derive(Deserialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
pub struct PageForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

#[instrument(name = "Web: Show category", skip(state))]
pub async fn show_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (category, pages) = state.category_service.with_pages(&slug).await?;
    let page = CategoryTemplate {
        query: category.name.clone(),
        category,
        pages,
        results: Vec::new(),
        search_unavailable: false,
    };
    Ok(Html(page.render()?))
}

/// Shows the category together with web search results for `query`.
#[instrument(name = "Web: Search from category", skip(state, form))]
pub async fn search_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Form(form): Form<SearchForm>,
) -> Result<impl IntoResponse, AppError> {
    let (category, pages) = state.category_service.with_pages(&slug).await?;

    let query = form.query.trim().to_string();
    let mut search_unavailable = false;
    let results = if query.is_empty() {
        Vec::new()
    } else {
        state
            .search_service
            .run_query(&query)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("Web search is not configured: {}", e);
                search_unavailable = true;
                Vec::new()
            })
    };

    let page = CategoryTemplate {
        query: if query.is_empty() {
            category.name.clone()
        } else {
            query
        },
        category,
        pages,
        results,
        search_unavailable,
    };
    Ok(Html(page.render()?))
}

pub async fn add_category_page() -> Result<impl IntoResponse, AppError> {
    let page = AddCategoryTemplate {
        name: String::new(),
        errors: FieldErrors::default(),
    };
    Ok(Html(page.render()?))
}

#[instrument(name = "Web: Add category", skip(state, form), fields(name = %form.name))]
pub async fn add_category(
    State(state): State<AppState>,
    Form(form): Form<CategoryForm>,
) -> Result<impl IntoResponse, AppError> {
    match state.category_service.create(&form.name).await {
        Ok(category) => {
            tracing::info!(slug = %category.slug, "Category created");
            Ok(Redirect::to("/rango/").into_response())
        }
        Err(AppError::Validation(errors)) => {
            tracing::warn!("Category rejected: {:?}", errors);
            let page = AddCategoryTemplate {
                name: form.name,
                errors,
            };
            Ok(Html(page.render()?).into_response())
        }
        Err(e) => Err(e),
    }
}

#[instrument(name = "Web: Add page form", skip(state))]
pub async fn add_page_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let category = state.category_service.get_by_slug(&slug).await?;
    let page = AddPageTemplate {
        category,
        title: String::new(),
        url: String::new(),
        errors: FieldErrors::default(),
    };
    Ok(Html(page.render()?))
}

#[instrument(name = "Web: Add page", skip(state, form))]
pub async fn add_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Form(form): Form<PageForm>,
) -> Result<impl IntoResponse, AppError> {
    let category = state.category_service.get_by_slug(&slug).await?;

    match state
        .page_service
        .add(category.id, &form.title, &form.url, None)
        .await
    {
        Ok(_) => Ok(Redirect::to(&format!("/rango/category/{}/", category.slug)).into_response()),
        Err(AppError::Validation(errors)) => {
            let page = AddPageTemplate {
                category,
                title: form.title,
                url: form.url,
                errors,
            };
            Ok(Html(page.render()?).into_response())
        }
        Err(e) => Err(e),
    }
}
