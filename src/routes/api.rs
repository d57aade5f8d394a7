//! JSON CRUD for categories, mounted under `/api/v1`.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::{error, instrument};

use crate::{
    errors::{AppError, FieldErrors},
    models::category::CategoryModel,
    startup::AppState,
};

/// Fields maintained by the server; clients may not send them.
const READ_ONLY_FIELDS: [&str; 3] = ["slug", "views", "likes"];

/// Pulls the category name out of a create/update body.
fn name_from_body(payload: Result<Json<Value>, JsonRejection>) -> Result<String, AppError> {
    let Json(body) = payload.map_err(|rejection| {
        AppError::Validation(FieldErrors::single(
            "non_field_errors",
            rejection.body_text(),
        ))
    })?;

    let Value::Object(fields) = body else {
        return Err(AppError::Validation(FieldErrors::single(
            "non_field_errors",
            "Invalid data. Expected a dictionary.",
        )));
    };

    let mut errors = FieldErrors::default();
    for field in READ_ONLY_FIELDS {
        if fields.contains_key(field) {
            errors.add(field, "This field is read-only and cannot be set.");
        }
    }

    let name = match fields.get("name") {
        Some(Value::String(name)) => name.clone(),
        Some(_) => {
            errors.add("name", "Not a valid string.");
            String::new()
        }
        None => {
            errors.add("name", "This field is required.");
            String::new()
        }
    };

    Ok(errors.into_result(name)?)
}

#[instrument(name = "API: List categories", skip(state))]
pub async fn list_categories(State(state): State<AppState>) -> Response {
    match state.category_service.list().await {
        Ok(categories) => (StatusCode::OK, Json(categories)).into_response(),
        Err(e) => {
            error!("Failed to list categories: {:?}", e);
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "No Category Objects" })),
            )
                .into_response()
        }
    }
}

#[instrument(name = "API: Create category", skip(state, payload))]
pub async fn create_category(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<CategoryModel>, AppError> {
    let name = name_from_body(payload)?;
    let category = state.category_service.create(&name).await?;
    Ok(Json(category))
}

#[instrument(name = "API: Category detail", skip(state))]
pub async fn category_detail(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<CategoryModel>, AppError> {
    Ok(Json(state.category_service.get(id).await?))
}

#[instrument(name = "API: Update category", skip(state, payload))]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<CategoryModel>, AppError> {
    // a missing category wins over an invalid body
    state.category_service.get(id).await?;
    let name = name_from_body(payload)?;
    Ok(Json(state.category_service.rename(id, &name).await?))
}

#[instrument(name = "API: Delete category", skip(state))]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    state.category_service.delete(id).await?;
    Ok(StatusCode::OK)
}
