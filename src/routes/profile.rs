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
    models::profile::ProfileSummary,
    routes::auth::Claims,
    services::profile::ProfileView,
    startup::AppState,
};

#[derive(Template)]
#[template(path = "rango/profile_registration.html")]
struct ProfileRegistrationTemplate {
    website: String,
    picture: String,
    errors: FieldErrors,
}

#[derive(Template)]
#[template(path = "rango/profile.html")]
struct ProfileTemplate {
    view: ProfileView,
    is_owner: bool,
    website: String,
    picture: String,
    errors: FieldErrors,
}

#[derive(Template)]
#[template(path = "rango/list_profiles.html")]
struct ProfileListTemplate {
    profiles: Vec<ProfileSummary>,
}

#[derive(Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub picture: String,
}

pub async fn register_profile_page(_claims: Claims) -> Result<impl IntoResponse, AppError> {
    let page = ProfileRegistrationTemplate {
        website: String::new(),
        picture: String::new(),
        errors: FieldErrors::default(),
    };
    Ok(Html(page.render()?))
}

#[instrument(name = "Web: Register profile", skip(state, claims, form), fields(user = %claims))]
pub async fn register_profile(
    State(state): State<AppState>,
    claims: Claims,
    Form(form): Form<ProfileForm>,
) -> Result<impl IntoResponse, AppError> {
    match state
        .profile_service
        .save(claims.user_id()?, &form.website, &form.picture)
        .await
    {
        Ok(_) => Ok(Redirect::to("/rango/").into_response()),
        Err(AppError::Validation(errors)) => {
            let page = ProfileRegistrationTemplate {
                website: form.website,
                picture: form.picture,
                errors,
            };
            Ok(Html(page.render()?).into_response())
        }
        Err(e) => Err(e),
    }
}

fn profile_page(view: ProfileView, claims: &Claims, errors: FieldErrors) -> ProfileTemplate {
    let is_owner = view.user.id.to_string() == claims.sub;
    ProfileTemplate {
        website: view.profile.website.clone().unwrap_or_default(),
        picture: view.profile.picture.clone().unwrap_or_default(),
        view,
        is_owner,
        errors,
    }
}

#[instrument(name = "Web: Show profile", skip(state, claims))]
pub async fn show_profile(
    State(state): State<AppState>,
    claims: Claims,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let view = state.profile_service.view(&username).await?;
    Ok(Html(profile_page(view, &claims, FieldErrors::default()).render()?))
}

/// Only the profile's owner may change it.
#[instrument(name = "Web: Update profile", skip(state, claims, form))]
pub async fn update_profile(
    State(state): State<AppState>,
    claims: Claims,
    Path(username): Path<String>,
    Form(form): Form<ProfileForm>,
) -> Result<impl IntoResponse, AppError> {
    let view = state.profile_service.view(&username).await?;
    if view.user.id != claims.user_id()? {
        tracing::warn!(user = %claims, "Attempt to edit another user's profile");
        return Err(AppError::Forbidden);
    }

    match state
        .profile_service
        .save(view.user.id, &form.website, &form.picture)
        .await
    {
        Ok(_) => Ok(Redirect::to(&format!("/rango/profile/{}/", view.user.username)).into_response()),
        Err(AppError::Validation(errors)) => {
            let mut page = profile_page(view, &claims, errors);
            page.website = form.website;
            page.picture = form.picture;
            Ok(Html(page.render()?).into_response())
        }
        Err(e) => Err(e),
    }
}

pub async fn list_profiles(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let profiles = state.profile_service.list().await?;
    Ok(Html(ProfileListTemplate { profiles }.render()?))
}
