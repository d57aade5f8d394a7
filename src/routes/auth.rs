use std::fmt::Display;
use std::sync::Arc;

use askama::Template;
use axum::Form;
use axum::RequestPartsExt;
use axum::extract::{FromRef, FromRequestParts, State};
use axum::http::request::Parts;
use axum::response::Html;
use axum::response::IntoResponse;
use axum::response::Redirect;
use axum_extra::extract::CookieJar;
use axum_extra::extract::TypedHeader;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::headers::{Authorization, authorization::Bearer};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::errors::{AppError, FieldErrors};
use crate::startup::AppState;

pub const JWT_COOKIE: &str = "jwt";

#[derive(Template)]
#[template(path = "registration/signup.html")]
struct SignupTemplate {
    username: String,
    email: String,
    errors: FieldErrors,
}

#[derive(Template)]
#[template(path = "registration/login.html")]
struct LoginTemplate {
    username: String,
    error: Option<String>,
}

#[derive(Template)]
#[template(path = "rango/restricted.html")]
struct RestrictedTemplate {
    username: String,
}

pub async fn signup_page() -> Result<impl IntoResponse, AppError> {
    let page = SignupTemplate {
        username: String::new(),
        email: String::new(),
        errors: FieldErrors::default(),
    };
    Ok(Html(page.render()?))
}

pub async fn login_page() -> Result<impl IntoResponse, AppError> {
    let page = LoginTemplate {
        username: String::new(),
        error: None,
    };
    Ok(Html(page.render()?))
}

#[instrument(name = "Web: Login POST", skip(state, jar, payload), fields(username = %payload.username))]
pub async fn login_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(payload): Form<LoginPayload>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!("Request to login user received!");
    // 1. Verify credentials via service
    let user_id = match state
        .auth_service
        .login(&payload.username, &payload.password)
        .await
    {
        Ok(id) => id,
        Err(AppError::WrongCredentials) => {
            let page = LoginTemplate {
                username: payload.username,
                error: Some("Invalid username or password.".into()),
            };
            return Ok(Html(page.render()?).into_response());
        }
        Err(e) => return Err(e),
    };

    // 2. Create JWT and set it as an HttpOnly cookie
    let token = issue_token(&state.keys, user_id, &payload.username)?;
    Ok((jar.add(session_cookie(token)), Redirect::to("/rango/")).into_response())
}

#[instrument(name = "Web: Signup POST", skip(state, jar, payload), fields(username = %payload.username))]
pub async fn signup_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(payload): Form<SignupPayload>,
) -> Result<impl IntoResponse, AppError> {
    let registered = state
        .auth_service
        .register(&payload.username, &payload.email, &payload.password)
        .await;

    let user_id = match registered {
        Ok(id) => id,
        Err(AppError::Validation(errors)) => {
            let page = SignupTemplate {
                username: payload.username,
                email: payload.email,
                errors,
            };
            return Ok(Html(page.render()?).into_response());
        }
        Err(e) => return Err(e),
    };

    // New accounts are signed in straight away and asked for their profile.
    let token = issue_token(&state.keys, user_id, payload.username.trim())?;
    Ok((
        jar.add(session_cookie(token)),
        Redirect::to("/rango/register_profile/"),
    )
        .into_response())
}

#[instrument(name = "Web: Logout GET", skip(jar))]
pub async fn logout_handler(jar: CookieJar) -> impl IntoResponse {
    let updated_jar = jar.remove(Cookie::build(JWT_COOKIE).path("/"));
    (updated_jar, Redirect::to("/rango/"))
}

pub async fn restricted(claims: Claims) -> Result<impl IntoResponse, AppError> {
    let page = RestrictedTemplate {
        username: claims.name,
    };
    Ok(Html(page.render()?))
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((JWT_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Unauthenticated)
    }
}

impl Display for Claims {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "User: {} ({})", self.name, self.sub)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupPayload {
    username: String,
    #[serde(default)]
    email: String,
    password: String,
}

/// Signs a 24 hour token for the user.
pub fn issue_token(keys: &Keys, user_id: Uuid, username: &str) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id.to_string(),
        name: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(24)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &keys.encoding).map_err(|e| {
        tracing::error!("JWT Encoding failed: {:?}", e);
        AppError::TokenCreation
    })
}

impl<S> FromRequestParts<S> for Claims
where
    Arc<Keys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    #[instrument(name = "Extracting Claims", skip(state, parts))]
    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = Arc::<Keys>::from_ref(state);

        // 1. Try to get token from Cookies (for Browser)
        let cookie_token = parts
            .extract::<CookieJar>()
            .await
            .ok()
            .and_then(|jar| jar.get(JWT_COOKIE).map(|c| c.value().to_string()));

        // 2. If no cookie, try to get from Authorization Header (for API/Curl)
        let token = if let Some(t) = cookie_token {
            t
        } else {
            let TypedHeader(Authorization(bearer)) = parts
                .extract::<TypedHeader<Authorization<Bearer>>>()
                .await
                .map_err(|_| {
                    tracing::warn!("No JWT found in cookies or headers");
                    AppError::Unauthenticated
                })?;
            bearer.token().to_string()
        };

        // 3. Decode the token
        let token_data =
            decode::<Claims>(&token, &keys.decoding, &Validation::default()).map_err(|e| {
                tracing::warn!("JWT decoding failed: {:?}", e);
                AppError::Unauthenticated
            })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_decode_with_the_same_secret() {
        let keys = Keys::new(b"test-secret");
        let user_id = Uuid::new_v4();
        let token = issue_token(&keys, user_id, "leifos").unwrap();

        let claims = decode::<Claims>(&token, &keys.decoding, &Validation::default())
            .unwrap()
            .claims;
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.name, "leifos");

        let other = Keys::new(b"other-secret");
        assert!(decode::<Claims>(&token, &other.decoding, &Validation::default()).is_err());
    }
}
