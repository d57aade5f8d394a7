use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::FromRef,
    middleware,
    response::Redirect,
    routing::get,
};
use redis::Client;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

use crate::configuration::{SearchSettings, Settings, StorageBackend};
use crate::routes::{
    ajax::{auto_add_page, like_category, suggest_category},
    api::{category_detail, create_category, delete_category, list_categories, update_category},
    auth::{
        Claims, Keys, login_page, login_post, logout_handler, restricted, signup_page, signup_post,
    },
    category::{add_category, add_category_page, add_page, add_page_page, search_category, show_category},
    index::{about, index},
    page::goto,
    profile::{list_profiles, register_profile, register_profile_page, show_profile, update_profile},
};
use crate::services::{
    auth::AuthService, category::CategoryService, page::PageService, profile::ProfileService,
    search::SearchService, visits::VisitService,
};
use crate::store::{
    CategoryRepository, Database, PageRepository, ProfileRepository, SessionRepository,
    UserRepository,
};

#[derive(Clone)]
pub struct AppState {
    pub category_service: CategoryService,
    pub page_service: PageService,
    pub profile_service: ProfileService,
    pub auth_service: AuthService,
    pub visit_service: VisitService,
    pub search_service: SearchService,
    pub keys: Arc<Keys>,
}

impl FromRef<AppState> for Arc<Keys> {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}

impl AppState {
    /// Wires every service onto one record store and one session store.
    pub fn new(
        db: Database,
        sessions: SessionRepository,
        search_service: SearchService,
        jwt_secret: &[u8],
    ) -> Self {
        let categories = CategoryRepository::new(db.clone());
        let pages = PageRepository::new(db.clone());
        let profiles = ProfileRepository::new(db.clone());
        let users = UserRepository::new(db);

        Self {
            category_service: CategoryService::new(
                categories.clone(),
                pages.clone(),
                profiles.clone(),
            ),
            page_service: PageService::new(pages.clone(), categories),
            profile_service: ProfileService::new(profiles, users.clone(), pages),
            auth_service: AuthService::new(users),
            visit_service: VisitService::new(sessions),
            search_service,
            keys: Arc::new(Keys::new(jwt_secret)),
        }
    }

    /// Everything in process memory; used by `storage: memory` and the tests.
    pub fn in_memory(search: &SearchSettings, jwt_secret: &[u8]) -> anyhow::Result<Self> {
        Ok(Self::new(
            Database::in_memory(),
            SessionRepository::in_memory(),
            SearchService::new(search)?,
            jwt_secret,
        ))
    }

    pub async fn build(cfg: &Settings) -> anyhow::Result<Self> {
        let jwt_secret = cfg.application.jwt_secret.expose_secret().as_bytes();

        match cfg.application.storage {
            StorageBackend::Memory => {
                info!("Using in-memory storage");
                Ok(Self::new(
                    Database::in_memory(),
                    SessionRepository::in_memory().with_ttl(cfg.redis.session_ttl_seconds),
                    SearchService::new(&cfg.search)?,
                    jwt_secret,
                ))
            }
            StorageBackend::Postgres => {
                let client = Client::open(cfg.redis.url.expose_secret())
                    .context("could not open a client connection to redis")?;
                let redis_pool = bb8::Pool::builder().build(client).await?;

                let pg_pool = PgPoolOptions::new()
                    .acquire_timeout(std::time::Duration::from_secs(2))
                    .connect_lazy_with(cfg.database.with_db());
                sqlx::migrate!("./migrations")
                    .run(&pg_pool)
                    .await
                    .context("failed to run database migrations")?;

                Ok(Self::new(
                    Database::Postgres(pg_pool),
                    SessionRepository::redis(redis_pool, cfg.redis.session_ttl_seconds),
                    SearchService::new(&cfg.search)?,
                    jwt_secret,
                ))
            }
        }
    }
}

pub fn router(app_state: AppState) -> Router {
    // Everything in here answers 401 without a valid token.
    let protected = Router::new()
        .route("/rango/like/", get(like_category))
        .route("/rango/add/", get(auto_add_page))
        .route("/rango/restricted/", get(restricted))
        .route("/rango/logout/", get(logout_handler))
        .route(
            "/rango/register_profile/",
            get(register_profile_page).post(register_profile),
        )
        .route(
            "/rango/profile/{username}/",
            get(show_profile).post(update_profile),
        )
        .route_layer(middleware::from_extractor_with_state::<Claims, _>(
            app_state.clone(),
        ));

    let api = Router::new()
        .route("/Category/", get(list_categories).post(create_category))
        .route(
            "/Category/details/{id}",
            get(category_detail)
                .put(update_category)
                .delete(delete_category),
        );

    Router::new()
        .route("/", get(|| async { Redirect::permanent("/rango/") }))
        .route("/rango/", get(index))
        .route("/rango/about/", get(about))
        .route(
            "/rango/add_category/",
            get(add_category_page).post(add_category),
        )
        .route(
            "/rango/category/{slug}/",
            get(show_category).post(search_category),
        )
        .route(
            "/rango/category/{slug}/add_page/",
            get(add_page_page).post(add_page),
        )
        .route("/rango/goto/", get(goto))
        .route("/rango/suggest/", get(suggest_category))
        .route("/rango/profiles/", get(list_profiles))
        .route("/accounts/register/", get(signup_page).post(signup_post))
        .route("/accounts/login/", get(login_page).post(login_post))
        .merge(protected)
        .nest("/api/v1", api)
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

pub async fn run(cfg: Settings) -> anyhow::Result<()> {
    let app_state = AppState::build(&cfg).await?;

    if let Err(e) = app_state.search_service.check_credentials().await {
        tracing::warn!("Web search will be unavailable: {}", e);
    }

    let address = cfg.application.address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("could not bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, router(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
