//! Web layer - HTML pages and routing
//!
//! Server-rendered pages for signup, login and the two role dashboards.
//! Dashboards sit behind role gates that redirect to `/login`; uploaded
//! files are served from the static root under `/static`.

pub mod auth;
pub mod dashboard;
pub mod flash;
pub mod forms;
pub mod middleware;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::config::Config;
use crate::db::{self, repositories::{SqlxPostRepository, SqlxUserRepository}};
use crate::models::User;
use crate::services::{FileStore, PostService, SessionManager, UserService};
use crate::views::{StandardTemplateVars, TemplateEngine};

pub use middleware::{AppState, CurrentSession, WebError};

/// Multipart bodies carry form fields on top of the file itself
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Open the database, apply migrations and wire the services.
pub async fn build_state(config: Config) -> anyhow::Result<AppState> {
    let pool = db::create_pool(&config.database)
        .await
        .context("Failed to open database")?;
    let applied = db::migrations::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;
    if applied > 0 {
        tracing::info!("Applied {} migration(s)", applied);
    }

    let file_store = FileStore::from_config(&config.upload);
    let user_service = UserService::new(SqlxUserRepository::boxed(pool.clone()), file_store.clone());
    let post_service = PostService::new(SqlxPostRepository::boxed(pool.clone()), file_store);

    let sessions = SessionManager::from_config(&config.session).context("Invalid session settings")?;

    let templates = match &config.site.templates_dir {
        Some(dir) => {
            tracing::info!("Loading templates from {}", dir.display());
            TemplateEngine::from_dir(dir)?
        }
        None => TemplateEngine::embedded()?,
    };

    Ok(AppState {
        pool,
        config: Arc::new(config),
        user_service: Arc::new(user_service),
        post_service: Arc::new(post_service),
        sessions: Arc::new(sessions),
        templates: Arc::new(templates),
    })
}

/// Build the router with all pages, static files and layers
pub fn build_router(state: AppState) -> Router {
    let doctor_routes = Router::new()
        .route(
            "/doctor_dashboard",
            get(dashboard::doctor_dashboard).post(dashboard::create_post),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_doctor,
        ));

    let patient_routes = Router::new()
        .route("/patient_dashboard", get(dashboard::patient_dashboard))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_patient,
        ));

    let body_limit = usize::try_from(state.config.upload.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(auth::index))
        .route("/signup", get(auth::signup_form).post(auth::signup))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", get(auth::logout))
        .merge(doctor_routes)
        .merge(patient_routes)
        .nest_service("/static", ServeDir::new(&state.config.site.static_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Standard page variables for a request
pub(crate) fn standard_vars(state: &AppState, path: &str, user: Option<&User>) -> StandardTemplateVars {
    let vars = StandardTemplateVars::new(&state.config.site.name, path);
    match user {
        Some(user) => vars.with_user(user),
        None => vars,
    }
}
