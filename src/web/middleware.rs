//! Web middleware
//!
//! Contains:
//! - `AppState`, the shared services handed to every handler
//! - `WebError`, the error type handlers return
//! - Role gates (`require_doctor`, `require_patient`) and the
//!   `CurrentSession` extractor they feed

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
};
use std::sync::Arc;

use crate::config::Config;
use crate::db::DynDatabasePool;
use crate::models::{SessionClaims, UserRole};
use crate::services::{PostService, SessionManager, UserService};
use crate::views::TemplateEngine;

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub config: Arc<Config>,
    pub user_service: Arc<UserService>,
    pub post_service: Arc<PostService>,
    pub sessions: Arc<SessionManager>,
    pub templates: Arc<TemplateEngine>,
}

/// Errors that end a request with an error page
#[derive(Debug)]
pub enum WebError {
    /// Malformed request the user can't fix by re-submitting the form
    BadRequest(String),
    /// Valid session for a user that no longer exists; carries the
    /// `Set-Cookie` value that clears it
    StaleSession(String),
    /// Storage, filesystem or template failure
    Internal(anyhow::Error),
}

impl<E> From<E> for WebError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        WebError::Internal(err.into())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            WebError::BadRequest(message) => {
                tracing::debug!("Bad request: {}", message);
                (
                    StatusCode::BAD_REQUEST,
                    Html(TemplateEngine::simple_error_page("Bad request", &message)),
                )
                    .into_response()
            }
            WebError::StaleSession(clear_cookie) => (
                AppendHeaders([(header::SET_COOKIE, clear_cookie)]),
                Redirect::to("/login"),
            )
                .into_response(),
            WebError::Internal(err) => {
                tracing::error!("Internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html(TemplateEngine::simple_error_page(
                        "Internal server error",
                        "Something went wrong on our side. Please try again later.",
                    )),
                )
                    .into_response()
            }
        }
    }
}

/// Value of the cookie `name`, if the request carries it
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Validated session claims from the request cookie
pub fn read_session(state: &AppState, headers: &HeaderMap) -> Option<SessionClaims> {
    let token = cookie_value(headers, state.sessions.cookie_name())?;
    state.sessions.validate(&token)
}

/// Claims of the session that passed the role gate
#[derive(Debug, Clone)]
pub struct CurrentSession(pub SessionClaims);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionClaims>()
            .cloned()
            .map(CurrentSession)
            .ok_or_else(|| Redirect::to("/login"))
    }
}

async fn require_role(role: UserRole, state: &AppState, mut request: Request, next: Next) -> Response {
    match read_session(state, request.headers()) {
        Some(claims) if claims.role == role => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        _ => Redirect::to("/login").into_response(),
    }
}

/// Only doctors pass; everyone else is sent to the login page
pub async fn require_doctor(State(state): State<AppState>, request: Request, next: Next) -> Response {
    require_role(UserRole::Doctor, &state, request, next).await
}

/// Only patients pass; everyone else is sent to the login page
pub async fn require_patient(State(state): State<AppState>, request: Request, next: Next) -> Response {
    require_role(UserRole::Patient, &state, request, next).await
}
