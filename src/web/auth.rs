//! Signup, login and logout pages

use axum::{
    extract::{Multipart, State},
    http::{header::SET_COOKIE, HeaderMap, Uri},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use std::collections::HashMap;
use tera::Context as TeraContext;

use super::flash::{self, Flash};
use super::forms::MultipartForm;
use super::middleware::{read_session, AppState, WebError};
use super::standard_vars;
use crate::models::{Address, UserRole};
use crate::services::{RegisterInput, UploadError, UserServiceError};
use crate::views::FlashMessage;

const SIGNUP_FIELDS: &[&str] = &[
    "first_name",
    "last_name",
    "username",
    "email",
    "address_line1",
    "city",
    "state",
    "pincode",
    "user_type",
];

pub const REGISTERED: &str = "Registration successful! Please log in.";
pub const USER_EXISTS: &str = "Username or email already exists. Please try again.";
pub const BAD_CREDENTIALS: &str = "Invalid username or password. Please try again.";

/// Send a logged-in user to their dashboard, anyone else to the login page
pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Redirect {
    match read_session(&state, &headers) {
        Some(claims) => Redirect::to(claims.role.dashboard_path()),
        None => Redirect::to("/login"),
    }
}

pub async fn signup_form(
    State(state): State<AppState>,
    flash: Flash,
    uri: Uri,
) -> Result<Response, WebError> {
    let form: HashMap<String, String> = SIGNUP_FIELDS
        .iter()
        .map(|name| (name.to_string(), String::new()))
        .collect();
    render_signup(&state, &flash, uri.path(), form, None)
}

pub async fn signup(
    State(state): State<AppState>,
    flash: Flash,
    uri: Uri,
    multipart: Multipart,
) -> Result<Response, WebError> {
    let mut form = MultipartForm::read(multipart).await?;
    let picture = form.take_file("profile_picture");

    let input = RegisterInput {
        address: Address {
            line1: form.text("address_line1"),
            city: form.text("city"),
            state: form.text("state"),
            pincode: form.text("pincode"),
        },
        ..RegisterInput::new(
            form.text("username"),
            form.text("email"),
            form.text("password"),
            form.text("user_type"),
        )
        .with_name(form.text("first_name"), form.text("last_name"))
    };

    let message = match state.user_service.register(input, picture).await {
        Ok(_) => {
            let notice = FlashMessage::success(REGISTERED);
            return Ok((
                AppendHeaders([(SET_COOKIE, flash::set_cookie(&notice))]),
                Redirect::to("/login"),
            )
                .into_response());
        }
        Err(UserServiceError::UserExists(detail)) => {
            tracing::info!("Signup rejected: {}", detail);
            USER_EXISTS.to_string()
        }
        Err(UserServiceError::ValidationError(message)) => message,
        Err(UserServiceError::Upload(err @ (UploadError::TooLarge { .. } | UploadError::InvalidName(_)))) => {
            err.to_string()
        }
        Err(e) => return Err(e.into()),
    };

    render_signup(&state, &flash, uri.path(), form.echo(SIGNUP_FIELDS), Some(message))
}

fn render_signup(
    state: &AppState,
    flash: &Flash,
    path: &str,
    form: HashMap<String, String>,
    error: Option<String>,
) -> Result<Response, WebError> {
    let mut context = TeraContext::new();
    context.insert("form", &form);
    context.insert(
        "roles",
        &[UserRole::Doctor.to_string(), UserRole::Patient.to_string()],
    );
    context.insert("error", &error);

    let html = state.templates.render_page(
        "signup.html",
        &context,
        &standard_vars(state, path, None).with_flash(flash.message()),
    )?;
    Ok(flash.page(html))
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub async fn login_form(
    State(state): State<AppState>,
    flash: Flash,
    uri: Uri,
) -> Result<Response, WebError> {
    render_login(&state, &flash, uri.path(), "", None)
}

pub async fn login(
    State(state): State<AppState>,
    flash: Flash,
    uri: Uri,
    Form(form): Form<LoginForm>,
) -> Result<Response, WebError> {
    let Some(user) = state
        .user_service
        .authenticate(&form.username, &form.password)
        .await?
    else {
        return render_login(
            &state,
            &flash,
            uri.path(),
            &form.username,
            Some(BAD_CREDENTIALS.to_string()),
        );
    };

    let token = state.sessions.establish(user.id, user.role)?;
    tracing::info!("User '{}' logged in as {}", user.username, user.role);

    Ok((
        AppendHeaders([(SET_COOKIE, state.sessions.set_cookie(&token))]),
        Redirect::to(user.role.dashboard_path()),
    )
        .into_response())
}

fn render_login(
    state: &AppState,
    flash: &Flash,
    path: &str,
    username: &str,
    error: Option<String>,
) -> Result<Response, WebError> {
    let mut context = TeraContext::new();
    context.insert("username", username);
    context.insert("error", &error);

    let html = state.templates.render_page(
        "login.html",
        &context,
        &standard_vars(state, path, None).with_flash(flash.message()),
    )?;
    Ok(flash.page(html))
}

pub async fn logout(State(state): State<AppState>) -> Response {
    (
        AppendHeaders([(SET_COOKIE, state.sessions.clear_cookie())]),
        Redirect::to("/login"),
    )
        .into_response()
}
