//! Doctor and patient dashboards

use axum::{
    extract::{Multipart, State},
    http::{header::SET_COOKIE, Uri},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use std::collections::HashMap;
use tera::Context as TeraContext;

use super::flash::{self, Flash};
use super::forms::MultipartForm;
use super::middleware::{AppState, CurrentSession, WebError};
use super::standard_vars;
use crate::models::{CategorizedPosts, Category, User};
use crate::services::{PostDraft, PostServiceError, UploadError};
use crate::views::filters::DEFAULT_WORD_LIMIT;
use crate::views::FlashMessage;

pub const POST_CREATED: &str = "Blog post created successfully!";

/// Post form fields echoed back when a submission is rejected
const POST_FIELDS: &[&str] = &["title", "category", "summary", "content", "draft"];

/// A rejected post submission: the reason and what the doctor typed
struct RejectedPost {
    error: String,
    form: HashMap<String, String>,
}

/// Load the session's user; a session for a deleted user is ended
async fn session_user(state: &AppState, session: &CurrentSession) -> Result<User, WebError> {
    match state.user_service.get_by_id(session.0.user_id).await? {
        Some(user) => Ok(user),
        None => {
            tracing::warn!("Session for missing user {}, clearing", session.0.user_id);
            Err(WebError::StaleSession(state.sessions.clear_cookie()))
        }
    }
}

fn render_dashboard(
    state: &AppState,
    template: &str,
    path: &str,
    user: &User,
    posts: &CategorizedPosts,
    flash: &Flash,
    rejected: Option<RejectedPost>,
) -> Result<Response, WebError> {
    let (error, form) = match rejected {
        Some(rejected) => (Some(rejected.error), rejected.form),
        None => (None, HashMap::new()),
    };

    let mut context = TeraContext::new();
    context.insert("user", &crate::views::CurrentUser::from(user));
    context.insert("categorized_blogs", posts);
    context.insert(
        "categories",
        &Category::ALL.iter().map(|c| c.label()).collect::<Vec<_>>(),
    );
    context.insert("summary_words", &DEFAULT_WORD_LIMIT);
    context.insert("error", &error);
    context.insert("form", &form);

    let html = state.templates.render_page(
        template,
        &context,
        &standard_vars(state, path, Some(user)).with_flash(flash.message()),
    )?;
    Ok(flash.page(html))
}

pub async fn doctor_dashboard(
    State(state): State<AppState>,
    session: CurrentSession,
    flash: Flash,
    uri: Uri,
) -> Result<Response, WebError> {
    let user = session_user(&state, &session).await?;
    let posts = state.post_service.categorized_for_author(user.id).await?;

    render_dashboard(&state, "doctor_dashboard.html", uri.path(), &user, &posts, &flash, None)
}

pub async fn create_post(
    State(state): State<AppState>,
    session: CurrentSession,
    flash: Flash,
    uri: Uri,
    multipart: Multipart,
) -> Result<Response, WebError> {
    let user = session_user(&state, &session).await?;

    let mut form = MultipartForm::read(multipart).await?;
    let image = form.take_file("image");
    let draft = PostDraft {
        title: form.text("title"),
        category: form.text("category"),
        summary: form.text("summary"),
        content: form.text("content"),
        is_draft: form.checked("draft"),
    };

    let error = match state.post_service.create_post(user.id, draft, image).await {
        Ok(_) => {
            let notice = FlashMessage::success(POST_CREATED);
            return Ok((
                AppendHeaders([(SET_COOKIE, flash::set_cookie(&notice))]),
                Redirect::to("/doctor_dashboard"),
            )
                .into_response());
        }
        Err(PostServiceError::ValidationError(message)) => message,
        Err(PostServiceError::UnknownCategory(err)) => err.to_string(),
        Err(PostServiceError::Upload(err @ (UploadError::TooLarge { .. } | UploadError::InvalidName(_)))) => {
            err.to_string()
        }
        Err(e) => return Err(e.into()),
    };

    let posts = state.post_service.categorized_for_author(user.id).await?;
    render_dashboard(
        &state,
        "doctor_dashboard.html",
        uri.path(),
        &user,
        &posts,
        &flash,
        Some(RejectedPost {
            error,
            form: form.echo(POST_FIELDS),
        }),
    )
}

pub async fn patient_dashboard(
    State(state): State<AppState>,
    session: CurrentSession,
    flash: Flash,
    uri: Uri,
) -> Result<Response, WebError> {
    let user = session_user(&state, &session).await?;
    let posts = state.post_service.categorized_published().await?;

    render_dashboard(&state, "patient_dashboard.html", uri.path(), &user, &posts, &flash, None)
}
