//! One-shot flash messages
//!
//! A flash survives exactly one redirect: the handler that redirects sets
//! the `flash` cookie, and the next page that renders reads it and clears it.
//! The cookie value is `<level>:<url-encoded message>`.

use axum::{
    extract::FromRequestParts,
    http::{header::SET_COOKIE, request::Parts},
    response::{AppendHeaders, Html, IntoResponse, Response},
};
use std::convert::Infallible;

use super::middleware::cookie_value;
use crate::views::FlashMessage;

pub const FLASH_COOKIE: &str = "flash";

/// `Set-Cookie` value carrying `flash`
pub fn set_cookie(flash: &FlashMessage) -> String {
    format!(
        "{}={}:{}; Path=/; HttpOnly; SameSite=Lax",
        FLASH_COOKIE,
        flash.level,
        urlencoding::encode(&flash.message)
    )
}

/// `Set-Cookie` value that removes the flash cookie
pub fn clear_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", FLASH_COOKIE)
}

/// Parse a flash cookie value. Unknown levels and bad encoding yield `None`.
pub fn parse(value: &str) -> Option<FlashMessage> {
    let (level, encoded) = value.split_once(':')?;
    let message = urlencoding::decode(encoded).ok()?.into_owned();
    match level {
        "success" => Some(FlashMessage::success(message)),
        "error" => Some(FlashMessage::error(message)),
        _ => None,
    }
}

/// The flash message carried by the request, if any
#[derive(Debug, Clone, Default)]
pub struct Flash {
    message: Option<FlashMessage>,
    present: bool,
}

impl Flash {
    pub fn message(&self) -> Option<FlashMessage> {
        self.message.clone()
    }

    /// Wrap a rendered page, clearing the flash cookie if the request had one
    pub fn page(&self, html: String) -> Response {
        if self.present {
            (AppendHeaders([(SET_COOKIE, clear_cookie())]), Html(html)).into_response()
        } else {
            Html(html).into_response()
        }
    }
}

impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = cookie_value(&parts.headers, FLASH_COOKIE).filter(|v| !v.is_empty());
        Ok(Self {
            message: raw.as_deref().and_then(parse),
            present: raw.is_some(),
        })
    }
}
