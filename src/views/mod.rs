//! Template rendering
//!
//! Pages are Tera templates. The default set is embedded in the binary;
//! `site.templates_dir` points the engine at a directory on disk instead.
//! Every page receives the [`StandardTemplateVars`] alongside its own data.

use chrono::Datelike;
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use tera::{Context as TeraContext, Tera};

use crate::models::User;

mod error;
pub mod filters;

pub use error::ViewError;

/// Default templates compiled into the binary
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct EmbeddedTemplates;

/// Template engine for rendering pages
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Load the embedded templates
    pub fn embedded() -> Result<Self, ViewError> {
        let mut templates = Vec::new();
        for name in EmbeddedTemplates::iter() {
            let Some(file) = EmbeddedTemplates::get(&name) else {
                continue;
            };
            let content = std::str::from_utf8(&file.data)
                .map_err(|e| ViewError::TemplateError(format!("{} is not UTF-8: {}", name, e)))?
                .to_string();
            templates.push((name.to_string(), content));
        }
        Self::from_templates(templates)
    }

    /// Load every `.html` file under `dir`, named by its relative path
    pub fn from_dir(dir: &Path) -> Result<Self, ViewError> {
        if !dir.is_dir() {
            return Err(ViewError::NotFound(dir.display().to_string()));
        }
        let mut templates = Vec::new();
        collect_templates(dir, dir, &mut templates)?;
        Self::from_templates(templates)
    }

    fn from_templates(templates: Vec<(String, String)>) -> Result<Self, ViewError> {
        let mut tera = Tera::default();
        tera.register_filter("truncate_words", filters::truncate_words);
        // add_raw_templates resolves `extends` regardless of insertion order
        tera.add_raw_templates(templates)
            .map_err(|e| ViewError::TemplateError(error_chain("Failed to load templates", &e)))?;

        tracing::debug!("Loaded {} templates", tera.get_template_names().count());
        Ok(Self { tera })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|t| t == name)
    }

    /// Render a template with context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String, ViewError> {
        self.tera.render(template, context).map_err(|e| {
            ViewError::TemplateError(error_chain(&format!("Failed to render '{}'", template), &e))
        })
    }

    /// Render a page with the standard variables added to `context`
    pub fn render_page(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
    ) -> Result<String, ViewError> {
        let mut full_context = context.clone();
        full_context.insert("site_name", &standard_vars.site_name);
        full_context.insert("request_path", &standard_vars.request_path);
        full_context.insert("year", &standard_vars.year);
        full_context.insert("current_user", &standard_vars.current_user);
        full_context.insert("flash", &standard_vars.flash);

        self.render(template, &full_context)
    }

    /// Minimal self-contained error page used when templates are unusable
    pub fn simple_error_page(title: &str, message: &str) -> String {
        let title = tera::escape_html(title);
        let message = tera::escape_html(message);
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <style>
        body {{ font-family: sans-serif; max-width: 600px; margin: 50px auto; padding: 20px; }}
        .error-box {{ border-left: 4px solid #c0392b; padding: 12px 20px; background: #fdf2f2; }}
        h1 {{ color: #c0392b; margin-top: 0; }}
    </style>
</head>
<body>
    <div class="error-box">
        <h1>{title}</h1>
        <p>{message}</p>
        <p><a href="/">Back to home</a></p>
    </div>
</body>
</html>"#
        )
    }
}

fn error_chain(prefix: &str, e: &tera::Error) -> String {
    let mut message = format!("{}: {}", prefix, e);
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

fn collect_templates(
    base: &Path,
    current: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<(), ViewError> {
    for entry in fs::read_dir(current)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_templates(base, &path, templates)?;
        } else if path.extension().is_some_and(|ext| ext == "html") {
            let name = path
                .strip_prefix(base)
                .map_err(|e| ViewError::TemplateError(e.to_string()))?
                .to_string_lossy()
                .replace('\\', "/");
            templates.push((name, fs::read_to_string(&path)?));
        }
    }
    Ok(())
}

/// One-shot notice shown on the next rendered page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    /// `success` or `error`
    pub level: String,
    pub message: String,
}

impl FlashMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: "success".to_string(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: "error".to_string(),
            message: message.into(),
        }
    }
}

/// Variables available to every page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardTemplateVars {
    pub site_name: String,
    pub request_path: String,
    /// Current year (for the footer)
    pub year: i32,
    pub current_user: Option<CurrentUser>,
    pub flash: Option<FlashMessage>,
}

/// Logged-in user as seen by templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub profile_picture: Option<String>,
    pub role: String,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            profile_picture: user.profile_picture.clone(),
            role: user.role.to_string(),
        }
    }
}

impl StandardTemplateVars {
    pub fn new(site_name: impl Into<String>, request_path: impl Into<String>) -> Self {
        Self {
            site_name: site_name.into(),
            request_path: request_path.into(),
            year: chrono::Utc::now().year(),
            current_user: None,
            flash: None,
        }
    }

    pub fn with_user(mut self, user: &User) -> Self {
        self.current_user = Some(CurrentUser::from(user));
        self
    }

    pub fn with_flash(mut self, flash: Option<FlashMessage>) -> Self {
        self.flash = flash;
        self
    }
}

#[cfg(test)]
mod tests;
