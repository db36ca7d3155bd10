//! Multipart form reading
//!
//! Signup and post creation submit `multipart/form-data` with a mix of text
//! fields and one optional image. Browsers send an empty part with an empty
//! file name when no file was chosen; that counts as no file.

use axum::extract::Multipart;
use std::collections::HashMap;

use super::middleware::WebError;
use crate::services::UploadedFile;

/// Text fields and files of a submitted multipart form
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, WebError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| WebError::BadRequest(format!("Failed to read form: {}", e)))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| WebError::BadRequest(format!("Failed to read '{}': {}", name, e)))?;
                    if file_name.trim().is_empty() && data.is_empty() {
                        continue;
                    }
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            data: data.to_vec(),
                        },
                    );
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| WebError::BadRequest(format!("Failed to read '{}': {}", name, e)))?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    /// Text value of `name`, empty when absent
    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    /// A checkbox counts as checked when it was submitted at all
    pub fn checked(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }

    /// Text fields `names`, for re-filling a rejected form
    pub fn echo(&self, names: &[&str]) -> HashMap<String, String> {
        names
            .iter()
            .map(|name| (name.to_string(), self.text(name)))
            .collect()
    }
}
