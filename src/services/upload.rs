//! File ingestion
//!
//! Stores uploaded images (profile pictures and post headers) under the
//! upload directory and returns their path relative to the static root.
//! Files keep their original name; a later upload with the same name
//! replaces the earlier file.

use std::path::PathBuf;

use crate::config::UploadConfig;

/// An uploaded file as received from a multipart form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied file name
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Upload errors
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("File too large: {size} bytes (max {max} bytes)")]
    TooLarge { size: u64, max: u64 },
    #[error("Invalid file name: '{0}'")]
    InvalidName(String),
    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes uploads to a directory on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    public_prefix: String,
    max_file_size: u64,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>, max_file_size: u64) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.into().trim_matches('/').to_string(),
            max_file_size,
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(&config.path, &config.public_prefix, config.max_file_size)
    }

    /// Store a file if one was submitted.
    ///
    /// Returns `None` when no file or an empty file name was given, otherwise
    /// the stored path relative to the static root (`uploads/<name>`).
    pub async fn store(&self, file: Option<&UploadedFile>) -> Result<Option<String>, UploadError> {
        let Some(file) = file else {
            return Ok(None);
        };
        if file.file_name.trim().is_empty() {
            return Ok(None);
        }

        let name = sanitize_file_name(&file.file_name)?;

        let size = file.data.len() as u64;
        if size > self.max_file_size {
            return Err(UploadError::TooLarge {
                size,
                max: self.max_file_size,
            });
        }

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(name), &file.data).await?;

        tracing::info!("Stored upload {} ({} bytes)", name, size);

        Ok(Some(if self.public_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.public_prefix, name)
        }))
    }
}

/// Reduce a client-supplied name to its final path component.
pub fn sanitize_file_name(raw: &str) -> Result<&str, UploadError> {
    let name = raw
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." || name.contains('\0') {
        return Err(UploadError::InvalidName(raw.to_string()));
    }

    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, data: &[u8]) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: Some("image/png".to_string()),
            data: data.to_vec(),
        }
    }

    fn store_in(dir: &tempfile::TempDir) -> FileStore {
        FileStore::new(dir.path().join("uploads"), "uploads", 1024)
    }

    #[tokio::test]
    async fn test_no_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert_eq!(store.store(None).await.unwrap(), None);
        assert_eq!(store.store(Some(&file("", b"data"))).await.unwrap(), None);
        assert!(!dir.path().join("uploads").exists());
    }

    #[tokio::test]
    async fn test_store_writes_file_and_returns_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let stored = store.store(Some(&file("heart.png", b"PNGDATA"))).await.unwrap();

        assert_eq!(stored.as_deref(), Some("uploads/heart.png"));
        let written = std::fs::read(dir.path().join("uploads").join("heart.png")).unwrap();
        assert_eq!(written, b"PNGDATA");
    }

    #[tokio::test]
    async fn test_same_name_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.store(Some(&file("a.png", b"first"))).await.unwrap();
        store.store(Some(&file("a.png", b"second"))).await.unwrap();

        let written = std::fs::read(dir.path().join("uploads").join("a.png")).unwrap();
        assert_eq!(written, b"second");
    }

    #[tokio::test]
    async fn test_path_components_are_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let stored = store
            .store(Some(&file("../../etc/passwd.png", b"x")))
            .await
            .unwrap();
        assert_eq!(stored.as_deref(), Some("uploads/passwd.png"));

        let stored = store
            .store(Some(&file("C:\\Users\\me\\photo.jpg", b"x")))
            .await
            .unwrap();
        assert_eq!(stored.as_deref(), Some("uploads/photo.jpg"));
        assert!(dir.path().join("uploads").join("photo.jpg").exists());
    }

    #[tokio::test]
    async fn test_too_large_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let err = store
            .store(Some(&file("big.png", &vec![0u8; 2048])))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::TooLarge { size: 2048, max: 1024 }));
        assert!(!dir.path().join("uploads").join("big.png").exists());
    }

    #[test]
    fn test_sanitize_rejects_directory_names() {
        assert!(sanitize_file_name("uploads/").is_err());
        assert!(sanitize_file_name("..").is_err());
        assert!(sanitize_file_name("a/..").is_err());
        assert_eq!(sanitize_file_name("dir/x.png").unwrap(), "x.png");
    }
}
