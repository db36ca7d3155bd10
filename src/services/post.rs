//! Blog post service
//!
//! Doctors create posts; the dashboards read them back grouped by category.

use crate::db::repositories::PostRepository;
use crate::models::{BlogPost, CategorizedPosts, Category, CreatePostInput, UnknownCategory};
use crate::services::upload::{FileStore, UploadError, UploadedFile};
use anyhow::Context;
use std::str::FromStr;
use std::sync::Arc;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    UnknownCategory(#[from] UnknownCategory),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Post form contents
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: String,
    /// Raw category from the form, label or slug
    pub category: String,
    pub summary: String,
    pub content: String,
    pub is_draft: bool,
}

/// Group posts into the fixed category buckets
pub fn categorize(posts: Vec<BlogPost>) -> CategorizedPosts {
    CategorizedPosts::from_posts(posts)
}

/// Post service
pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
    file_store: FileStore,
}

impl PostService {
    pub fn new(post_repo: Arc<dyn PostRepository>, file_store: FileStore) -> Self {
        Self {
            post_repo,
            file_store,
        }
    }

    /// Create a post for `author_id`.
    ///
    /// The category is parsed before the image is stored, so a rejected post
    /// writes nothing.
    pub async fn create_post(
        &self,
        author_id: i64,
        draft: PostDraft,
        image: Option<UploadedFile>,
    ) -> Result<BlogPost, PostServiceError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(PostServiceError::ValidationError(
                "Title cannot be empty".to_string(),
            ));
        }
        let category = Category::from_str(&draft.category)?;

        let image = self.file_store.store(image.as_ref()).await?;

        let input = CreatePostInput {
            title: title.to_string(),
            image,
            category,
            summary: draft.summary,
            content: draft.content,
            is_draft: draft.is_draft,
            author_id,
        };

        let post = self
            .post_repo
            .create(&input)
            .await
            .context("Failed to create blog post")?;

        tracing::info!(
            "Doctor {} created {} post {} in {}",
            author_id,
            if post.is_draft { "draft" } else { "published" },
            post.id,
            post.category
        );

        Ok(post)
    }

    /// Get post by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<BlogPost>, PostServiceError> {
        let post = self
            .post_repo
            .get_by_id(id)
            .await
            .context("Failed to get blog post")?;
        Ok(post)
    }

    /// All posts of one author, drafts included
    pub async fn list_by_author(&self, author_id: i64) -> Result<Vec<BlogPost>, PostServiceError> {
        let posts = self
            .post_repo
            .list_by_author(author_id)
            .await
            .context("Failed to list author posts")?;
        Ok(posts)
    }

    /// All published posts
    pub async fn list_published(&self) -> Result<Vec<BlogPost>, PostServiceError> {
        let posts = self
            .post_repo
            .list_published()
            .await
            .context("Failed to list published posts")?;
        Ok(posts)
    }

    /// The doctor dashboard view
    pub async fn categorized_for_author(
        &self,
        author_id: i64,
    ) -> Result<CategorizedPosts, PostServiceError> {
        Ok(categorize(self.list_by_author(author_id).await?))
    }

    /// The patient dashboard view
    pub async fn categorized_published(&self) -> Result<CategorizedPosts, PostServiceError> {
        Ok(categorize(self.list_published().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxPostRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Address, CreateUserInput, UserRole};

    struct Fixture {
        _dir: tempfile::TempDir,
        upload_dir: std::path::PathBuf,
        service: PostService,
        doctor_a: i64,
        doctor_b: i64,
    }

    async fn setup() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let upload_dir = dir.path().join("uploads");
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let mut ids = Vec::new();
        for name in ["dra", "drb"] {
            let user = users
                .create(&CreateUserInput {
                    first_name: "Doc".to_string(),
                    last_name: name.to_string(),
                    profile_picture: None,
                    username: name.to_string(),
                    email: format!("{name}@example.com"),
                    password_hash: "hash".to_string(),
                    address: Address::default(),
                    role: UserRole::Doctor,
                })
                .await
                .unwrap();
            ids.push(user.id);
        }

        Fixture {
            service: PostService::new(
                SqlxPostRepository::boxed(pool),
                FileStore::new(&upload_dir, "uploads", 1024),
            ),
            upload_dir,
            _dir: dir,
            doctor_a: ids[0],
            doctor_b: ids[1],
        }
    }

    fn draft(title: &str, category: &str, is_draft: bool) -> PostDraft {
        PostDraft {
            title: title.to_string(),
            category: category.to_string(),
            summary: "A short summary".to_string(),
            content: "Body".to_string(),
            is_draft,
        }
    }

    #[tokio::test]
    async fn test_published_post_visible_to_patients() {
        let f = setup().await;

        let post = f
            .service
            .create_post(f.doctor_a, draft("Heart Health 101", "Heart Disease", false), None)
            .await
            .unwrap();

        let published = f.service.categorized_published().await.unwrap();
        let heart = published.get(Category::HeartDisease);
        assert_eq!(heart.len(), 1);
        assert_eq!(heart[0].id, post.id);
        assert_eq!(heart[0].title, "Heart Health 101");
    }

    #[tokio::test]
    async fn test_draft_hidden_from_patients_but_shown_to_author() {
        let f = setup().await;

        f.service
            .create_post(f.doctor_a, draft("Work in progress", "Covid-19", true), None)
            .await
            .unwrap();

        assert!(f.service.categorized_published().await.unwrap().is_empty());

        let own = f.service.categorized_for_author(f.doctor_a).await.unwrap();
        assert_eq!(own.get(Category::Covid19).len(), 1);
        assert!(own.get(Category::Covid19)[0].is_draft);
    }

    #[tokio::test]
    async fn test_author_view_excludes_other_doctors() {
        let f = setup().await;

        f.service
            .create_post(f.doctor_a, draft("Mine", "Immunization", false), None)
            .await
            .unwrap();
        f.service
            .create_post(f.doctor_b, draft("Theirs", "Immunization", false), None)
            .await
            .unwrap();

        let own = f.service.categorized_for_author(f.doctor_a).await.unwrap();
        assert_eq!(own.total(), 1);
        assert_eq!(own.get(Category::Immunization)[0].title, "Mine");

        assert_eq!(f.service.categorized_published().await.unwrap().total(), 2);
    }

    #[tokio::test]
    async fn test_unknown_category_rejected_without_writing() {
        let f = setup().await;
        let image = UploadedFile {
            file_name: "x.png".to_string(),
            content_type: None,
            data: b"x".to_vec(),
        };

        let err = f
            .service
            .create_post(f.doctor_a, draft("Title", "Oncology", false), Some(image))
            .await
            .unwrap_err();

        assert!(matches!(err, PostServiceError::UnknownCategory(UnknownCategory(ref c)) if c == "Oncology"));
        assert!(!f.upload_dir.join("x.png").exists());
        assert!(f.service.list_by_author(f.doctor_a).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_title_rejected() {
        let f = setup().await;

        let err = f
            .service
            .create_post(f.doctor_a, draft("   ", "Covid-19", false), None)
            .await
            .unwrap_err();

        assert!(matches!(err, PostServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_image_stored_with_post() {
        let f = setup().await;
        let image = UploadedFile {
            file_name: "heart.png".to_string(),
            content_type: Some("image/png".to_string()),
            data: b"png".to_vec(),
        };

        let post = f
            .service
            .create_post(f.doctor_a, draft("With image", "heart-disease", false), Some(image))
            .await
            .unwrap();

        assert_eq!(post.image.as_deref(), Some("uploads/heart.png"));
        assert_eq!(post.category, Category::HeartDisease);
        assert!(f.upload_dir.join("heart.png").exists());

        let fetched = f.service.get_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(fetched.image, post.image);
    }

    #[tokio::test]
    async fn test_buckets_keep_retrieval_order() {
        let f = setup().await;

        for (title, category) in [
            ("one", "Mental Health"),
            ("two", "Covid-19"),
            ("three", "Mental Health"),
        ] {
            f.service
                .create_post(f.doctor_a, draft(title, category, false), None)
                .await
                .unwrap();
        }

        let published = f.service.categorized_published().await.unwrap();
        let titles: Vec<&str> = published
            .get(Category::MentalHealth)
            .iter()
            .map(|p| p.title.as_str())
            .collect();
        assert_eq!(titles, vec!["one", "three"]);
    }
}
