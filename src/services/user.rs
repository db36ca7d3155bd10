//! User service
//!
//! Registration and credential checks for doctors and patients. Sessions
//! are issued by the web layer through [`crate::services::SessionManager`]
//! once `authenticate` succeeds.

use crate::db::repositories::{is_unique_violation, UserRepository};
use crate::models::{Address, CreateUserInput, User, UserRole};
use crate::services::password::{hash_password, verify_against_dummy, verify_password};
use crate::services::upload::{FileStore, UploadError, UploadedFile};
use anyhow::Context;
use std::str::FromStr;
use std::sync::Arc;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Invalid input
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Username or email already taken
    #[error("User already exists: {0}")]
    UserExists(String),

    /// Profile picture could not be stored
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Signup form contents
#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub address: Address,
    /// Raw role from the form ("Doctor" or "Patient")
    pub role: String,
}

impl RegisterInput {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            role: role.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }
}

/// User service for registration and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    file_store: FileStore,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, file_store: FileStore) -> Self {
        Self {
            user_repo,
            file_store,
        }
    }

    /// Register a new user.
    ///
    /// Uniqueness is checked before the profile picture is written, so a
    /// rejected signup leaves no file behind. An insert that still loses a
    /// race on the unique columns maps to `UserExists` as well.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for blank fields, a malformed email or unknown role
    /// - `UserExists` if the username or email is taken
    /// - `Upload` if the picture cannot be stored
    /// - `InternalError` for database errors
    pub async fn register(
        &self,
        input: RegisterInput,
        picture: Option<UploadedFile>,
    ) -> Result<User, UserServiceError> {
        let role = validate_register_input(&input)?;
        let username = input.username.trim().to_string();
        let email = input.email.trim().to_string();

        if self
            .user_repo
            .get_by_username(&username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Username '{}' is already taken",
                username
            )));
        }

        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                email
            )));
        }

        let profile_picture = self.file_store.store(picture.as_ref()).await?;
        let password_hash = hash_password(&input.password).context("Failed to hash password")?;

        let create = CreateUserInput {
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            profile_picture,
            username,
            email,
            password_hash,
            address: input.address,
            role,
        };

        match self.user_repo.create(&create).await {
            Ok(user) => {
                tracing::info!("Registered {} user '{}'", user.role, user.username);
                Ok(user)
            }
            Err(e) if is_unique_violation(&e) => Err(UserServiceError::UserExists(format!(
                "Username '{}' or email '{}' is already taken",
                create.username, create.email
            ))),
            Err(e) => Err(UserServiceError::InternalError(e)),
        }
    }

    /// Check a username and password.
    ///
    /// Returns `None` for an unknown username or a wrong password.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_username(username.trim())
            .await
            .context("Failed to get user by username")?;

        let Some(user) = user else {
            verify_against_dummy(password);
            tracing::warn!("Failed login for unknown user '{}'", username);
            return Ok(None);
        };

        if verify_password(password, &user.password_hash).context("Failed to verify password")? {
            Ok(Some(user))
        } else {
            tracing::warn!("Failed login for user '{}'", user.username);
            Ok(None)
        }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;
        Ok(user)
    }

    /// Total number of registered users
    pub async fn count(&self) -> Result<i64, UserServiceError> {
        let count = self.user_repo.count().await.context("Failed to count users")?;
        Ok(count)
    }
}

fn validate_register_input(input: &RegisterInput) -> Result<UserRole, UserServiceError> {
    let required = [
        ("Username", &input.username),
        ("Email", &input.email),
        ("First name", &input.first_name),
        ("Last name", &input.last_name),
    ];
    for (label, value) in required {
        if value.trim().is_empty() {
            return Err(UserServiceError::ValidationError(format!(
                "{} cannot be empty",
                label
            )));
        }
    }

    if input.password.is_empty() {
        return Err(UserServiceError::ValidationError(
            "Password cannot be empty".to_string(),
        ));
    }

    if !input.email.contains('@') {
        return Err(UserServiceError::ValidationError(
            "Invalid email format".to_string(),
        ));
    }

    UserRole::from_str(&input.role)
        .map_err(|_| UserServiceError::ValidationError("Please choose a valid role".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxUserRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service(upload_dir: &std::path::Path) -> UserService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        UserService::new(
            SqlxUserRepository::boxed(pool),
            FileStore::new(upload_dir, "uploads", 1024 * 1024),
        )
    }

    fn doctor(username: &str, email: &str) -> RegisterInput {
        RegisterInput::new(username, email, "s3cret-pass", "Doctor").with_name("Jane", "Doe")
    }

    fn picture(name: &str) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: Some("image/png".to_string()),
            data: b"img".to_vec(),
        }
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let dir = tempfile::tempdir().unwrap();
        let service = setup_test_service(dir.path()).await;

        let user = service
            .register(doctor("drjane", "jane@example.com"), None)
            .await
            .unwrap();
        assert_eq!(user.role, UserRole::Doctor);
        assert_ne!(user.password_hash, "s3cret-pass");

        let authed = service
            .authenticate("drjane", "s3cret-pass")
            .await
            .unwrap()
            .expect("credentials should verify");
        assert_eq!(authed.id, user.id);
    }

    #[tokio::test]
    async fn test_authenticate_wrong_password() {
        let dir = tempfile::tempdir().unwrap();
        let service = setup_test_service(dir.path()).await;
        service
            .register(doctor("drjane", "jane@example.com"), None)
            .await
            .unwrap();

        assert!(service
            .authenticate("drjane", "wrong")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_authenticate_unknown_user() {
        let dir = tempfile::tempdir().unwrap();
        let service = setup_test_service(dir.path()).await;

        assert!(service
            .authenticate("ghost", "whatever")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_leaves_first_user_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let service = setup_test_service(dir.path()).await;
        let first = service
            .register(doctor("drjane", "jane@example.com"), None)
            .await
            .unwrap();

        let mut second = RegisterInput::new("drjane", "other@example.com", "different", "Patient")
            .with_name("Other", "Person");
        second.address.city = "Elsewhere".to_string();
        let err = service.register(second, None).await.unwrap_err();
        assert!(matches!(err, UserServiceError::UserExists(_)));

        assert_eq!(service.count().await.unwrap(), 1);
        let kept = service.get_by_id(first.id).await.unwrap().unwrap();
        assert_eq!(kept.email, "jane@example.com");
        assert_eq!(kept.role, UserRole::Doctor);
        assert!(service
            .authenticate("drjane", "s3cret-pass")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected_before_upload() {
        let dir = tempfile::tempdir().unwrap();
        let service = setup_test_service(dir.path()).await;
        service
            .register(doctor("drjane", "jane@example.com"), None)
            .await
            .unwrap();

        let err = service
            .register(doctor("janedoe", "jane@example.com"), Some(picture("dup.png")))
            .await
            .unwrap_err();

        assert!(matches!(err, UserServiceError::UserExists(_)));
        assert!(!dir.path().join("dup.png").exists());
    }

    #[tokio::test]
    async fn test_register_stores_profile_picture() {
        let dir = tempfile::tempdir().unwrap();
        let service = setup_test_service(dir.path()).await;

        let user = service
            .register(doctor("drjane", "jane@example.com"), Some(picture("jane.png")))
            .await
            .unwrap();

        assert_eq!(user.profile_picture.as_deref(), Some("uploads/jane.png"));
        assert!(dir.path().join("jane.png").exists());
    }

    #[tokio::test]
    async fn test_register_validation_errors() {
        let dir = tempfile::tempdir().unwrap();
        let service = setup_test_service(dir.path()).await;

        let cases = [
            doctor("", "jane@example.com"),
            doctor("drjane", ""),
            doctor("drjane", "not-an-email"),
            RegisterInput::new("drjane", "jane@example.com", "", "Doctor").with_name("J", "D"),
            RegisterInput::new("drjane", "jane@example.com", "pw", "Admin").with_name("J", "D"),
            RegisterInput::new("drjane", "jane@example.com", "pw", "Doctor"),
        ];

        for input in cases {
            let err = service.register(input, None).await.unwrap_err();
            assert!(matches!(err, UserServiceError::ValidationError(_)), "{err}");
        }
        assert_eq!(service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_role_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let service = setup_test_service(dir.path()).await;

        let user = service
            .register(
                RegisterInput::new("pat", "pat@example.com", "pw", "patient").with_name("Pat", "Lee"),
                None,
            )
            .await
            .unwrap();

        assert_eq!(user.role, UserRole::Patient);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::db::repositories::SqlxUserRepository;
    use crate::db::{create_test_pool, migrations};
    use proptest::prelude::*;

    async fn setup_property_test_service() -> (tempfile::TempDir, UserService) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let service = UserService::new(
            SqlxUserRepository::boxed(pool),
            FileStore::new(dir.path(), "uploads", 1024),
        );
        (dir, service)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(10))]

        /// Registered credentials authenticate; any other password does not.
        #[test]
        fn credentials_round_trip(
            username in "[a-z]{3,12}",
            password in "[a-zA-Z0-9!@#$%^&*]{8,20}",
            doctor in any::<bool>(),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result: Result<(), TestCaseError> = rt.block_on(async {
                let (_dir, service) = setup_property_test_service().await;
                let role = if doctor { "Doctor" } else { "Patient" };

                let input = RegisterInput::new(
                    username.clone(),
                    format!("{username}@example.com"),
                    password.clone(),
                    role,
                )
                .with_name("Test", "User");
                let registered = service.register(input, None).await.unwrap();

                let authed = service.authenticate(&username, &password).await.unwrap();
                prop_assert_eq!(authed.map(|u| u.id), Some(registered.id));

                let wrong = format!("{password}x");
                prop_assert!(service.authenticate(&username, &wrong).await.unwrap().is_none());
                Ok(())
            });
            result?;
        }
    }
}
