//! User repository
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL
//!
//! Users are only ever inserted and read.

use super::{mysql, sqlite};
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Address, CreateUserInput, User, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

const USER_COLUMNS: &str = "id, first_name, last_name, profile_picture, username, email, \
     password_hash, address_line1, city, state, pincode, role, created_at";

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Fails on a duplicate username or email.
    async fn create(&self, input: &CreateUserInput) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Count total users
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, input: &CreateUserInput) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(sqlite(&self.pool)?, input).await,
            DatabaseDriver::Mysql => create_user_mysql(mysql(&self.pool)?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_user_by_id_sqlite(sqlite(&self.pool)?, id).await,
            DatabaseDriver::Mysql => get_user_by_id_mysql(mysql(&self.pool)?, id).await,
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_field_sqlite(sqlite(&self.pool)?, "username", username).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_field_mysql(mysql(&self.pool)?, "username", username).await
            }
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_field_sqlite(sqlite(&self.pool)?, "email", email).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_field_mysql(mysql(&self.pool)?, "email", email).await
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_users_sqlite(sqlite(&self.pool)?).await,
            DatabaseDriver::Mysql => count_users_mysql(mysql(&self.pool)?).await,
        }
    }
}

fn user_from_input(id: i64, input: &CreateUserInput, created_at: chrono::DateTime<Utc>) -> User {
    User {
        id,
        first_name: input.first_name.clone(),
        last_name: input.last_name.clone(),
        profile_picture: input.profile_picture.clone(),
        username: input.username.clone(),
        email: input.email.clone(),
        password_hash: input.password_hash.clone(),
        address: input.address.clone(),
        role: input.role,
        created_at,
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, input: &CreateUserInput) -> Result<User> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (first_name, last_name, profile_picture, username, email,
                           password_hash, address_line1, city, state, pincode, role, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.profile_picture)
    .bind(&input.username)
    .bind(&input.email)
    .bind(&input.password_hash)
    .bind(&input.address.line1)
    .bind(&input.address.city)
    .bind(&input.address.state)
    .bind(&input.address.pincode)
    .bind(input.role.to_string())
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create user")?;

    tx.commit().await.context("Failed to commit user")?;

    Ok(user_from_input(result.last_insert_rowid(), input, now))
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    row.as_ref().map(row_to_user_sqlite).transpose()
}

async fn get_user_by_field_sqlite(
    pool: &SqlitePool,
    field: &'static str,
    value: &str,
) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE {field} = ?"))
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get user by {field}"))?;

    row.as_ref().map(row_to_user_sqlite).transpose()
}

async fn count_users_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = UserRole::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    Ok(User {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        profile_picture: row.get("profile_picture"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        address: Address {
            line1: row.get("address_line1"),
            city: row.get("city"),
            state: row.get("state"),
            pincode: row.get("pincode"),
        },
        role,
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, input: &CreateUserInput) -> Result<User> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (first_name, last_name, profile_picture, username, email,
                           password_hash, address_line1, city, state, pincode, role, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.profile_picture)
    .bind(&input.username)
    .bind(&input.email)
    .bind(&input.password_hash)
    .bind(&input.address.line1)
    .bind(&input.address.city)
    .bind(&input.address.state)
    .bind(&input.address.pincode)
    .bind(input.role.to_string())
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create user")?;

    tx.commit().await.context("Failed to commit user")?;

    Ok(user_from_input(result.last_insert_id() as i64, input, now))
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    row.as_ref().map(row_to_user_mysql).transpose()
}

async fn get_user_by_field_mysql(
    pool: &MySqlPool,
    field: &'static str,
    value: &str,
) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE {field} = ?"))
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get user by {field}"))?;

    row.as_ref().map(row_to_user_mysql).transpose()
}

async fn count_users_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = UserRole::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    Ok(User {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        profile_picture: row.get("profile_picture"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        address: Address {
            line1: row.get("address_line1"),
            city: row.get("city"),
            state: row.get("state"),
            pincode: row.get("pincode"),
        },
        role,
        created_at: row.get("created_at"),
    })
}
