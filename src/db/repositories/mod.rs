//! Database repositories
//!
//! Each repository wraps the shared pool and dispatches every query to a
//! SQLite or MySQL implementation based on the configured driver.

pub mod post;
pub mod user;

pub use post::{PostRepository, SqlxPostRepository};
pub use user::{SqlxUserRepository, UserRepository};

use anyhow::{Context, Result};
use sqlx::{MySqlPool, SqlitePool};

use crate::db::DynDatabasePool;

fn sqlite(pool: &DynDatabasePool) -> Result<&SqlitePool> {
    pool.as_sqlite().context("SQLite pool unavailable")
}

fn mysql(pool: &DynDatabasePool) -> Result<&MySqlPool> {
    pool.as_mysql().context("MySQL pool unavailable")
}

/// Whether an error chain contains a unique-constraint violation.
///
/// Used to map insert races on `username`/`email` to a domain error.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db)) if db.is_unique_violation()
        )
    })
}
