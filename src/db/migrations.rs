//! Database migrations
//!
//! Migrations are embedded in the binary as SQL strings, one per backend,
//! and applied in version order at startup. Applied versions are recorded in
//! the `_migrations` table so each migration runs exactly once.

use anyhow::{Context, Result};
use sqlx::{MySqlPool, SqlitePool};
use std::collections::BTreeSet;

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name VARCHAR(100) NOT NULL,
                last_name VARCHAR(100) NOT NULL,
                profile_picture VARCHAR(255),
                username VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                address_line1 VARCHAR(255) NOT NULL DEFAULT '',
                city VARCHAR(100) NOT NULL DEFAULT '',
                state VARCHAR(100) NOT NULL DEFAULT '',
                pincode VARCHAR(20) NOT NULL DEFAULT '',
                role VARCHAR(20) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                first_name VARCHAR(100) NOT NULL,
                last_name VARCHAR(100) NOT NULL,
                profile_picture VARCHAR(255),
                username VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                address_line1 VARCHAR(255) NOT NULL DEFAULT '',
                city VARCHAR(100) NOT NULL DEFAULT '',
                state VARCHAR(100) NOT NULL DEFAULT '',
                pincode VARCHAR(20) NOT NULL DEFAULT '',
                role VARCHAR(20) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    Migration {
        version: 2,
        name: "create_blog_posts",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS blog_posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                image VARCHAR(255),
                category VARCHAR(50) NOT NULL,
                summary TEXT NOT NULL,
                content TEXT NOT NULL,
                is_draft BOOLEAN NOT NULL DEFAULT 0,
                author_id INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (author_id) REFERENCES users(id)
            );
            CREATE INDEX IF NOT EXISTS idx_blog_posts_author ON blog_posts(author_id);
            CREATE INDEX IF NOT EXISTS idx_blog_posts_draft ON blog_posts(is_draft);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS blog_posts (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(255) NOT NULL,
                image VARCHAR(255),
                category VARCHAR(50) NOT NULL,
                summary TEXT NOT NULL,
                content LONGTEXT NOT NULL,
                is_draft BOOLEAN NOT NULL DEFAULT FALSE,
                author_id BIGINT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (author_id) REFERENCES users(id)
            );
            CREATE INDEX idx_blog_posts_author ON blog_posts(author_id);
            CREATE INDEX idx_blog_posts_draft ON blog_posts(is_draft);
        "#,
    },
];

/// Run all pending migrations and return how many were applied.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    let pending = pending_migrations(pool).await?;

    for migration in &pending {
        tracing::info!("Migrating to v{} ({})", migration.version, migration.name);
        let outcome = match pool.driver() {
            DatabaseDriver::Sqlite => {
                let sqlite = pool.as_sqlite().context("SQLite pool unavailable")?;
                apply_sqlite(sqlite, migration).await
            }
            DatabaseDriver::Mysql => {
                let mysql = pool.as_mysql().context("MySQL pool unavailable")?;
                apply_mysql(mysql, migration).await
            }
        };
        outcome.with_context(|| {
            format!("Migration v{} ({}) failed", migration.version, migration.name)
        })?;
    }

    if pending.is_empty() {
        tracing::debug!("Schema is current");
    }
    Ok(pending.len())
}

/// Migrations not yet recorded in `_migrations`, in version order
async fn pending_migrations(pool: &DynDatabasePool) -> Result<Vec<&'static Migration>> {
    ensure_bookkeeping_table(pool).await?;

    let done: BTreeSet<i64> = match pool.driver() {
        DatabaseDriver::Sqlite => {
            let sqlite = pool.as_sqlite().context("SQLite pool unavailable")?;
            sqlx::query_scalar::<_, i64>("SELECT version FROM _migrations")
                .fetch_all(sqlite)
                .await
        }
        DatabaseDriver::Mysql => {
            let mysql = pool.as_mysql().context("MySQL pool unavailable")?;
            sqlx::query_scalar::<_, i64>("SELECT version FROM _migrations")
                .fetch_all(mysql)
                .await
        }
    }
    .context("Failed to read applied migrations")?
    .into_iter()
    .collect();

    Ok(MIGRATIONS
        .iter()
        .filter(|m| !done.contains(&i64::from(m.version)))
        .collect())
}

async fn ensure_bookkeeping_table(pool: &DynDatabasePool) -> Result<()> {
    let version_type = match pool.driver() {
        DatabaseDriver::Sqlite => "INTEGER",
        DatabaseDriver::Mysql => "BIGINT",
    };
    pool.execute(&format!(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version {} PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        version_type
    ))
    .await?;
    Ok(())
}

async fn apply_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    // SQLite DDL is transactional: a failed statement leaves no partial schema
    let mut tx = pool.begin().await?;
    for statement in split_sql_statements(migration.up_sqlite) {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }
    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

// MySQL commits DDL implicitly, so statements run directly on the pool.
async fn apply_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_mysql) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }
    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;
    Ok(())
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, dropping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Whether every embedded migration has been applied
pub async fn is_up_to_date(pool: &DynDatabasePool) -> Result<bool> {
    Ok(pending_count(pool).await? == 0)
}

/// Number of migrations not yet applied
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    Ok(pending_migrations(pool).await?.len())
}
