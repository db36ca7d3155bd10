//! Database layer
//!
//! SQLite (default) and MySQL sit behind the `DatabasePool` trait. The pool
//! is opened once at startup, migrated, and handed to the repositories.
//!
//! ```ignore
//! let pool = db::create_pool(&config.database).await?;
//! db::migrations::run_migrations(&pool).await?;
//! let users = SqlxUserRepository::boxed(pool.clone());
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
