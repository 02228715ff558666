//! Database connection pool management.
//!
//! This module provides connection pooling for SQLite using r2d2.
//! It handles pool initialization, connection customization, and running migrations.

use imgview_common::{Error, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::migrations;

/// Type alias for the database connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Type alias for a pooled database connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Initialize a new database pool with the given file path.
///
/// This function will:
/// - Create the SQLite database file if it doesn't exist
/// - Set up connection pooling with r2d2
/// - Enable foreign key constraints on all connections
/// - Run pending database migrations
/// - Set appropriate pool size (default 4 connections)
///
/// # Arguments
///
/// * `db_path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(DbPool)` - Initialized connection pool
/// * `Err(Error)` - If pool creation or migration fails
///
/// # Example
///
/// ```no_run
/// use imgview_db::pool::init_pool;
///
/// let pool = init_pool("/var/lib/imgview/imgview.db").unwrap();
/// let conn = pool.get().unwrap();
/// ```
pub fn init_pool(db_path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
    });

    build_pool(manager, 4)
}

/// Initialize an in-memory database pool for testing.
///
/// Every connection of an in-memory SQLite manager opens its own private
/// database, so the pool is limited to a single connection to keep one schema
/// visible to all callers.
///
/// # Example
///
/// ```
/// use imgview_db::pool::init_memory_pool;
///
/// let pool = init_memory_pool().unwrap();
/// let conn = pool.get().unwrap();
/// ```
pub fn init_memory_pool() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

    build_pool(manager, 1)
}

fn build_pool(manager: SqliteConnectionManager, max_size: u32) -> Result<DbPool> {
    let pool = Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create connection pool: {}", e)))?;

    let conn = pool
        .get()
        .map_err(|e| Error::database(format!("Failed to get connection for migrations: {}", e)))?;

    migrations::run_migrations(&conn)
        .map_err(|e| Error::database(format!("Failed to run migrations: {}", e)))?;

    Ok(pool)
}

/// Get a connection from the pool.
///
/// This is a convenience wrapper around `pool.get()` that converts the
/// r2d2 error into our common Error type.
///
/// # Arguments
///
/// * `pool` - Pool to check a connection out of
///
/// # Returns
///
/// * `Ok(PooledConnection)` - Connection returned to the pool on drop
/// * `Err(Error)` - If no connection became available before the pool timeout
pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::database(format!("Failed to get connection from pool: {}", e)))
}
