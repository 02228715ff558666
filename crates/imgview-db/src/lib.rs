//! Imgview-DB: Database schema, migrations, and query operations
//!
//! This crate provides the persistence layer the delivery core consumes,
//! using SQLite with rusqlite and r2d2 connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching database schema
//! - `queries` - Database query operations
//!
//! # Example
//!
//! ```no_run
//! use imgview_common::MediaKind;
//! use imgview_db::models::NewContent;
//! use imgview_db::pool::{init_pool, get_conn};
//! use imgview_db::queries::content;
//!
//! let pool = init_pool("/var/lib/imgview/imgview.db").unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let item = content::insert_content(&conn, &NewContent::new("pictures/cat.srs", MediaKind::Image)).unwrap();
//! println!("Registered content {}", item.id);
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
