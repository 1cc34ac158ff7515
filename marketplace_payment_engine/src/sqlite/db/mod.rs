//! # SQLite database methods
//!
//! "Low-level" SQLite interactions for the settlement ledger.
//!
//! Everything here is a plain function accepting a `&mut SqliteConnection`. Callers can hand in a pooled
//! connection, or `&mut *tx` when several calls must share one atomic transaction.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod orders;
pub mod payments;
pub mod sellers;
pub mod sub_orders;

const SQLITE_DB_URL: &str = "sqlite://data/marketplace_ledger.db";

pub fn db_url() -> String {
    let result = env::var("MPS_DATABASE_URL").unwrap_or_else(|_| {
        info!("MPS_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
