//! SQLite backend for the settlement engine.
pub mod db;
mod sqlite_impl;

pub use sqlite_impl::SqliteDatabase;
