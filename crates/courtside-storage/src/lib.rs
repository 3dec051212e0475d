//! Courtside Storage crate - SQLite persistence for the booking collections.
//!
//! Provides a WAL-mode SQLite database with migrations and a
//! `DataSource` implementation that the flow tools read from.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::SqliteDataSource;
