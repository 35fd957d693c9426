//! Storage layer for Arbor
//!
//! SQLite persistence with connection pooling and versioned migrations.

pub mod database;
pub mod migrations;

pub use database::{Database, DatabaseConfig};
pub use migrations::{CURRENT_VERSION, MigrationStatus};
