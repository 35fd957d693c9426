//! SQLite-backed taxonomy persistence

pub mod repository;

pub use repository::SqliteTopicRepository;
