//! Arbor Core Library
//!
//! This crate provides the core functionality for Arbor, including:
//! - Topic resolution (query -> canonical slug)
//! - Taxonomy services (generation, parent resolution, adoption)
//! - Tree assembly with cycle protection
//! - Storage (SQLite)
//! - LLM integration (OpenRouter API)

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod llm;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
}
