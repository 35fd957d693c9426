//! Repository trait for topic hierarchy persistence
//!
//! This module defines the trait for topic storage operations.
//! The trait abstracts over different storage backends (SQLite, etc.).

use async_trait::async_trait;

use crate::error::Result;

use super::topic::{Chapter, LinkType, Topic, TopicLink};

/// Repository trait for topic hierarchy persistence
///
/// The store enforces slug uniqueness; callers recover from unique
/// violations by re-reading rather than locking.
#[async_trait]
pub trait TopicRepository: Send + Sync {
    // ========== Topic Operations ==========

    /// Insert a new topic; fails with a unique violation if the slug exists
    async fn insert_topic(&self, topic: &Topic) -> Result<()>;

    /// Insert-or-update a topic keyed on slug.
    ///
    /// On conflict, the update only overwrites `parent_id` when the
    /// incoming value is non-null, reclaims `creator_id`, and forces the
    /// topic public. Returns the canonical persisted row.
    async fn upsert_topic(&self, topic: &Topic) -> Result<Topic>;

    /// Get a topic by ID
    async fn get_topic(&self, id: &str) -> Result<Option<Topic>>;

    /// Get a topic by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Topic>>;

    /// Get a system-owned topic (null creator) by slug
    async fn get_system_by_slug(&self, slug: &str) -> Result<Option<Topic>>;

    /// List all topics
    async fn list_topics(&self) -> Result<Vec<Topic>>;

    /// Set a topic's parent
    async fn set_parent(&self, topic_id: &str, parent_id: Option<&str>) -> Result<()>;

    // ========== Chapter Operations ==========

    /// Replace all chapters for a topic (delete-then-reinsert)
    async fn replace_chapters(&self, topic_id: &str, chapters: &[Chapter]) -> Result<()>;

    /// Get the ordered chapters for a topic
    async fn chapters_for(&self, topic_id: &str) -> Result<Vec<Chapter>>;

    // ========== Link Operations ==========

    /// Get a link by its (source, target, type) triple
    async fn get_link(
        &self,
        source_id: &str,
        target_id: &str,
        link_type: LinkType,
    ) -> Result<Option<TopicLink>>;

    /// Insert a new link
    async fn insert_link(&self, link: &TopicLink) -> Result<()>;

    /// List all links touching a topic (as source or target)
    async fn links_for(&self, topic_id: &str) -> Result<Vec<TopicLink>>;

    // ========== Statistics ==========

    /// Get hierarchy statistics
    async fn stats(&self) -> Result<TaxonomyStats>;
}

/// Statistics about the topic hierarchy
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct TaxonomyStats {
    /// Total number of topics
    pub total_topics: u64,
    /// Number of root topics (no parent)
    pub root_topics: u64,
    /// Number of placeholder categories
    pub placeholder_topics: u64,
    /// Number of system-owned topics
    pub system_topics: u64,
    /// Total number of chapters
    pub total_chapters: u64,
    /// Total number of links
    pub total_links: u64,
    /// Links by type
    pub links_by_type: Vec<(LinkType, u64)>,
}
