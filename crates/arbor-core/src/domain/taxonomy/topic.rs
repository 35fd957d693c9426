//! Topic entity types for the knowledge hierarchy
//!
//! This module defines the nodes and edges of the topic tree. Topics are
//! created lazily: fully specified by generation, or as minimal stubs
//! that are enriched later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::slug::slugify;

/// Reserved overview value marking an auto-created placeholder category.
///
/// Retroactive adoption treats a parent with this overview as safe to
/// replace; any other non-empty overview marks a deliberate placement.
pub const CATEGORY_OVERVIEW: &str = "Category";

/// A topic node in the knowledge hierarchy.
///
/// The slug is the canonical external key: globally unique, derived from
/// the title, and used for every lookup and deduplication decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    /// Unique identifier, assigned at creation, immutable
    pub id: String,
    /// Display name
    pub title: String,
    /// Canonical lowercase identifier derived from title, globally unique
    pub slug: String,
    /// Hierarchy edge; None means root (top-level category or unclassified)
    pub parent_id: Option<String>,
    /// Free text; `CATEGORY_OVERVIEW` marks an auto-created placeholder
    pub overview: String,
    /// None denotes a system/seed-created node, otherwise an actor identifier
    pub creator_id: Option<String>,
    /// Presentation metadata, not invariant-bearing
    pub is_public: bool,
    /// Presentation ordering among siblings
    pub order_index: i64,
    /// Classification tags recorded at generation time
    pub tags: Vec<String>,
    /// When the topic was created
    pub created_at: DateTime<Utc>,
    /// When the topic was last updated
    pub updated_at: DateTime<Utc>,
}

impl Topic {
    /// Create a new topic with a slug derived from the title
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        let slug = slugify(&title);
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            title,
            slug,
            parent_id: None,
            overview: String::new(),
            creator_id: None,
            is_public: true,
            order_index: 0,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a system-owned placeholder category
    pub fn category(title: impl Into<String>, parent_id: Option<String>) -> Self {
        let mut topic = Self::new(title);
        topic.overview = CATEGORY_OVERVIEW.to_string();
        topic.parent_id = parent_id;
        topic
    }

    /// Create a minimal stub awaiting later enrichment
    pub fn stub(
        title: impl Into<String>,
        parent_id: Option<String>,
        creator_id: Option<&str>,
    ) -> Self {
        let mut topic = Self::new(title);
        topic.parent_id = parent_id;
        topic.creator_id = creator_id.map(String::from);
        topic
    }

    /// Set the overview
    pub fn with_overview(mut self, overview: impl Into<String>) -> Self {
        self.overview = overview.into();
        self
    }

    /// Set the tags
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Set the parent
    pub fn with_parent(mut self, parent_id: Option<String>) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// Set the creator
    pub fn with_creator(mut self, creator_id: Option<&str>) -> Self {
        self.creator_id = creator_id.map(String::from);
        self
    }

    /// Whether this topic is an auto-created placeholder category
    pub fn is_placeholder(&self) -> bool {
        self.overview == CATEGORY_OVERVIEW
    }

    /// Whether this topic is system-owned (seed or auto-created)
    pub fn is_system(&self) -> bool {
        self.creator_id.is_none()
    }
}

/// An ordered chapter in a topic's syllabus.
///
/// Chapters are fully replaced on regeneration, never merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    /// Unique identifier
    pub id: String,
    /// Owning topic
    pub topic_id: String,
    /// Chapter title
    pub title: String,
    /// Short summary of the chapter content
    pub summary: String,
    /// Position within the syllabus
    pub order_index: i64,
    /// When the chapter was created
    pub created_at: DateTime<Utc>,
}

impl Chapter {
    /// Create a new chapter for a topic
    pub fn new(
        topic_id: impl Into<String>,
        title: impl Into<String>,
        summary: impl Into<String>,
        order_index: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            topic_id: topic_id.into(),
            title: title.into(),
            summary: summary.into(),
            order_index,
            created_at: Utc::now(),
        }
    }
}

/// A directed typed edge between two topics, distinct from hierarchy.
///
/// Multiple edges between the same pair with different types are allowed;
/// duplicate (source, target, type) triples must not be created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicLink {
    /// Unique identifier
    pub id: String,
    /// Source topic
    pub source_id: String,
    /// Target topic
    pub target_id: String,
    /// Edge type
    pub link_type: LinkType,
    /// When the link was created
    pub created_at: DateTime<Utc>,
}

impl TopicLink {
    /// Create a new link between two topics
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        link_type: LinkType,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            link_type,
            created_at: Utc::now(),
        }
    }
}

/// Types of links between topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    /// Target should be learned before source
    Prerequisite,
    /// Generic relation
    Related,
    /// Target builds on source
    Extension,
}

impl LinkType {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prerequisite => "prerequisite",
            Self::Related => "related",
            Self::Extension => "extension",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "prerequisite" => Some(Self::Prerequisite),
            "related" => Some(Self::Related),
            "extension" => Some(Self::Extension),
            _ => None,
        }
    }

    /// Get all link types
    pub fn all() -> &'static [LinkType] {
        &[Self::Prerequisite, Self::Related, Self::Extension]
    }
}

impl std::fmt::Display for LinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_creation() {
        let topic = Topic::new("Linear Algebra");

        assert!(!topic.id.is_empty());
        assert_eq!(topic.title, "Linear Algebra");
        assert_eq!(topic.slug, "linear-algebra");
        assert!(topic.parent_id.is_none());
        assert!(topic.is_system());
        assert!(!topic.is_placeholder());
    }

    #[test]
    fn test_category_placeholder() {
        let root = Topic::category("Technology", None);
        assert!(root.is_placeholder());
        assert!(root.is_system());
        assert!(root.is_public);

        let child = Topic::category("Engineering", Some(root.id.clone()));
        assert_eq!(child.parent_id.as_deref(), Some(root.id.as_str()));
    }

    #[test]
    fn test_stub_records_creator() {
        let stub = Topic::stub("Plumbing", None, Some("user-1"));
        assert_eq!(stub.creator_id.as_deref(), Some("user-1"));
        assert!(!stub.is_system());
        assert!(stub.overview.is_empty());
    }

    #[test]
    fn test_link_type_parsing() {
        assert_eq!(LinkType::parse("prerequisite"), Some(LinkType::Prerequisite));
        assert_eq!(LinkType::parse("RELATED"), Some(LinkType::Related));
        assert_eq!(LinkType::parse("extension"), Some(LinkType::Extension));
        assert_eq!(LinkType::parse("unknown"), None);
    }

    #[test]
    fn test_link_type_roundtrip() {
        for link_type in LinkType::all() {
            assert_eq!(LinkType::parse(link_type.as_str()), Some(*link_type));
        }
    }
}
