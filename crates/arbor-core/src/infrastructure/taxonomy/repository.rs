//! SQLite implementation of the TopicRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::domain::taxonomy::{
    CATEGORY_OVERVIEW, Chapter, LinkType, TaxonomyStats, Topic, TopicLink, TopicRepository,
};
use crate::error::{Error, Result};

/// SQLite implementation of the topic repository
#[derive(Clone)]
pub struct SqliteTopicRepository {
    pool: SqlitePool,
}

impl SqliteTopicRepository {
    /// Create a new SQLite topic repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TopicRepository for SqliteTopicRepository {
    // ========== Topic Operations ==========

    async fn insert_topic(&self, topic: &Topic) -> Result<()> {
        let tags_json = serde_json::to_string(&topic.tags)
            .map_err(|e| Error::Other(format!("Failed to serialize tags: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO topics (
                id, title, slug, parent_id, overview, creator_id,
                is_public, order_index, tags, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&topic.id)
        .bind(&topic.title)
        .bind(&topic.slug)
        .bind(&topic.parent_id)
        .bind(&topic.overview)
        .bind(&topic.creator_id)
        .bind(topic.is_public)
        .bind(topic.order_index)
        .bind(&tags_json)
        .bind(topic.created_at.to_rfc3339())
        .bind(topic.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(topic_id = %topic.id, slug = %topic.slug, "Topic inserted");
        Ok(())
    }

    async fn upsert_topic(&self, topic: &Topic) -> Result<Topic> {
        let tags_json = serde_json::to_string(&topic.tags)
            .map_err(|e| Error::Other(format!("Failed to serialize tags: {}", e)))?;

        // On conflict, parent_id is only overwritten when a parent was
        // resolved this run, and the row is reclaimed for the generating
        // actor and forced public
        sqlx::query(
            r#"
            INSERT INTO topics (
                id, title, slug, parent_id, overview, creator_id,
                is_public, order_index, tags, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?, ?, ?)
            ON CONFLICT(slug) DO UPDATE SET
                title = excluded.title,
                parent_id = COALESCE(excluded.parent_id, topics.parent_id),
                overview = excluded.overview,
                creator_id = excluded.creator_id,
                is_public = 1,
                tags = excluded.tags,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&topic.id)
        .bind(&topic.title)
        .bind(&topic.slug)
        .bind(&topic.parent_id)
        .bind(&topic.overview)
        .bind(&topic.creator_id)
        .bind(topic.order_index)
        .bind(&tags_json)
        .bind(topic.created_at.to_rfc3339())
        .bind(topic.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(slug = %topic.slug, "Topic upserted");

        // The conflict branch keeps the winning row's id; re-read for the
        // canonical row
        self.get_by_slug(&topic.slug)
            .await?
            .ok_or_else(|| Error::TopicNotFound(topic.slug.clone()))
    }

    async fn get_topic(&self, id: &str) -> Result<Option<Topic>> {
        let row: Option<TopicRow> = sqlx::query_as("SELECT * FROM topics WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_topic()).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Topic>> {
        let row: Option<TopicRow> = sqlx::query_as("SELECT * FROM topics WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_topic()).transpose()
    }

    async fn get_system_by_slug(&self, slug: &str) -> Result<Option<Topic>> {
        let row: Option<TopicRow> =
            sqlx::query_as("SELECT * FROM topics WHERE slug = ? AND creator_id IS NULL")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|r| r.into_topic()).transpose()
    }

    async fn list_topics(&self) -> Result<Vec<Topic>> {
        let rows: Vec<TopicRow> =
            sqlx::query_as("SELECT * FROM topics ORDER BY order_index, title")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(|r| r.into_topic()).collect()
    }

    async fn set_parent(&self, topic_id: &str, parent_id: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE topics SET parent_id = ?, updated_at = ? WHERE id = ?")
            .bind(parent_id)
            .bind(Utc::now().to_rfc3339())
            .bind(topic_id)
            .execute(&self.pool)
            .await?;

        debug!(topic_id = %topic_id, parent_id = ?parent_id, "Topic reparented");
        Ok(())
    }

    // ========== Chapter Operations ==========

    async fn replace_chapters(&self, topic_id: &str, chapters: &[Chapter]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chapters WHERE topic_id = ?")
            .bind(topic_id)
            .execute(&mut *tx)
            .await?;

        for chapter in chapters {
            sqlx::query(
                r#"
                INSERT INTO chapters (id, topic_id, title, summary, order_index, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chapter.id)
            .bind(&chapter.topic_id)
            .bind(&chapter.title)
            .bind(&chapter.summary)
            .bind(chapter.order_index)
            .bind(chapter.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(topic_id = %topic_id, chapters = chapters.len(), "Chapters replaced");
        Ok(())
    }

    async fn chapters_for(&self, topic_id: &str) -> Result<Vec<Chapter>> {
        let rows: Vec<ChapterRow> =
            sqlx::query_as("SELECT * FROM chapters WHERE topic_id = ? ORDER BY order_index")
                .bind(topic_id)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(|r| r.into_chapter()).collect()
    }

    // ========== Link Operations ==========

    async fn get_link(
        &self,
        source_id: &str,
        target_id: &str,
        link_type: LinkType,
    ) -> Result<Option<TopicLink>> {
        let row: Option<LinkRow> = sqlx::query_as(
            r#"
            SELECT * FROM topic_links
            WHERE source_id = ? AND target_id = ? AND link_type = ?
            "#,
        )
        .bind(source_id)
        .bind(target_id)
        .bind(link_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_link()).transpose()
    }

    async fn insert_link(&self, link: &TopicLink) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO topic_links (id, source_id, target_id, link_type, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&link.id)
        .bind(&link.source_id)
        .bind(&link.target_id)
        .bind(link.link_type.as_str())
        .bind(link.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(
            source = %link.source_id,
            target = %link.target_id,
            link_type = %link.link_type,
            "Link inserted"
        );
        Ok(())
    }

    async fn links_for(&self, topic_id: &str) -> Result<Vec<TopicLink>> {
        let rows: Vec<LinkRow> = sqlx::query_as(
            "SELECT * FROM topic_links WHERE source_id = ? OR target_id = ? ORDER BY created_at",
        )
        .bind(topic_id)
        .bind(topic_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.into_link()).collect()
    }

    // ========== Statistics ==========

    async fn stats(&self) -> Result<TaxonomyStats> {
        let (total_topics,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM topics")
            .fetch_one(&self.pool)
            .await?;

        let (root_topics,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM topics WHERE parent_id IS NULL")
                .fetch_one(&self.pool)
                .await?;

        let (placeholder_topics,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM topics WHERE overview = ?")
                .bind(CATEGORY_OVERVIEW)
                .fetch_one(&self.pool)
                .await?;

        let (system_topics,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM topics WHERE creator_id IS NULL")
                .fetch_one(&self.pool)
                .await?;

        let (total_chapters,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chapters")
            .fetch_one(&self.pool)
            .await?;

        let (total_links,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM topic_links")
            .fetch_one(&self.pool)
            .await?;

        let type_counts: Vec<(String, i64)> = sqlx::query_as(
            "SELECT link_type, COUNT(*) FROM topic_links GROUP BY link_type",
        )
        .fetch_all(&self.pool)
        .await?;

        let links_by_type = type_counts
            .into_iter()
            .filter_map(|(t, count)| LinkType::parse(&t).map(|lt| (lt, count as u64)))
            .collect();

        Ok(TaxonomyStats {
            total_topics: total_topics as u64,
            root_topics: root_topics as u64,
            placeholder_topics: placeholder_topics as u64,
            system_topics: system_topics as u64,
            total_chapters: total_chapters as u64,
            total_links: total_links as u64,
            links_by_type,
        })
    }
}

#[derive(Debug, FromRow)]
struct TopicRow {
    id: String,
    title: String,
    slug: String,
    parent_id: Option<String>,
    overview: String,
    creator_id: Option<String>,
    is_public: bool,
    order_index: i64,
    tags: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TopicRow {
    fn into_topic(self) -> Result<Topic> {
        let tags: Vec<String> = self
            .tags
            .as_ref()
            .map(|s| serde_json::from_str(s).unwrap_or_default())
            .unwrap_or_default();

        Ok(Topic {
            id: self.id,
            title: self.title,
            slug: self.slug,
            parent_id: self.parent_id,
            overview: self.overview,
            creator_id: self.creator_id,
            is_public: self.is_public,
            order_index: self.order_index,
            tags,
            created_at: parse_timestamp(&self.created_at),
            updated_at: parse_timestamp(&self.updated_at),
        })
    }
}

#[derive(Debug, FromRow)]
struct ChapterRow {
    id: String,
    topic_id: String,
    title: String,
    summary: String,
    order_index: i64,
    created_at: String,
}

impl ChapterRow {
    fn into_chapter(self) -> Result<Chapter> {
        Ok(Chapter {
            id: self.id,
            topic_id: self.topic_id,
            title: self.title,
            summary: self.summary,
            order_index: self.order_index,
            created_at: parse_timestamp(&self.created_at),
        })
    }
}

#[derive(Debug, FromRow)]
struct LinkRow {
    id: String,
    source_id: String,
    target_id: String,
    link_type: String,
    created_at: String,
}

impl LinkRow {
    fn into_link(self) -> Result<TopicLink> {
        let link_type = LinkType::parse(&self.link_type)
            .ok_or_else(|| Error::Other(format!("Invalid link type: {}", self.link_type)))?;

        Ok(TopicLink {
            id: self.id,
            source_id: self.source_id,
            target_id: self.target_id,
            link_type,
            created_at: parse_timestamp(&self.created_at),
        })
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
