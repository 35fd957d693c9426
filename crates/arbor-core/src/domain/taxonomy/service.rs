//! Taxonomy service
//!
//! Orchestrates the full-generation flow: classify and generate a topic,
//! resolve its parent, upsert it, replace its chapters, record related
//! links, and retroactively adopt orphans that the new topic explains.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Error, Result};

use super::classifier::{RelatedTopic, TopicClassifier};
use super::reference::{self, TaxonomyMatch, contains_whole_word};
use super::repository::{TaxonomyStats, TopicRepository};
use super::resolver::insert_or_read;
use super::slug::slugify;
use super::topic::{Chapter, Topic, TopicLink};
use super::tree::{TopicTreeNode, TreeMode, assemble};

/// Result of a full topic generation
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// The persisted topic row
    pub topic: Topic,
    /// Chapters written for the topic
    pub chapters: Vec<Chapter>,
    /// Number of related-topic links created this run
    pub links_created: usize,
    /// Number of existing topics adopted under the new one
    pub adopted: u64,
}

/// High-level taxonomy operations over a repository and classifier
pub struct TaxonomyService<R: TopicRepository, C: TopicClassifier> {
    /// Repository for persistence
    repository: Arc<R>,
    /// External classification collaborator
    classifier: Arc<C>,
}

impl<R: TopicRepository, C: TopicClassifier> TaxonomyService<R, C> {
    /// Create a new taxonomy service
    pub fn new(repository: Arc<R>, classifier: Arc<C>) -> Self {
        Self {
            repository,
            classifier,
        }
    }

    /// Generate a full topic from a query.
    ///
    /// Unlike resolution, generation has no meaningful degraded output,
    /// so classifier failure propagates to the caller.
    pub async fn generate_topic(
        &self,
        query: &str,
        actor: Option<&str>,
    ) -> Result<GenerationOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("Query must not be empty".to_string()));
        }

        let taxonomy_context = reference::flattened();
        let generated = self.classifier.generate(query, &taxonomy_context).await?;

        let slug = slugify(&generated.title);
        if slug.is_empty() {
            return Err(Error::Classification(format!(
                "Generated title '{}' produces an empty slug",
                generated.title
            )));
        }

        let parent_id = self.resolve_parent(&generated.tags, &slug).await?;

        let topic = Topic::new(&generated.title)
            .with_overview(&generated.course_overview)
            .with_tags(generated.tags.clone())
            .with_parent(parent_id)
            .with_creator(actor);
        let topic = self.repository.upsert_topic(&topic).await?;

        // Chapters are fully replaced on every regeneration
        let chapters: Vec<Chapter> = generated
            .chapters
            .iter()
            .enumerate()
            .map(|(i, c)| Chapter::new(&topic.id, &c.title, &c.summary, i as i64))
            .collect();
        self.repository.replace_chapters(&topic.id, &chapters).await?;

        let mut links_created = 0;
        for related in &generated.related_topics {
            if self.resolve_related(&topic, related, actor).await? {
                links_created += 1;
            }
        }

        let adopted = self.adopt_orphans(&topic).await?;

        info!(
            slug = %topic.slug,
            chapters = chapters.len(),
            links_created = links_created,
            adopted = adopted,
            "Topic generated"
        );

        Ok(GenerationOutcome {
            topic,
            chapters,
            links_created,
            adopted,
        })
    }

    /// Resolve a parent for a topic from its classification tags.
    ///
    /// Strategy A scans tags most-specific-first for a system-owned slug
    /// match in the live store; untrusted user nodes are never adopted as
    /// parents this way. Strategy B falls back to the reference taxonomy.
    /// Neither matching is a normal outcome: the topic becomes a root.
    /// Tags slugging to `own_slug` are skipped so a regeneration never
    /// picks itself as parent.
    async fn resolve_parent(&self, tags: &[String], own_slug: &str) -> Result<Option<String>> {
        // Strategy A: trusted DB match, most specific tag first
        for tag in tags.iter().rev() {
            let slug = slugify(tag);
            if slug.is_empty() || slug == own_slug {
                continue;
            }
            if let Some(topic) = self.repository.get_system_by_slug(&slug).await? {
                debug!(tag = %tag, parent_slug = %topic.slug, "Parent resolved from system node");
                return Ok(Some(topic.id));
            }
        }

        // Strategy B: reference-taxonomy fallback
        for tag in tags {
            if let Some(matched) = reference::find_match(tag) {
                if slugify(&matched.title) == own_slug {
                    continue;
                }
                debug!(tag = %tag, category = %matched.title, "Parent resolved from reference taxonomy");
                let parent_id = self.materialize_taxonomy_match(&matched).await?;
                return Ok(Some(parent_id));
            }
        }

        info!("No parent resolved, topic will be created at the root");
        Ok(None)
    }

    /// Ensure the DB node for a taxonomy match exists and return its id.
    ///
    /// For a child match the root is materialized first so the child's
    /// parent link always resolves. An existing matched node with no
    /// parent gets its parent backfilled as a retroactive single-node
    /// fix.
    async fn materialize_taxonomy_match(&self, matched: &TaxonomyMatch) -> Result<String> {
        let mut root_id: Option<String> = None;

        if let Some(root_title) = &matched.root {
            let root_slug = slugify(root_title);
            let root = match self.repository.get_by_slug(&root_slug).await? {
                Some(topic) => topic,
                None => {
                    insert_or_read(self.repository.as_ref(), Topic::category(root_title, None))
                        .await?
                }
            };
            root_id = Some(root.id);
        }

        let slug = slugify(&matched.title);
        match self.repository.get_by_slug(&slug).await? {
            Some(existing) => {
                if existing.parent_id.is_none() && root_id.is_some() {
                    info!(slug = %existing.slug, "Backfilling parent for orphaned taxonomy node");
                    self.repository
                        .set_parent(&existing.id, root_id.as_deref())
                        .await?;
                }
                Ok(existing.id)
            }
            None => {
                let node = insert_or_read(
                    self.repository.as_ref(),
                    Topic::category(matched.title.clone(), root_id),
                )
                .await?;
                Ok(node.id)
            }
        }
    }

    /// Resolve or create the target of a related-topic suggestion and
    /// record the edge. Returns whether a new link was created.
    ///
    /// Edge creation is check-then-insert; a concurrent generation of the
    /// same pair can still produce a duplicate edge.
    async fn resolve_related(
        &self,
        source: &Topic,
        related: &RelatedTopic,
        actor: Option<&str>,
    ) -> Result<bool> {
        let slug = slugify(&related.topic);
        if slug.is_empty() {
            return Ok(false);
        }

        let target = match self.repository.get_by_slug(&slug).await? {
            Some(topic) => topic,
            None => {
                let parent_id = match &related.suggested_parent {
                    Some(parent) => {
                        self.resolve_parent(std::slice::from_ref(parent), &slug).await?
                    }
                    None => None,
                };
                insert_or_read(
                    self.repository.as_ref(),
                    Topic::stub(&related.topic, parent_id, actor),
                )
                .await?
            }
        };

        if target.id == source.id {
            return Ok(false);
        }

        if self
            .repository
            .get_link(&source.id, &target.id, related.link_type)
            .await?
            .is_some()
        {
            return Ok(false);
        }

        self.repository
            .insert_link(&TopicLink::new(&source.id, &target.id, related.link_type))
            .await?;
        debug!(
            source = %source.slug,
            target = %target.slug,
            link_type = %related.link_type,
            "Related-topic link created"
        );
        Ok(true)
    }

    /// Reparent existing topics that the new topic explains.
    ///
    /// A candidate matches if the topic's title equals one of its
    /// recorded tags case-insensitively, or appears as a whole word in
    /// its display title (titles longer than 3 characters only, to avoid
    /// short common words). A candidate is adopted only if its current
    /// parent is absent or a placeholder category; specific placements
    /// are never clobbered. Runs once per generation event.
    pub async fn adopt_orphans(&self, topic: &Topic) -> Result<u64> {
        let title = topic.title.trim();
        if title.is_empty() {
            return Ok(0);
        }

        let mut adopted = 0;
        for candidate in self.repository.list_topics().await? {
            if candidate.id == topic.id {
                continue;
            }
            if candidate.parent_id.as_deref() == Some(topic.id.as_str()) {
                continue;
            }
            // Adopting our own parent would close a two-node loop
            if topic.parent_id.as_deref() == Some(candidate.id.as_str()) {
                continue;
            }

            let tag_match = candidate
                .tags
                .iter()
                .any(|tag| tag.trim().eq_ignore_ascii_case(title));
            let title_match = title.len() > 3 && contains_whole_word(&candidate.title, title);
            if !tag_match && !title_match {
                continue;
            }

            let parent_replaceable = match &candidate.parent_id {
                None => true,
                Some(parent_id) => match self.repository.get_topic(parent_id).await? {
                    None => true,
                    Some(parent) => parent.is_placeholder(),
                },
            };
            if !parent_replaceable {
                continue;
            }

            info!(
                candidate = %candidate.slug,
                new_parent = %topic.slug,
                "Adopting topic under more specific parent"
            );
            self.repository
                .set_parent(&candidate.id, Some(&topic.id))
                .await?;
            adopted += 1;
        }

        Ok(adopted)
    }

    /// Idempotent stub creation by title.
    ///
    /// Duplicate-creation races re-read and return the canonical row.
    pub async fn get_or_create_stub(&self, title: &str, actor: Option<&str>) -> Result<Topic> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("Title must not be empty".to_string()));
        }

        let slug = slugify(title);
        if let Some(existing) = self.repository.get_by_slug(&slug).await? {
            return Ok(existing);
        }

        insert_or_read(self.repository.as_ref(), Topic::stub(title, None, actor)).await
    }

    /// Read the full hierarchy as a pruned, cycle-safe forest
    pub async fn topic_tree(&self, mode: TreeMode) -> Result<Vec<TopicTreeNode>> {
        let topics = self.repository.list_topics().await?;
        Ok(assemble(topics, mode))
    }

    /// Get hierarchy statistics
    pub async fn stats(&self) -> Result<TaxonomyStats> {
        self.repository.stats().await
    }
}
