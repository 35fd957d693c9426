//! Fast-path resolution and path materialization
//!
//! Turns a free-text query into the slug of an existing or newly created
//! topic. Repeat queries hit the slug index and return without touching
//! the classifier; misses invoke the classifier and materialize its
//! category path segment by segment.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::Result;

use super::classifier::TopicClassifier;
use super::reference;
use super::repository::TopicRepository;
use super::slug::slugify;
use super::topic::Topic;

/// Resolves queries against the live hierarchy
pub struct TopicResolver<R: TopicRepository, C: TopicClassifier> {
    /// Repository for persistence
    repository: Arc<R>,
    /// External classification collaborator
    classifier: Arc<C>,
}

impl<R: TopicRepository, C: TopicClassifier> TopicResolver<R, C> {
    /// Create a new resolver
    pub fn new(repository: Arc<R>, classifier: Arc<C>) -> Self {
        Self {
            repository,
            classifier,
        }
    }

    /// Resolve a free-text query to a canonical topic slug.
    ///
    /// Never fails for normal input: an empty query returns an empty
    /// slug, and classifier failure degrades to the naive slug of the
    /// raw query with no writes. Only store failure propagates.
    pub async fn resolve_topic(&self, query: &str, actor: Option<&str>) -> Result<String> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(String::new());
        }

        let candidate = slugify(query);

        // Fast path: exact slug match, no classifier call, no writes
        if let Some(existing) = self.repository.get_by_slug(&candidate).await? {
            debug!(slug = %existing.slug, "Fast-path slug hit");
            return Ok(existing.slug);
        }

        let taxonomy_context = reference::flattened();
        let classification = match self.classifier.classify(query, &taxonomy_context).await {
            Ok(c) => c,
            Err(e) => {
                // Degraded but navigable: the naive slug of the raw query
                warn!(query = %query, error = %e, "Classification failed, falling back to naive slug");
                return Ok(candidate);
            }
        };

        let parent_id = self.materialize_path(&classification.path).await?;

        let slug = slugify(&classification.topic);
        if slug.is_empty() {
            return Ok(candidate);
        }

        let topic = Topic::stub(&classification.topic, parent_id, actor);
        match insert_or_read(self.repository.as_ref(), topic).await {
            Ok(topic) => {
                info!(slug = %topic.slug, "Topic resolved");
                Ok(topic.slug)
            }
            Err(e) => Err(e),
        }
    }

    /// Materialize a path of category names, returning the last node's id.
    ///
    /// Segments resolve strictly in order: each segment's parent link is
    /// the previous segment's id, so there is no valid parallel fan-out.
    /// Slug collisions mean the category already exists, possibly created
    /// by another branch, and the existing row is reused as-is.
    pub async fn materialize_path(&self, path: &[String]) -> Result<Option<String>> {
        let mut current_parent_id: Option<String> = None;

        for segment in path {
            let slug = slugify(segment);
            if slug.is_empty() {
                continue;
            }

            let existing = self.repository.get_by_slug(&slug).await?;
            let resolved = match existing {
                Some(topic) => topic,
                None => {
                    let category = Topic::category(segment.clone(), current_parent_id.clone());
                    insert_or_read(self.repository.as_ref(), category).await?
                }
            };

            current_parent_id = Some(resolved.id);
        }

        Ok(current_parent_id)
    }
}

/// Insert a topic, recovering from a slug race by reading the winner.
///
/// Unique violations are an expected branch here, not an error: the
/// concurrent creator's row is canonical and is returned instead.
pub(crate) async fn insert_or_read<R: TopicRepository + ?Sized>(
    repository: &R,
    topic: Topic,
) -> Result<Topic> {
    match repository.insert_topic(&topic).await {
        Ok(()) => Ok(topic),
        Err(e) if e.is_unique_violation() => {
            debug!(slug = %topic.slug, "Lost insert race, re-reading winner");
            match repository.get_by_slug(&topic.slug).await? {
                Some(winner) => Ok(winner),
                // Row vanished between conflict and re-read; propagate the
                // original violation
                None => Err(e),
            }
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::taxonomy::classifier::Classification;
    use crate::domain::taxonomy::test_support::{ScriptedClassifier, test_repository};

    async fn resolver_with(
        classifier: ScriptedClassifier,
    ) -> TopicResolver<crate::infrastructure::taxonomy::SqliteTopicRepository, ScriptedClassifier>
    {
        let repository = Arc::new(test_repository().await);
        TopicResolver::new(repository, Arc::new(classifier))
    }

    #[tokio::test]
    async fn test_empty_query_is_noop() {
        let resolver = resolver_with(ScriptedClassifier::failing()).await;
        assert_eq!(resolver.resolve_topic("   ", None).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_fast_path_skips_classifier() {
        let resolver = resolver_with(ScriptedClassifier::failing()).await;

        let existing = Topic::new("Plumbing");
        resolver.repository.insert_topic(&existing).await.unwrap();

        // The failing classifier would fall back to the naive slug if it
        // were consulted, but the fast path must return before that
        let slug = resolver.resolve_topic("Plumbing", None).await.unwrap();
        assert_eq!(slug, "plumbing");
        assert_eq!(resolver.classifier.classify_calls(), 0);
    }

    #[tokio::test]
    async fn test_classifier_failure_degrades_to_naive_slug() {
        let resolver = resolver_with(ScriptedClassifier::failing()).await;

        let slug = resolver.resolve_topic("Plumbing", None).await.unwrap();
        assert_eq!(slug, "plumbing");

        // No writes on the degraded path
        assert!(resolver.repository.get_by_slug("plumbing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_plumbing_end_to_end() {
        let classifier = ScriptedClassifier::classifying(Classification {
            topic: "Plumbing".to_string(),
            path: vec![
                "Technology".to_string(),
                "Engineering".to_string(),
                "Civil Engineering".to_string(),
            ],
        });
        let resolver = resolver_with(classifier).await;

        let slug = resolver.resolve_topic("Plumbing", Some("user-1")).await.unwrap();
        assert_eq!(slug, "plumbing");

        let technology = resolver.repository.get_by_slug("technology").await.unwrap().unwrap();
        let engineering = resolver.repository.get_by_slug("engineering").await.unwrap().unwrap();
        let civil = resolver
            .repository
            .get_by_slug("civil-engineering")
            .await
            .unwrap()
            .unwrap();
        let plumbing = resolver.repository.get_by_slug("plumbing").await.unwrap().unwrap();

        // Chain: technology (root) <- engineering <- civil-engineering <- plumbing
        assert!(technology.parent_id.is_none());
        assert!(technology.is_placeholder());
        assert_eq!(engineering.parent_id.as_deref(), Some(technology.id.as_str()));
        assert!(engineering.is_placeholder());
        assert_eq!(civil.parent_id.as_deref(), Some(engineering.id.as_str()));
        assert_eq!(plumbing.parent_id.as_deref(), Some(civil.id.as_str()));
        assert_eq!(plumbing.creator_id.as_deref(), Some("user-1"));
        assert!(!plumbing.is_placeholder());

        // Exactly four topics persisted
        assert_eq!(resolver.repository.list_topics().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_resolve_twice_is_idempotent() {
        let classifier = ScriptedClassifier::classifying(Classification {
            topic: "Plumbing".to_string(),
            path: vec!["Technology".to_string()],
        });
        let resolver = resolver_with(classifier).await;

        let first = resolver.resolve_topic("Plumbing", None).await.unwrap();
        let second = resolver.resolve_topic("Plumbing", None).await.unwrap();
        assert_eq!(first, second);

        // The second call hit the fast path
        assert_eq!(resolver.classifier.classify_calls(), 1);
        assert_eq!(resolver.repository.list_topics().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_materialize_path_twice_creates_no_duplicates() {
        let resolver = resolver_with(ScriptedClassifier::failing()).await;

        let path = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let first = resolver.materialize_path(&path).await.unwrap();
        let second = resolver.materialize_path(&path).await.unwrap();

        // Same terminal id both times, one topic per distinct slug
        assert_eq!(first, second);
        let topics = resolver.repository.list_topics().await.unwrap();
        assert_eq!(topics.len(), 3);

        let a = resolver.repository.get_by_slug("a").await.unwrap().unwrap();
        let b = resolver.repository.get_by_slug("b").await.unwrap().unwrap();
        let c = resolver.repository.get_by_slug("c").await.unwrap().unwrap();
        assert!(a.parent_id.is_none());
        assert_eq!(b.parent_id.as_deref(), Some(a.id.as_str()));
        assert_eq!(c.parent_id.as_deref(), Some(b.id.as_str()));
    }

    #[tokio::test]
    async fn test_insert_race_recovers_by_reading_winner() {
        let repository = Arc::new(test_repository().await);

        let winner = Topic::new("Algebra");
        repository.insert_topic(&winner).await.unwrap();

        // A second insert with the same slug loses the race and must
        // come back with the winner's row
        let loser = Topic::new("Algebra");
        let resolved = insert_or_read(repository.as_ref(), loser).await.unwrap();
        assert_eq!(resolved.id, winner.id);
    }
}
