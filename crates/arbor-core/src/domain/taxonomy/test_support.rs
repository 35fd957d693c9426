//! Shared test fixtures for taxonomy tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::infrastructure::taxonomy::SqliteTopicRepository;
use crate::storage::Database;

use super::classifier::{Classification, GeneratedTopic, TopicClassifier};

/// Build an in-memory repository with migrations applied
pub(crate) async fn test_repository() -> SqliteTopicRepository {
    let db = Database::in_memory().await.expect("Failed to create test database");
    SqliteTopicRepository::new(db.pool().clone())
}

/// A classifier with scripted responses and call counting
pub(crate) struct ScriptedClassifier {
    classification: Option<Classification>,
    generation: Mutex<Option<GeneratedTopic>>,
    classify_calls: AtomicUsize,
    generate_calls: AtomicUsize,
}

impl ScriptedClassifier {
    /// A classifier whose every call fails
    pub(crate) fn failing() -> Self {
        Self {
            classification: None,
            generation: Mutex::new(None),
            classify_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
        }
    }

    /// A classifier that answers `classify` with a fixed result
    pub(crate) fn classifying(classification: Classification) -> Self {
        Self {
            classification: Some(classification),
            generation: Mutex::new(None),
            classify_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
        }
    }

    /// A classifier that answers `generate` with a fixed result
    pub(crate) fn generating(generation: GeneratedTopic) -> Self {
        Self {
            classification: None,
            generation: Mutex::new(Some(generation)),
            classify_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn classify_calls(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub(crate) fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TopicClassifier for ScriptedClassifier {
    async fn classify(&self, _query: &str, _taxonomy_context: &str) -> Result<Classification> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        self.classification
            .clone()
            .ok_or_else(|| Error::Classification("scripted failure".to_string()))
    }

    async fn generate(&self, _title: &str, _taxonomy_context: &str) -> Result<GeneratedTopic> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.generation
            .lock()
            .expect("generation lock poisoned")
            .clone()
            .ok_or_else(|| Error::Classification("scripted failure".to_string()))
    }
}
