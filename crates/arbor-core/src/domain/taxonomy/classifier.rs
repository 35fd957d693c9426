//! Topic classification and generation using LLM
//!
//! This module defines the external classification contract and its live
//! LLM-backed implementation. The collaborator is untrusted: responses
//! are schema-validated at the boundary and failures surface as typed
//! errors that callers degrade from, never as panics.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::llm::{LlmClient, Message};

use super::topic::LinkType;

/// Maximum related topics accepted from a single generation
const MAX_RELATED_TOPICS: usize = 10;

/// Maximum chapters accepted from a single generation
const MAX_CHAPTERS: usize = 25;

/// A validated classification result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Canonical topic name
    pub topic: String,
    /// Hierarchical path from a root category down to the immediate parent
    pub path: Vec<String>,
}

/// A validated full generation result
#[derive(Debug, Clone)]
pub struct GeneratedTopic {
    /// Canonical topic title
    pub title: String,
    /// Course overview text
    pub course_overview: String,
    /// Classification tags, ordered general to specific
    pub tags: Vec<String>,
    /// Ordered syllabus chapters
    pub chapters: Vec<GeneratedChapter>,
    /// Suggested related topics
    pub related_topics: Vec<RelatedTopic>,
}

/// A chapter produced by generation
#[derive(Debug, Clone)]
pub struct GeneratedChapter {
    /// Chapter title
    pub title: String,
    /// Short summary
    pub summary: String,
}

/// A related topic suggested by generation
#[derive(Debug, Clone)]
pub struct RelatedTopic {
    /// Title of the related topic
    pub topic: String,
    /// Type of relation
    pub link_type: LinkType,
    /// Suggested parent category for the related topic, if any
    pub suggested_parent: Option<String>,
}

/// Classification collaborator contract
///
/// Implemented live by [`LlmTopicClassifier`]; tests script it to drive
/// resolution flows deterministically.
#[async_trait]
pub trait TopicClassifier: Send + Sync {
    /// Classify a free-text query into a topic name and category path
    async fn classify(&self, query: &str, taxonomy_context: &str) -> Result<Classification>;

    /// Generate a full topic (overview, tags, chapters, related topics)
    async fn generate(&self, title: &str, taxonomy_context: &str) -> Result<GeneratedTopic>;
}

/// LLM-backed topic classifier
#[derive(Clone)]
pub struct LlmTopicClassifier {
    /// LLM client for completion requests
    llm_client: Arc<LlmClient>,
}

impl LlmTopicClassifier {
    /// Create a new classifier backed by an LLM client
    pub fn new(llm_client: Arc<LlmClient>) -> Self {
        Self { llm_client }
    }

    fn build_classify_prompt(query: &str, taxonomy_context: &str) -> String {
        format!(
            r#"Classify this query into the knowledge hierarchy.

QUERY: {query}

ROOT CATEGORIES AND THEIR CHILDREN:
{taxonomy_context}

Determine the canonical topic name for the query and the hierarchical path
of category names leading to it. The path is ordered from a root category
down to the topic's immediate parent. The first path element must be one
of the root categories listed above.

Return your answer as JSON:
{{
    "topic": "Canonical Topic Name",
    "path": ["Root Category", "Subcategory", "Immediate Parent"]
}}"#
        )
    }

    fn build_generate_prompt(title: &str, taxonomy_context: &str) -> String {
        format!(
            r#"Create a course outline for this topic.

TOPIC: {title}

ROOT CATEGORIES AND THEIR CHILDREN:
{taxonomy_context}

Produce:
1. A canonical title and a short course overview (2-4 sentences).
2. Classification tags ordered from most general to most specific; the
   most general tags should name categories from the list above where
   possible.
3. An ordered list of chapters, each with a title and a one-sentence
   summary.
4. Related topics a learner might explore, each with a relation type
   (prerequisite, related, or extension) and optionally a suggested
   parent category.

Return your answer as JSON:
{{
    "title": "Canonical Title",
    "course_overview": "...",
    "tags": ["General Category", "Subcategory", "Specific Tag"],
    "chapters": [
        {{"title": "Chapter Title", "summary": "One sentence."}}
    ],
    "related_topics": [
        {{"topic": "Related Topic", "type": "prerequisite|related|extension", "suggested_parent": "Category"}}
    ]
}}"#
        )
    }

    fn parse_classification(response: &str) -> Result<Classification> {
        let json_str = extract_json_from_response(response);

        let raw: RawClassification = serde_json::from_str(&json_str).map_err(|e| {
            warn!(error = %e, "Failed to parse classification response as JSON");
            Error::Classification(format!("Invalid response: {}", e))
        })?;

        let topic = raw.topic.trim().to_string();
        if topic.is_empty() {
            return Err(Error::Classification("Empty topic in response".to_string()));
        }

        let path: Vec<String> = raw
            .path
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Classification { topic, path })
    }

    fn parse_generation(response: &str) -> Result<GeneratedTopic> {
        let json_str = extract_json_from_response(response);

        let raw: RawGeneration = serde_json::from_str(&json_str).map_err(|e| {
            warn!(error = %e, "Failed to parse generation response as JSON");
            Error::Classification(format!("Invalid response: {}", e))
        })?;

        let title = raw.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::Classification("Empty title in response".to_string()));
        }

        let chapters: Vec<GeneratedChapter> = raw
            .chapters
            .into_iter()
            .take(MAX_CHAPTERS)
            .filter(|c| !c.title.trim().is_empty())
            .map(|c| GeneratedChapter {
                title: c.title.trim().to_string(),
                summary: c.summary.unwrap_or_default().trim().to_string(),
            })
            .collect();

        let related_topics: Vec<RelatedTopic> = raw
            .related_topics
            .into_iter()
            .take(MAX_RELATED_TOPICS)
            .filter_map(|r| {
                let topic = r.topic.trim().to_string();
                if topic.is_empty() {
                    return None;
                }
                // Unknown relation types degrade to "related" rather than
                // dropping the suggestion
                let link_type = LinkType::parse(&r.link_type).unwrap_or(LinkType::Related);
                Some(RelatedTopic {
                    topic,
                    link_type,
                    suggested_parent: r
                        .suggested_parent
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty()),
                })
            })
            .collect();

        Ok(GeneratedTopic {
            title,
            course_overview: raw.course_overview.unwrap_or_default().trim().to_string(),
            tags: raw
                .tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            chapters,
            related_topics,
        })
    }
}

#[async_trait]
impl TopicClassifier for LlmTopicClassifier {
    async fn classify(&self, query: &str, taxonomy_context: &str) -> Result<Classification> {
        info!(query = %query, "Classifying query");

        let messages = vec![
            Message::system(CLASSIFY_SYSTEM_PROMPT),
            Message::user(Self::build_classify_prompt(query, taxonomy_context)),
        ];

        let response = self.llm_client.complete_with_fallback(messages).await?;
        let classification = Self::parse_classification(&response.content)?;

        info!(
            topic = %classification.topic,
            path_len = classification.path.len(),
            "Query classified"
        );

        Ok(classification)
    }

    async fn generate(&self, title: &str, taxonomy_context: &str) -> Result<GeneratedTopic> {
        info!(title = %title, "Generating topic");

        let messages = vec![
            Message::system(GENERATE_SYSTEM_PROMPT),
            Message::user(Self::build_generate_prompt(title, taxonomy_context)),
        ];

        let response = self.llm_client.complete_with_fallback(messages).await?;
        let generated = Self::parse_generation(&response.content)?;

        info!(
            title = %generated.title,
            chapters = generated.chapters.len(),
            related = generated.related_topics.len(),
            "Topic generated"
        );

        Ok(generated)
    }
}

/// Raw classification response before validation
#[derive(Debug, Deserialize)]
struct RawClassification {
    topic: String,
    #[serde(default)]
    path: Vec<String>,
}

/// Raw generation response before validation
#[derive(Debug, Deserialize)]
struct RawGeneration {
    title: String,
    course_overview: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    chapters: Vec<RawChapter>,
    #[serde(default)]
    related_topics: Vec<RawRelatedTopic>,
}

#[derive(Debug, Deserialize)]
struct RawChapter {
    title: String,
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRelatedTopic {
    topic: String,
    #[serde(rename = "type", default)]
    link_type: String,
    suggested_parent: Option<String>,
}

/// System prompt for classification
const CLASSIFY_SYSTEM_PROMPT: &str = r#"You are an expert librarian who classifies learning topics into a hierarchical knowledge base.

Guidelines:
1. Use the canonical, widely-recognized name for the topic
2. The path must start at one of the provided root categories
3. Keep the path short: two to four category names
4. Each path element should be a genuine category, not a restatement of the topic

Return valid JSON only, with no additional text or explanation."#;

/// System prompt for full topic generation
const GENERATE_SYSTEM_PROMPT: &str = r#"You are an expert curriculum designer who creates structured course outlines for a hierarchical knowledge base.

Guidelines:
1. Use the canonical, widely-recognized title for the topic
2. Order tags from the most general category to the most specific
3. Chapters should progress from fundamentals to advanced material
4. Suggest related topics a motivated learner would genuinely explore next

Return valid JSON only, with no additional text or explanation."#;

/// Extract JSON from a response that might contain markdown or other text
pub(crate) fn extract_json_from_response(response: &str) -> String {
    // Try to find JSON in code blocks first
    if let Some(start) = response.find("```json") {
        let json_start = start + 7;
        if let Some(end) = response[json_start..].find("```") {
            return response[json_start..json_start + end].trim().to_string();
        }
    }

    // Try to find JSON in generic code blocks
    if let Some(start) = response.find("```") {
        let potential_start = start + 3;
        if let Some(newline) = response[potential_start..].find('\n') {
            let json_start = potential_start + newline + 1;
            if let Some(end) = response[json_start..].find("```") {
                return response[json_start..json_start + end].trim().to_string();
            }
        }
    }

    // Try to find raw JSON object
    if let (Some(start), Some(end)) = (response.find('{'), response.rfind('}')) {
        return response[start..=end].to_string();
    }

    // Return as-is if no JSON found
    response.to_string()
}
