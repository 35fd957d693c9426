//! Topic hierarchy resolution and knowledge-graph construction
//!
//! Queries are classified into a tree of topics that must stay
//! internally consistent (unique slugs, acyclic serialization, sensible
//! ancestry) even though entries are created concurrently, out of order,
//! and partly by an external classifier whose output is not guaranteed
//! to match existing structure.

pub mod classifier;
pub mod reference;
pub mod repository;
pub mod resolver;
pub mod service;
pub mod slug;
pub mod topic;
pub mod tree;

#[cfg(test)]
pub(crate) mod test_support;

pub use classifier::{
    Classification, GeneratedChapter, GeneratedTopic, LlmTopicClassifier, RelatedTopic,
    TopicClassifier,
};
pub use reference::{TaxonomyMatch, TaxonomyNode, find_match, flattened, reference_taxonomy};
pub use repository::{TaxonomyStats, TopicRepository};
pub use resolver::TopicResolver;
pub use service::{GenerationOutcome, TaxonomyService};
pub use slug::slugify;
pub use topic::{CATEGORY_OVERVIEW, Chapter, LinkType, Topic, TopicLink};
pub use tree::{TopicTreeNode, TreeMode, assemble};
