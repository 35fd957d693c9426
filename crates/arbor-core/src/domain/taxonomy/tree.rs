//! Tree assembly with cycle pruning
//!
//! Converts the flat persisted topic list into a nested tree for
//! consumption. The parent graph is expected to be a forest, but a bug
//! or race can transiently produce a cycle; serialization must degrade
//! by pruning rather than recurse forever.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::warn;

use super::topic::Topic;

/// Display mode for tree reads; affects presentation only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeMode {
    /// Include every topic
    Full,
    /// Include only public topics
    PublicOnly,
}

/// A node in the assembled topic tree
#[derive(Debug, Clone, Serialize)]
pub struct TopicTreeNode {
    /// Topic id
    pub id: String,
    /// Display title
    pub title: String,
    /// Canonical slug
    pub slug: String,
    /// Overview text
    pub overview: String,
    /// Whether the topic is public
    pub is_public: bool,
    /// Child nodes
    pub children: Vec<TopicTreeNode>,
}

/// Assemble the flat topic list into a cycle-safe forest.
///
/// Children whose parent id is present attach under it; everything else
/// becomes a root. Serialization carries a per-branch ancestor set: a
/// child already on the current branch is a cycle, logged and skipped
/// instead of recursed into. Topics unreachable from any root (cycle
/// members with no root entry point) are emitted as degraded roots in a
/// second pass so they still appear in the output.
pub fn assemble(topics: Vec<Topic>, mode: TreeMode) -> Vec<TopicTreeNode> {
    let topics: Vec<Topic> = match mode {
        TreeMode::Full => topics,
        TreeMode::PublicOnly => topics.into_iter().filter(|t| t.is_public).collect(),
    };

    let by_id: HashMap<String, Topic> =
        topics.iter().map(|t| (t.id.clone(), t.clone())).collect();

    let mut children_of: HashMap<String, Vec<String>> = HashMap::new();
    let mut roots: Vec<String> = Vec::new();

    for topic in &topics {
        match topic.parent_id.as_ref().filter(|p| by_id.contains_key(*p)) {
            Some(parent_id) => children_of
                .entry(parent_id.clone())
                .or_default()
                .push(topic.id.clone()),
            None => roots.push(topic.id.clone()),
        }
    }

    sort_ids(&mut roots, &by_id);
    for ids in children_of.values_mut() {
        sort_ids(ids, &by_id);
    }

    let mut visited: HashSet<String> = HashSet::new();
    let mut forest: Vec<TopicTreeNode> = roots
        .iter()
        .map(|id| serialize(id, &HashSet::new(), &by_id, &children_of, &mut visited))
        .collect();

    // Cycle members have no root entry point and were never visited;
    // surface them as degraded roots rather than dropping them
    let mut orphaned: Vec<String> = by_id
        .keys()
        .filter(|id| !visited.contains(*id))
        .cloned()
        .collect();
    sort_ids(&mut orphaned, &by_id);

    for id in orphaned {
        if visited.contains(&id) {
            continue;
        }
        warn!(topic_id = %id, "Topic unreachable from any root, emitting as degraded root");
        forest.push(serialize(&id, &HashSet::new(), &by_id, &children_of, &mut visited));
    }

    forest
}

fn serialize(
    id: &str,
    ancestors: &HashSet<String>,
    by_id: &HashMap<String, Topic>,
    children_of: &HashMap<String, Vec<String>>,
    visited: &mut HashSet<String>,
) -> TopicTreeNode {
    let topic = &by_id[id];
    visited.insert(id.to_string());

    // Each branch gets its own copy of the ancestor set so siblings never
    // flag each other as cyclic
    let mut branch = ancestors.clone();
    branch.insert(id.to_string());

    let mut children = Vec::new();
    if let Some(child_ids) = children_of.get(id) {
        for child_id in child_ids {
            if branch.contains(child_id) {
                warn!(
                    topic_id = %child_id,
                    ancestor_of = %id,
                    "Cycle detected in topic hierarchy, pruning"
                );
                visited.insert(child_id.clone());
                continue;
            }
            children.push(serialize(child_id, &branch, by_id, children_of, visited));
        }
    }

    TopicTreeNode {
        id: topic.id.clone(),
        title: topic.title.clone(),
        slug: topic.slug.clone(),
        overview: topic.overview.clone(),
        is_public: topic.is_public,
        children,
    }
}

fn sort_ids(ids: &mut [String], by_id: &HashMap<String, Topic>) {
    ids.sort_by(|a, b| {
        let ta = &by_id[a];
        let tb = &by_id[b];
        ta.order_index
            .cmp(&tb.order_index)
            .then_with(|| ta.title.cmp(&tb.title))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(title: &str, parent_id: Option<&str>) -> Topic {
        let mut t = Topic::new(title);
        t.id = t.slug.clone();
        t.parent_id = parent_id.map(String::from);
        t
    }

    fn collect_slugs(node: &TopicTreeNode, out: &mut Vec<String>) {
        out.push(node.slug.clone());
        for child in &node.children {
            collect_slugs(child, out);
        }
    }

    #[test]
    fn test_simple_forest() {
        let topics = vec![
            topic("Technology", None),
            topic("Engineering", Some("technology")),
            topic("Civil Engineering", Some("engineering")),
            topic("Mathematics", None),
        ];

        let forest = assemble(topics, TreeMode::Full);
        assert_eq!(forest.len(), 2);

        let tech = forest.iter().find(|n| n.slug == "technology").unwrap();
        assert_eq!(tech.children.len(), 1);
        assert_eq!(tech.children[0].slug, "engineering");
        assert_eq!(tech.children[0].children[0].slug, "civil-engineering");
    }

    #[test]
    fn test_missing_parent_becomes_root() {
        let topics = vec![topic("Orphan", Some("no-such-id"))];
        let forest = assemble(topics, TreeMode::Full);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].slug, "orphan");
    }

    #[test]
    fn test_self_parent_is_finite() {
        let topics = vec![topic("Loop", Some("loop"))];

        let forest = assemble(topics, TreeMode::Full);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].slug, "loop");
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn test_two_node_cycle_is_finite() {
        let topics = vec![topic("Alpha", Some("beta")), topic("Beta", Some("alpha"))];

        let forest = assemble(topics, TreeMode::Full);

        // Finite output, and no node is its own descendant
        assert!(!forest.is_empty());
        for root in &forest {
            let mut slugs = Vec::new();
            collect_slugs(root, &mut slugs);
            let mut deduped = slugs.clone();
            deduped.sort();
            deduped.dedup();
            assert_eq!(slugs.len(), deduped.len(), "node repeated within a branch");
        }
    }

    #[test]
    fn test_cycle_member_keeps_valid_children() {
        // Alpha and Beta form a cycle; Gamma hangs off Beta. The cyclic
        // edge is pruned but Gamma must still be emitted, exactly once.
        let topics = vec![
            topic("Alpha", Some("beta")),
            topic("Beta", Some("alpha")),
            topic("Gamma", Some("beta")),
        ];

        let forest = assemble(topics, TreeMode::Full);

        let mut slugs = Vec::new();
        for root in &forest {
            collect_slugs(root, &mut slugs);
        }
        slugs.sort();
        assert_eq!(slugs, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_shared_titles_across_branches_are_not_cycles() {
        // Two distinct nodes under distinct parents; nothing cyclic here
        let mut left = topic("Left", None);
        left.id = "left".into();
        let mut right = topic("Right", None);
        right.id = "right".into();
        let mut a = topic("Shared A", Some("left"));
        a.id = "a".into();
        let mut b = topic("Shared B", Some("right"));
        b.id = "b".into();

        let forest = assemble(vec![left, right, a, b], TreeMode::Full);
        assert_eq!(forest.len(), 2);
        assert!(forest.iter().all(|n| n.children.len() == 1));
    }

    #[test]
    fn test_public_only_mode_filters() {
        let mut hidden = topic("Hidden", None);
        hidden.is_public = false;
        let topics = vec![topic("Visible", None), hidden];

        let forest = assemble(topics, TreeMode::PublicOnly);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].slug, "visible");
    }

    #[test]
    fn test_children_ordered_by_order_index() {
        let root = topic("Root", None);
        let mut first = topic("B Child", Some("root"));
        first.order_index = 0;
        let mut second = topic("A Child", Some("root"));
        second.order_index = 1;

        let forest = assemble(vec![root, first, second], TreeMode::Full);
        let children: Vec<&str> = forest[0].children.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(children, vec!["b-child", "a-child"]);
    }
}
