//! Static reference taxonomy
//!
//! A fixed two-level outline of root categories and their immediate
//! children, used as a fallback classification source when the live
//! store has no matching node. Loaded once, never mutated.

use std::sync::OnceLock;

/// A node in the reference taxonomy
#[derive(Debug, Clone)]
pub struct TaxonomyNode {
    /// Display title of the category
    pub title: &'static str,
    /// Immediate children (empty for leaves)
    pub children: &'static [&'static str],
}

/// A match found in the reference taxonomy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyMatch {
    /// Title of the matched category
    pub title: String,
    /// Title of the matched category's root, if the match was a child
    pub root: Option<String>,
}

static TAXONOMY: OnceLock<Vec<TaxonomyNode>> = OnceLock::new();

/// Get the reference taxonomy, building it on first use
pub fn reference_taxonomy() -> &'static [TaxonomyNode] {
    TAXONOMY.get_or_init(|| {
        vec![
            TaxonomyNode {
                title: "Mathematics",
                children: &[
                    "Algebra",
                    "Geometry",
                    "Calculus",
                    "Statistics",
                    "Number Theory",
                ],
            },
            TaxonomyNode {
                title: "Science",
                children: &["Physics", "Chemistry", "Biology", "Earth Science", "Astronomy"],
            },
            TaxonomyNode {
                title: "Technology",
                children: &[
                    "Computer Science",
                    "Engineering",
                    "Data Science",
                    "Cybersecurity",
                    "Artificial Intelligence",
                ],
            },
            TaxonomyNode {
                title: "Humanities",
                children: &["History", "Philosophy", "Literature", "Languages", "Religion"],
            },
            TaxonomyNode {
                title: "Arts",
                children: &["Music", "Visual Arts", "Theater", "Film", "Design"],
            },
            TaxonomyNode {
                title: "Social Sciences",
                children: &[
                    "Psychology",
                    "Sociology",
                    "Economics",
                    "Political Science",
                    "Anthropology",
                ],
            },
            TaxonomyNode {
                title: "Health",
                children: &["Medicine", "Nutrition", "Fitness", "Mental Health", "Public Health"],
            },
            TaxonomyNode {
                title: "Business",
                children: &["Finance", "Marketing", "Management", "Entrepreneurship", "Accounting"],
            },
        ]
    })
}

/// Render the taxonomy as a simple text list for the classifier prompt
pub fn flattened() -> String {
    let mut out = String::new();
    for node in reference_taxonomy() {
        out.push_str("- ");
        out.push_str(node.title);
        out.push_str(": ");
        out.push_str(&node.children.join(", "));
        out.push('\n');
    }
    out
}

/// Find a taxonomy category loosely matching a tag.
///
/// Roots are checked before children; for a child match the root title is
/// returned alongside so callers can materialize the root first. Matching
/// is case-insensitive containment in either direction, but the shorter
/// string must appear on word boundaries in the longer one, so a tag
/// "Art" does not match "Earth Science".
pub fn find_match(tag: &str) -> Option<TaxonomyMatch> {
    let tag = tag.trim();
    if tag.is_empty() {
        return None;
    }

    for node in reference_taxonomy() {
        if titles_match(tag, node.title) {
            return Some(TaxonomyMatch {
                title: node.title.to_string(),
                root: None,
            });
        }
    }

    for node in reference_taxonomy() {
        for child in node.children {
            if titles_match(tag, child) {
                return Some(TaxonomyMatch {
                    title: child.to_string(),
                    root: Some(node.title.to_string()),
                });
            }
        }
    }

    None
}

/// Loose bidirectional match with a word-boundary gate
fn titles_match(a: &str, b: &str) -> bool {
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    contains_whole_word(longer, shorter)
}

/// Case-insensitive whole-word containment of `needle` in `haystack`.
///
/// A hit requires the characters immediately before and after the match
/// to be non-alphanumeric (or string boundaries).
pub fn contains_whole_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }

    let haystack = haystack.to_lowercase();
    let needle = needle.to_lowercase();

    let mut search_from = 0;
    while let Some(rel_pos) = haystack[search_from..].find(&needle) {
        let start = search_from + rel_pos;
        let end = start + needle.len();

        let left_ok = start == 0
            || !haystack[..start]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric());
        let right_ok = end == haystack.len()
            || !haystack[end..].chars().next().is_some_and(|c| c.is_alphanumeric());

        if left_ok && right_ok {
            return true;
        }

        // Advance by a full character so the next slice stays on a
        // UTF-8 boundary
        let step = haystack[start..].chars().next().map_or(1, |c| c.len_utf8());
        search_from = start + step;
        if search_from >= haystack.len() {
            break;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_has_roots_and_children() {
        let taxonomy = reference_taxonomy();
        assert!(taxonomy.iter().any(|n| n.title == "Technology"));
        for node in taxonomy {
            assert!(!node.children.is_empty(), "{} has no children", node.title);
        }
    }

    #[test]
    fn test_flattened_lists_roots_with_children() {
        let text = flattened();
        assert!(text.contains("- Technology: "));
        assert!(text.contains("Engineering"));
        assert!(text.contains("- Mathematics: "));
    }

    #[test]
    fn test_root_match() {
        let m = find_match("Mathematics").unwrap();
        assert_eq!(m.title, "Mathematics");
        assert!(m.root.is_none());
    }

    #[test]
    fn test_child_match_carries_root() {
        let m = find_match("Engineering").unwrap();
        assert_eq!(m.title, "Engineering");
        assert_eq!(m.root.as_deref(), Some("Technology"));
    }

    #[test]
    fn test_bidirectional_containment() {
        // Tag longer than the category title
        let m = find_match("Applied Physics").unwrap();
        assert_eq!(m.title, "Physics");

        // Category title longer than the tag
        let m = find_match("Political").unwrap();
        assert_eq!(m.title, "Political Science");
    }

    #[test]
    fn test_short_tags_require_word_boundaries() {
        // "Art" is inside "Earth Science" as a raw substring but not as a word
        let m = find_match("Art");
        assert_ne!(
            m.as_ref().map(|m| m.title.as_str()),
            Some("Earth Science"),
            "Art must not match Earth Science"
        );
        // "art" is not a whole word in "Arts" or "Artificial Intelligence"
        // either, so the tag resolves to nothing at all.
        assert!(m.is_none());
    }

    #[test]
    fn test_case_insensitive() {
        let m = find_match("engineering").unwrap();
        assert_eq!(m.title, "Engineering");
    }

    #[test]
    fn test_no_match() {
        assert!(find_match("Underwater Basket Weaving").is_none());
        assert!(find_match("").is_none());
        assert!(find_match("   ").is_none());
    }

    #[test]
    fn test_contains_whole_word() {
        assert!(contains_whole_word("Earth Science", "Science"));
        assert!(contains_whole_word("earth science", "EARTH"));
        assert!(!contains_whole_word("Earth Science", "Art"));
        assert!(!contains_whole_word("Smartphone", "Art"));
        assert!(contains_whole_word("History of Art", "Art"));
        assert!(!contains_whole_word("anything", ""));
    }
}
