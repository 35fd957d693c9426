//! Slug normalization
//!
//! Every lookup and deduplication decision in the hierarchy keys on the
//! slug, so this transform must stay pure and deterministic.

/// Normalize a title into a canonical slug.
///
/// Lowercases the input, collapses any run of non-alphanumeric characters
/// into a single `-`, and strips leading/trailing dashes. Empty or
/// all-punctuation input yields an empty slug; callers reject empty
/// queries upstream.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}
