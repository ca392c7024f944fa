//! Deterministic slug derivation for post titles.
//!
//! Slugs are computed once when a post is created and never recomputed on
//! edit. There is no uniqueness enforcement: two titles that reduce to the
//! same slug collide, and a title with no sluggable characters yields an
//! empty slug. Lookups take the first match.

/// Derive a URL-safe slug from a human-readable title.
///
/// Lowercases the input, strips every character that is not a word
/// character, whitespace, or hyphen, collapses whitespace runs into a
/// single hyphen, collapses hyphen runs, and trims hyphens from both ends.
/// Pure and idempotent: `slugify(slugify(t)) == slugify(t)`.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_hyphen = false;

    for ch in lowered.chars() {
        if ch.is_whitespace() || ch == '-' {
            if !slug.is_empty() {
                pending_hyphen = true;
            }
            continue;
        }
        if !(ch.is_ascii_alphanumeric() || ch == '_') {
            continue;
        }
        if pending_hyphen {
            slug.push('-');
            pending_hyphen = false;
        }
        slug.push(ch);
    }

    slug
}
