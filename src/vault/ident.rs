//! Stable identifier derivation
//!
//! Free-text titles and person names become filesystem-safe keys here.
//! These functions define entity identity across runs, so their output
//! must never change for a given input.

/// Derive a slug from a free-text title: lowercase, non-alphanumerics
/// collapsed to single hyphens, no leading or trailing hyphen.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Normalize a display name into a file key: trimmed, whitespace runs
/// replaced by a single underscore. Case is preserved.
pub fn normalize_person_name(name: &str) -> String {
    name.trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Extract the numeric ordinal after the kind-prefix underscore
/// (`q_0042` → 42). Returns 0 when the suffix is not a number.
///
/// Used purely for sort stability; the full id string is the identity.
pub fn extract_ordinal(id: &str) -> u64 {
    id.split_once('_')
        .and_then(|(_, suffix)| suffix.parse().ok())
        .unwrap_or(0)
}
