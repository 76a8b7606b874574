//! Rendering of document paths for error messages.
//!
//! Paths use the familiar `spec.podSelector.matchExpressions[0].values[1]`
//! notation. The root renders as the empty string.

/// Appends a mapping key to a rendered path.
#[must_use]
pub fn join_key(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_owned()
    } else {
        format!("{path}.{key}")
    }
}

/// Appends a sequence index to a rendered path.
#[must_use]
pub fn join_index(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}

/// Renders a list of mapping keys as a dotted path.
#[must_use]
pub fn render(segments: &[&str]) -> String {
    segments.join(".")
}
