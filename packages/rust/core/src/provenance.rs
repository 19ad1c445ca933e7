//! Provenance headers: one annotated text block per fragment.

use docdigest_shared::Fragment;

/// Placeholder for provenance fields the extractor did not supply.
pub const UNKNOWN: &str = "unknown";

/// Render a fragment as `SOURCE: <name> | page: <page> | chunk: <index>` followed
/// by its text on the next line. Never fails; missing fields render as `unknown`.
pub fn format_fragment(fragment: &Fragment) -> String {
    let source = fragment
        .source_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN);
    let page = fragment
        .page
        .map(|p| p.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string());

    format!(
        "SOURCE: {source} | page: {page} | chunk: {}\n{}",
        fragment.sequence_index,
        fragment.text.trim()
    )
}

/// Format every fragment, preserving order.
pub fn format_fragments(fragments: &[Fragment]) -> Vec<String> {
    fragments.iter().map(format_fragment).collect()
}

/// Whitespace-delimited word count, the unit every budget in the pipeline uses.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
