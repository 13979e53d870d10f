//! Topic model
//!
//! A topic is a dot-delimited hierarchical name such as `sensors.room1.temp`.
//! Each segment is either a literal token made of `[a-zA-Z0-9_-]` or the
//! single-segment wildcard `*`.
//!
//! `parse` and `validate_syntax` deliberately disagree on empty segments:
//! `parse` drops them (so `a..b` indexes like `a.b`), while `validate_syntax`
//! rejects them. Validation is the gate applied before any index operation.

/// Separator between topic segments.
pub const DELIMITER: char = '.';

/// Segment that matches exactly one concrete segment at its position.
pub const WILDCARD: &str = "*";

/// Split a raw topic into its non-empty segments.
///
/// An empty string, or one made only of delimiters, yields no segments and
/// addresses the root of the index.
pub fn parse(raw: &str) -> Vec<&str> {
    raw.split(DELIMITER)
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Check wire-level topic syntax without dropping empty segments.
pub fn validate_syntax(raw: &str) -> bool {
    raw.split(DELIMITER).all(is_valid_segment)
}

/// Publish-time check: any `*` character anywhere in the raw topic.
pub fn contains_wildcard(raw: &str) -> bool {
    raw.contains(WILDCARD)
}

fn is_valid_segment(segment: &str) -> bool {
    if segment == WILDCARD {
        return true;
    }
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
