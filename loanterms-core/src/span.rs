// Span containment between words and lines.
//
// A word belongs to a line only when its whole span sits inside one of the
// line's spans. Partial overlap never counts.

use crate::types::Span;

pub struct SpanMatcher;

impl SpanMatcher {
    /// True iff `inner` lies fully inside `outer`. Both boundaries are inclusive
    /// of an exact match; one past the end fails. A span whose end overflows
    /// is never contained and never contains anything.
    pub fn span_within(inner: &Span, outer: &Span) -> bool {
        match (inner.end(), outer.end()) {
            (Some(inner_end), Some(outer_end)) => inner.offset >= outer.offset && inner_end <= outer_end,
            _ => false,
        }
    }

    /// True iff any span in `spans` fully contains `word_span`.
    /// A word without a span, or an empty span set, never matches.
    pub fn contains(word_span: Option<&Span>, spans: &[Span]) -> bool {
        match word_span {
            Some(word_span) => spans.iter().any(|span| Self::span_within(word_span, span)),
            None => false,
        }
    }
}
