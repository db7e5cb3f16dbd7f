//! Legal-citation span extraction for display highlighting.
//!
//! Citations are recognized for rendering emphasis only; nothing downstream
//! parses them structurally.

use std::sync::LazyLock;

use regex::Regex;

// Compiled once, reused across calls.
static LEGAL_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(IPC|CrPC|CPA|IT Act|Constitution|Section)\s?\d+[A-Za-z]*")
        .expect("invalid legal-code regex")
});

static NOTICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Note:|Important:|Warning:").expect("invalid notice regex"));

/// What a highlighted span marks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpanKind {
    /// A statute reference such as "IPC Section 302".
    LegalCode,
    /// An emphasis marker such as "Warning:".
    Notice,
}

/// A byte-ranged span of `text` to render with emphasis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HighlightSpan {
    pub start: usize,
    pub end: usize,
    pub kind: SpanKind,
}

/// Find all highlightable spans in `text`, ordered by start offset.
pub fn highlight_spans(text: &str) -> Vec<HighlightSpan> {
    let mut spans: Vec<HighlightSpan> = LEGAL_CODE
        .find_iter(text)
        .map(|m| HighlightSpan {
            start: m.start(),
            end: m.end(),
            kind: SpanKind::LegalCode,
        })
        .chain(NOTICE.find_iter(text).map(|m| HighlightSpan {
            start: m.start(),
            end: m.end(),
            kind: SpanKind::Notice,
        }))
        .collect();
    spans.sort_by_key(|s| s.start);
    spans
}

// =============================================================================
// Tests
// =============================================================================
