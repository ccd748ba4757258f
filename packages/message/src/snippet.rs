//! Plain-text excerpts from markdown-ish message text.

use std::sync::LazyLock;

use regex::Regex;

/// Default maximum snippet length in characters, excluding the ellipsis.
pub const DEFAULT_SNIPPET_LENGTH: usize = 100;

const ELLIPSIS: &str = "...";

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[-*]\s+").expect("valid regex"));

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+").expect("valid regex"));

static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid regex"));

static ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.+?)\*").expect("valid regex"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Turns `text` into a single-line excerpt of at most `max_len` characters
/// plus `...`.
///
/// Markdown is stripped in a fixed order: bullets, headers, bold, italic.
/// Bullets go first so a leading `* ` is not read as an italic delimiter,
/// and bold goes before italic so `**` is not split into two italics.
/// Truncation is a hard character cut; it does not look for word
/// boundaries.
#[must_use]
pub fn extract_snippet(text: &str, max_len: usize) -> String {
    let stripped = BULLET_RE.replace_all(text, "");
    let stripped = HEADER_RE.replace_all(&stripped, "");
    let stripped = BOLD_RE.replace_all(&stripped, "$1");
    let stripped = ITALIC_RE.replace_all(&stripped, "$1");
    let collapsed = WHITESPACE_RE.replace_all(&stripped, " ");
    let collapsed = collapsed.trim();

    if collapsed.chars().count() <= max_len {
        return collapsed.to_string();
    }

    let mut truncated: String = collapsed.chars().take(max_len).collect();
    truncated.truncate(truncated.trim_end().len());
    truncated.push_str(ELLIPSIS);
    truncated
}
