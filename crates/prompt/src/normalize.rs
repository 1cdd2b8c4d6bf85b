//! Output formatting for compiled prompts

use regex::Regex;
use std::sync::LazyLock;

/// Byte order mark, treated as whitespace alongside Unicode `White_Space`
const BOM: char = '\u{feff}';

/// Any whitespace stretch holding three or more newlines
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n[\s\x{FEFF}]*\n[\s\x{FEFF}]*\n").expect("blank run pattern is valid")
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\x{FEFF}]+").expect("whitespace pattern is valid"));

static PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\s\x{FEFF}]*([.,!?])[\s\x{FEFF}]*").expect("punctuation pattern is valid")
});

fn is_space(c: char) -> bool {
    c.is_whitespace() || c == BOM
}

/// `str::trim` that also strips byte order marks
pub(crate) fn trim_space(text: &str) -> &str {
    text.trim_matches(is_space)
}

/// Format compiled output.
///
/// The document is always trimmed. With `enabled`, runs of blank lines
/// collapse to a single blank line and every line has its spacing
/// normalized. Without it, newlines and inner spacing are kept verbatim.
pub fn format_output(content: &str, enabled: bool) -> String {
    let trimmed = trim_space(content);
    if !enabled {
        return trimmed.to_string();
    }

    let collapsed = BLANK_RUN.replace_all(trimmed, "\n\n");

    collapsed
        .split('\n')
        .map(normalize_line)
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches(is_space)
        .to_string()
}

/// Collapse inner whitespace and put exactly one space after `. , ! ?`
fn normalize_line(line: &str) -> String {
    let spaced = WHITESPACE_RUN.replace_all(line, " ");
    let punctuated = PUNCTUATION.replace_all(trim_space(&spaced), "$1 ");
    trim_space(&punctuated).to_string()
}
