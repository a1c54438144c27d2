//! Display-only markup substitution.
//!
//! The models emit a small markdown subset; the transcript stores raw text
//! and this module maps it to ANSI styling at display time, so streamed
//! fragments concatenate to exactly the stored message content.

use regex::Regex;
use std::sync::OnceLock;

const BOLD: &str = "\x1b[1m";
const ITALIC: &str = "\x1b[3m";
const CODE: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

static BOLD_RE: OnceLock<Regex> = OnceLock::new();
static ITALIC_RE: OnceLock<Regex> = OnceLock::new();
static FENCE_RE: OnceLock<Regex> = OnceLock::new();
static INLINE_CODE_RE: OnceLock<Regex> = OnceLock::new();

fn bold_re() -> &'static Regex {
    BOLD_RE.get_or_init(|| Regex::new(r"\*\*(.+?)\*\*").unwrap())
}

fn italic_re() -> &'static Regex {
    ITALIC_RE.get_or_init(|| Regex::new(r"\*([^*\n]+)\*").unwrap())
}

fn fence_re() -> &'static Regex {
    FENCE_RE.get_or_init(|| Regex::new(r"(?s)```(?:[A-Za-z0-9_+-]*\n)?(.*?)```").unwrap())
}

fn inline_code_re() -> &'static Regex {
    INLINE_CODE_RE.get_or_init(|| Regex::new(r"`([^`\n]+)`").unwrap())
}

/// Substitute `**bold**`, `*italic*`, fenced blocks, and `` `inline code` ``
/// with ANSI styling.
pub fn render(text: &str) -> String {
    let step = fence_re().replace_all(text, format!("{CODE}$1{RESET}"));
    let step = inline_code_re().replace_all(&step, format!("{CODE}$1{RESET}"));
    let step = bold_re().replace_all(&step, format!("{BOLD}$1{RESET}"));
    let step = italic_re().replace_all(&step, format!("{ITALIC}$1{RESET}"));
    step.into_owned()
}

/// Remove the markup markers without styling. Used for speech, which should
/// never read asterisks aloud.
pub fn strip(text: &str) -> String {
    let step = fence_re().replace_all(text, "$1");
    let step = inline_code_re().replace_all(&step, "$1");
    let step = bold_re().replace_all(&step, "$1");
    let step = italic_re().replace_all(&step, "$1");
    step.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bold() {
        assert_eq!(render("say **hi** now"), format!("say {BOLD}hi{RESET} now"));
    }

    #[test]
    fn test_italic() {
        assert_eq!(render("*quietly*"), format!("{ITALIC}quietly{RESET}"));
    }

    #[test]
    fn test_bold_wins_over_italic() {
        let out = render("**both**");
        assert!(out.contains(BOLD));
        assert!(!out.contains(ITALIC));
    }

    #[test]
    fn test_fenced_block_with_language() {
        let out = render("```python\nprint(1)\n```");
        assert_eq!(out, format!("{CODE}print(1)\n{RESET}"));
    }

    #[test]
    fn test_inline_code() {
        assert_eq!(render("run `ls` here"), format!("run {CODE}ls{RESET} here"));
    }

    #[test]
    fn test_strip_removes_markers() {
        assert_eq!(strip("**a** and *b* and `c`"), "a and b and c");
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(render("2 multiplied by 3"), "2 multiplied by 3");
    }
}
