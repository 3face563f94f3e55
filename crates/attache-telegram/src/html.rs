//! Rewrites model-produced HTML into Telegram's supported subset.
//!
//! Telegram rejects messages containing `<p>` or `<div>` tags, but models
//! emit them anyway. Paragraphs become blank lines and divs become line
//! breaks; runs of blank lines are collapsed.

use std::sync::OnceLock;

use regex::Regex;

fn p_close() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</p>\s*").expect("pattern compiles"))
}

fn p_open() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<p(\s[^>]*)?>").expect("pattern compiles"))
}

fn div_close() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</div>\s*").expect("pattern compiles"))
}

fn div_open() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<div(\s[^>]*)?>").expect("pattern compiles"))
}

fn blank_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("pattern compiles"))
}

/// Strips block-level tags Telegram cannot render, keeping the inline
/// formatting (`<b>`, `<i>`, `<code>`, `<pre>`) intact.
pub fn sanitize_html(text: &str) -> String {
    let text = p_close().replace_all(text, "\n\n");
    let text = p_open().replace_all(&text, "");
    let text = div_close().replace_all(&text, "\n");
    let text = div_open().replace_all(&text, "");
    let text = blank_runs().replace_all(&text, "\n\n");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraphs_become_blank_lines() {
        assert_eq!(
            sanitize_html("<p>first</p><p>second</p>"),
            "first\n\nsecond"
        );
    }

    #[test]
    fn test_divs_become_line_breaks() {
        assert_eq!(
            sanitize_html("<div>one</div><div>two</div>"),
            "one\ntwo"
        );
    }

    #[test]
    fn test_attributes_and_case_are_handled() {
        assert_eq!(
            sanitize_html("<P class=\"lead\">Hello</P><DIV id=\"x\">world</DIV>"),
            "Hello\n\nworld"
        );
    }

    #[test]
    fn test_inline_tags_survive() {
        assert_eq!(
            sanitize_html("<p><b>bold</b> and <code>code</code></p>"),
            "<b>bold</b> and <code>code</code>"
        );
    }

    #[test]
    fn test_blank_runs_collapse() {
        assert_eq!(
            sanitize_html("a\n\n\n\n\nb"),
            "a\n\nb"
        );
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(sanitize_html("  just text  "), "just text");
    }
}
