//! String helpers shared by the pipeline stages.

use scraper::Html;
use sha2::{Digest, Sha256};

/// Removes a Markdown code fence wrapped around generated output.
///
/// Handles an opening fence with or without a language tag and a closing fence
/// at the end, then trims the remainder.
pub fn strip_code_fence(text: &str) -> String {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        body = match rest.find('\n') {
            Some(newline) if rest[..newline].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
                &rest[newline + 1..]
            }
            Some(_) => rest,
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
        };
    }
    body = body.trim_end();
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim().to_string()
}

/// Text content of an HTML fragment with entities decoded.
///
/// Text nodes are joined by a space; callers collapse whitespace afterwards.
/// Comments and markup are dropped.
pub fn strip_html_tags(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment.root_element().text().collect::<Vec<_>>().join(" ")
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cuts `text` to at most `max` characters without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// ASCII slug for file names and links.
///
/// Returns `None` when fewer than five usable characters remain, e.g. for a
/// title written entirely in Hangul.
pub fn slugify(title: &str) -> Option<String> {
    let replaced = title.replace(['/', ':'], "-").replace(['(', ')'], "");
    let mut slug = String::new();
    let mut pending_hyphen = false;
    for c in replaced.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_hyphen = true;
        }
    }
    if slug.len() < 5 {
        return None;
    }
    Some(truncate_chars(&slug, 50).trim_end_matches('-').to_string())
}

/// First `len` hex characters of the SHA-256 of `text`.
pub fn short_digest(text: &str, len: usize) -> String {
    let digest = hex::encode(Sha256::digest(text.as_bytes()));
    digest[..len.min(digest.len())].to_string()
}

pub fn contains_hangul(text: &str) -> bool {
    text.chars().any(|c| ('\u{ac00}'..='\u{d7a3}').contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```html\n<h2>X</h2>\n```"), "<h2>X</h2>");
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```\n"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\nplain\n```"), "plain");
        assert_eq!(strip_code_fence("  <p>no fence</p>  "), "<p>no fence</p>");
    }

    #[test]
    fn test_strip_html_tags() {
        let text = collapse_whitespace(&strip_html_tags("<h2>Title</h2><p>Some <strong>bold</strong> text</p>"));
        assert_eq!(text, "Title Some bold text");
    }

    #[test]
    fn test_strip_html_tags_decodes_entities_and_drops_comments() {
        let text = collapse_whitespace(&strip_html_tags(
            "<p>R&amp;D teams &lt;3 AI</p><!-- a > b --><p>end</p>",
        ));
        assert_eq!(text, "R&D teams <3 AI end");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("가나다라", 2), "가나");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(
            slugify("NotebookLM: Read 100 Papers (Fast)").as_deref(),
            Some("notebooklm-read-100-papers-fast")
        );
        assert_eq!(slugify("노트북LM 활용법"), None);
        let long = slugify(&"word ".repeat(30)).unwrap();
        assert!(long.len() <= 50);
        assert!(!long.ends_with('-'));
    }

    #[test]
    fn test_short_digest_is_stable() {
        assert_eq!(short_digest("keyword", 16), short_digest("keyword", 16));
        assert_eq!(short_digest("keyword", 8).len(), 8);
        assert_ne!(short_digest("a", 16), short_digest("b", 16));
    }

    #[test]
    fn test_contains_hangul() {
        assert!(contains_hangul("사무실 modern office"));
        assert!(!contains_hangul("modern office"));
    }
}
