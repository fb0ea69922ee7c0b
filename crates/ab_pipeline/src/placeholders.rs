//! Image markers embedded in generated HTML.
//!
//! Two forms are recognised: `[IMAGE:description]`, resolved from the image
//! cache, and `[IMAGE_PLACEHOLDER_n]`, filled with an image generated from the
//! text around the marker.

use std::collections::BTreeSet;

use ab_core::text::{collapse_whitespace, contains_hangul, strip_html_tags, truncate_chars};
use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::render::escape_html;

pub const DEFAULT_MAX_KEYWORDS: usize = 5;

/// Characters of text before a numbered marker used as its context.
pub const CONTEXT_CHARS: usize = 500;

/// Replacement for keywords written in Korean; image search and generation expect English.
pub const HANGUL_KEYWORD_FALLBACK: &str = "modern technology workspace";

lazy_static! {
    static ref IMAGE_KEYWORD: Regex = Regex::new(r"\[IMAGE:([^\]]+)\]").unwrap();
    static ref IMAGE_PLACEHOLDER: Regex = Regex::new(r"\[IMAGE_PLACEHOLDER_(\d+)\]").unwrap();
    static ref ANY_IMAGE_MARKER: Regex =
        Regex::new(r"\[IMAGE:[^\]]+\]|\[IMAGE_PLACEHOLDER_\d+\]").unwrap();
}

/// Keyword descriptions in order of appearance, trimmed, at most `max`.
pub fn extract_image_keywords(text: &str, max: usize) -> Vec<String> {
    IMAGE_KEYWORD
        .captures_iter(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|k| !k.is_empty())
        .take(max)
        .collect()
}

/// Placeholder numbers, ascending and without duplicates, whatever order they appear in.
pub fn extract_placeholder_numbers(text: &str) -> Vec<u32> {
    IMAGE_PLACEHOLDER
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn placeholder_marker(number: u32) -> String {
    format!("[IMAGE_PLACEHOLDER_{}]", number)
}

pub fn normalize_keyword(keyword: &str) -> String {
    let keyword = keyword.trim();
    if contains_hangul(keyword) {
        tracing::warn!("Korean image keyword '{}', using '{}'", keyword, HANGUL_KEYWORD_FALLBACK);
        HANGUL_KEYWORD_FALLBACK.to_string()
    } else {
        keyword.to_string()
    }
}

/// Replaces every `[IMAGE:...]` marker with `render(trimmed description)`.
pub fn replace_image_keywords<F>(text: &str, mut render: F) -> String
where
    F: FnMut(&str) -> String,
{
    IMAGE_KEYWORD
        .replace_all(text, |caps: &Captures| render(caps[1].trim()))
        .into_owned()
}

/// Replaces every `[IMAGE_PLACEHOLDER_n]` with `render(n)`. Unparseable numbers are left alone.
pub fn replace_placeholders<F>(text: &str, mut render: F) -> String
where
    F: FnMut(u32) -> String,
{
    IMAGE_PLACEHOLDER
        .replace_all(text, |caps: &Captures| match caps[1].parse::<u32>() {
            Ok(n) => render(n),
            Err(_) => caps[0].to_string(),
        })
        .into_owned()
}

/// Drops markers of either form.
pub fn strip_markers(text: &str) -> String {
    ANY_IMAGE_MARKER.replace_all(text, "").into_owned()
}

/// Plain text of up to `max_chars` characters preceding the first occurrence of `marker`.
pub fn context_before(text: &str, marker: &str, max_chars: usize) -> Option<String> {
    let pos = text.find(marker)?;
    let before = &text[..pos];
    let start = match max_chars {
        0 => pos,
        n => before
            .char_indices()
            .rev()
            .nth(n - 1)
            .map(|(i, _)| i)
            .unwrap_or(0),
    };
    Some(collapse_whitespace(&strip_html_tags(&before[start..])))
}

/// The block an image marker is replaced with.
pub fn render_figure(url: &str, alt: &str, caption: &str) -> String {
    format!(
        r#"
<div class="my-6 rounded-xl overflow-hidden shadow-lg">
    <img src="{}" alt="{}" class="w-full h-auto object-cover" loading="lazy" onerror="this.parentElement.style.display='none'">
    <p class="text-xs text-gray-400 text-center py-2 bg-gray-50">{}</p>
</div>
"#,
        escape_html(url),
        escape_html(truncate_chars(alt, 100)),
        escape_html(caption)
    )
}
