//! Fetched Content Cleaning
//!
//! URL eligibility checks and text cleanup applied to pages before they are
//! attached to research findings.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::constants::fetch::DOCUMENT_EXTENSIONS;

static MARKDOWN_IMAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[.*?\]\(.*?\)").unwrap());
static HTML_IMAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<img .*?>").unwrap());
static LINK_TARGET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(http[^)]*\)").unwrap());
static EMPTY_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\s*\]\(\)").unwrap());
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{2,}").unwrap());

/// Strip images and link targets, drop empty links, collapse blank lines
pub fn clean_content(raw: &str) -> String {
    let text = MARKDOWN_IMAGE.replace_all(raw, "");
    let text = HTML_IMAGE.replace_all(&text, "");
    let text = LINK_TARGET.replace_all(&text, "()");
    let text = EMPTY_LINK.replace_all(&text, "");
    let text = BLANK_LINES.replace_all(&text, "\n");
    text.trim().to_string()
}

/// Whether a finding URL should be fetched: http(s) and not a document download
pub fn is_fetchable_url(raw: &str) -> bool {
    let Ok(url) = Url::parse(raw.trim()) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return false;
    }

    let path = url.path().to_ascii_lowercase();
    if path.contains(".pdf") {
        return false;
    }
    !DOCUMENT_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Cleaned content if it is long enough to be worth keeping
pub fn usable_content(raw: &str, min_chars: usize, max_chars: usize) -> Option<String> {
    let cleaned = clean_content(raw);
    if cleaned.chars().count() <= min_chars {
        return None;
    }
    if cleaned.chars().count() > max_chars {
        return Some(cleaned.chars().take(max_chars).collect());
    }
    Some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_strips_images_and_links() {
        let raw = "Intro ![logo](https://x/y.png) text <img src=\"a.png\"> more\n\n\n[see](https://example.com) and [ ](https://e.com)\n";
        let cleaned = clean_content(raw);
        assert_eq!(cleaned, "Intro  text  more\n[see]() and");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(clean_content("a\n\n\n\nb\n\nc"), "a\nb\nc");
    }

    #[test]
    fn test_fetchable_urls() {
        assert!(is_fetchable_url("https://example.com/article"));
        assert!(is_fetchable_url("http://example.com/page?file=report.pdf"));
        assert!(!is_fetchable_url("https://example.com/report.PDF"));
        assert!(!is_fetchable_url("https://example.com/files/report.pdf/view"));
        assert!(!is_fetchable_url("https://example.com/deck.pptx"));
        assert!(!is_fetchable_url("https://example.com/sheet.xls"));
        assert!(!is_fetchable_url("ftp://example.com/readme"));
        assert!(!is_fetchable_url("not a url"));
    }

    #[test]
    fn test_usable_content_threshold() {
        assert!(usable_content(&"x".repeat(100), 100, 1000).is_none());
        assert_eq!(usable_content(&"x".repeat(101), 100, 1000).unwrap().len(), 101);
        assert_eq!(usable_content(&"x".repeat(500), 100, 200).unwrap().len(), 200);
    }
}
