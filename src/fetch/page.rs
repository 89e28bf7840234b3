//! HTML to plain text
//!
//! Reduces a fetched page to readable text with a little markdown structure
//! (headings, list items, links) so the cleaning pass can treat it like any
//! other scraped content.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|svg|nav|header|footer|aside|form|iframe)\b[^>]*>.*?</\s*(script|style|noscript|svg|nav|header|footer|aside|form|iframe)\s*>").unwrap()
});
static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static HEAD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<head\b[^>]*>.*?</head\s*>").unwrap());
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h([1-6])\b[^>]*>(.*?)</h[1-6]\s*>").unwrap());
static ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a\s*>"#).unwrap()
});
static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<li\b[^>]*>").unwrap());
static BLOCK_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(br|/p|/div|/li|/ul|/ol|/tr|/table|/section|/article|/blockquote|/pre)\b[^>]*>").unwrap()
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());
static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").unwrap());
static INLINE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\r\f]+").unwrap());

/// Whether a Content-Type header value names a page we can reduce to text
pub fn is_textual(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.is_empty() || mime == "text/html" || mime == "application/xhtml+xml" || mime == "text/plain"
}

/// Convert an HTML document into text with light markdown structure
pub fn html_to_text(html: &str) -> String {
    let text = COMMENT.replace_all(html, "");
    let text = HEAD.replace_all(&text, "");
    let text = BOILERPLATE.replace_all(&text, "");

    let text = HEADING.replace_all(&text, |caps: &Captures| {
        let level = caps[1].parse::<usize>().unwrap_or(2);
        format!("\n\n{} {}\n\n", "#".repeat(level), strip_tags(&caps[2]))
    });
    let text = ANCHOR.replace_all(&text, |caps: &Captures| {
        let label = strip_tags(&caps[2]);
        if caps[1].starts_with("http") {
            format!("[{}]({})", label, &caps[1])
        } else {
            label
        }
    });
    let text = LIST_ITEM.replace_all(&text, "\n- ");
    let text = BLOCK_BREAK.replace_all(&text, "\n");
    let text = TAG.replace_all(&text, "");
    let text = decode_entities(&text);

    text.lines()
        .map(|line| INLINE_SPACE.replace_all(line, " ").trim().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_tags(fragment: &str) -> String {
    let text = TAG.replace_all(fragment, "");
    INLINE_SPACE
        .replace_all(&text.replace('\n', " "), " ")
        .trim()
        .to_string()
}

fn decode_entities(text: &str) -> String {
    let text = NUMERIC_ENTITY.replace_all(text, |caps: &Captures| {
        let raw = &caps[1];
        let code = match raw.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });

    // &amp; last so "&amp;lt;" stays literal
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&mdash;", "-")
        .replace("&ndash;", "-")
        .replace("&hellip;", "...")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_scripts_and_chrome() {
        let html = r#"<html><head><title>T</title><style>p{}</style></head>
            <body><nav><a href="https://x.example/home">Home</a></nav>
            <script>var a = "<p>no</p>";</script>
            <p>Kept paragraph.</p>
            <footer>Copyright</footer></body></html>"#;
        let text = html_to_text(html);
        assert!(text.contains("Kept paragraph."));
        assert!(!text.contains("Home"));
        assert!(!text.contains("var a"));
        assert!(!text.contains("Copyright"));
        assert!(!text.contains("<"));
    }

    #[test]
    fn test_keeps_structure() {
        let html = r#"<h2>Work <em>stealing</em></h2><ul><li>one</li><li>two</li></ul>
            <p>See <a href="https://tokio.rs/blog">the blog</a> or <a href="/local">here</a>.</p>"#;
        let text = html_to_text(html);
        assert!(text.contains("## Work stealing"));
        assert!(text.contains("- one\n"));
        assert!(text.contains("- two"));
        assert!(text.contains("[the blog](https://tokio.rs/blog)"));
        assert!(text.contains("or here."));
    }

    #[test]
    fn test_decodes_entities() {
        let text = html_to_text("<p>Fish &amp; chips &lt;3 &#8217;s &#x41;&nbsp;B &amp;lt;</p>");
        assert_eq!(text.trim(), "Fish & chips <3 \u{2019}s A B &lt;");
    }

    #[test]
    fn test_textual_content_types() {
        assert!(is_textual("text/html; charset=utf-8"));
        assert!(is_textual("application/xhtml+xml"));
        assert!(is_textual(""));
        assert!(!is_textual("application/pdf"));
        assert!(!is_textual("image/png"));
    }
}
