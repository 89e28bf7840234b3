//! Run Identifier
//!
//! Deterministic, key-safe slug derived from an article title. All checkpoints
//! of one execution are scoped by it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::article::{FALLBACK_RUN_ID, MAX_RUN_ID_LEN};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Slug a title: lowercase ASCII alphanumerics joined by single dashes
    pub fn from_title(title: &str) -> Self {
        let mut slug = String::with_capacity(title.len().min(MAX_RUN_ID_LEN));
        let mut pending_dash = false;

        for c in title.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_dash && !slug.is_empty() {
                    if slug.len() + 1 >= MAX_RUN_ID_LEN {
                        break;
                    }
                    slug.push('-');
                }
                pending_dash = false;
                if slug.len() >= MAX_RUN_ID_LEN {
                    break;
                }
                slug.push(c.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }

        if slug.is_empty() {
            Self(FALLBACK_RUN_ID.to_string())
        } else {
            Self(slug)
        }
    }

    /// Wrap an existing slug, rejecting anything that is not key-safe
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_RUN_ID_LEN
            && !raw.starts_with('-')
            && !raw.ends_with('-')
            && !raw.contains("--")
            && raw
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for RunId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_basic_slug() {
        assert_eq!(
            RunId::from_title("Async Rust: A Field Guide!").as_str(),
            "async-rust-a-field-guide"
        );
        assert_eq!(RunId::from_title("  --hello   world--  ").as_str(), "hello-world");
    }

    #[test]
    fn test_unicode_folds_to_separator() {
        assert_eq!(RunId::from_title("café crème").as_str(), "caf-cr-me");
        assert_eq!(RunId::from_title("日本語").as_str(), "untitled");
        assert_eq!(RunId::from_title("").as_str(), "untitled");
    }

    #[test]
    fn test_parse() {
        assert!(RunId::parse("rust-guide").is_some());
        assert!(RunId::parse("Rust").is_none());
        assert!(RunId::parse("../etc").is_none());
        assert!(RunId::parse("a--b").is_none());
        assert!(RunId::parse("").is_none());
    }

    proptest! {
        #[test]
        fn slug_is_key_safe(title in ".{0,200}") {
            let id = RunId::from_title(&title);
            prop_assert!(!id.as_str().is_empty());
            prop_assert!(id.as_str().len() <= MAX_RUN_ID_LEN);
            prop_assert!(RunId::parse(id.as_str()).is_some());
        }

        #[test]
        fn slug_is_deterministic(title in ".{0,120}") {
            prop_assert_eq!(RunId::from_title(&title), RunId::from_title(&title));
        }

        #[test]
        fn slug_is_idempotent(title in "[a-zA-Z0-9 _.-]{1,120}") {
            let once = RunId::from_title(&title);
            let twice = RunId::from_title(once.as_str());
            prop_assert_eq!(once, twice);
        }
    }
}
