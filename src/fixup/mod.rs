//! Rewrites x.com links to fixupx.com so embeds work in Discord.

use fancy_regex::Regex;
use url::Url;

/// Matches X (formerly Twitter) URLs. Optional scheme, stops at whitespace
/// and angle brackets.
const X_LINK_PATTERN: &str = r"(?i)(?:https?://)?(?:www\.)?x\.com/[\w\-./?%&#=:+,;~]+";

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '"', '\''];

const REPLACEMENT_HOST: &str = "fixupx.com";

pub struct LinkRewriter {
    pattern: Regex,
}

impl LinkRewriter {
    pub fn new() -> Result<Self, fancy_regex::Error> {
        Ok(Self {
            pattern: Regex::new(X_LINK_PATTERN)?,
        })
    }

    /// Collect rewritten links for a message, deduplicated in order.
    ///
    /// Returns nothing when the message already carries a fixupx link, so
    /// the bot never replies to its own rewrites.
    pub fn rewrite_all(&self, content: &str) -> Vec<String> {
        if content.to_lowercase().contains(REPLACEMENT_HOST) {
            return Vec::new();
        }

        let mut replacements: Vec<String> = Vec::new();
        for found in self.pattern.find_iter(content).flatten() {
            if let Some(rewritten) = to_fixupx(found.as_str()) {
                if !replacements.contains(&rewritten) {
                    replacements.push(rewritten);
                }
            }
        }
        replacements
    }
}

/// Swap the domain for fixupx.com, preserving path, query and fragment.
fn to_fixupx(link: &str) -> Option<String> {
    let trimmed = link.trim_end_matches(TRAILING_PUNCTUATION);
    let normalized = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let mut parsed = Url::parse(&normalized).ok()?;
    parsed.set_host(Some(REPLACEMENT_HOST)).ok()?;
    Some(parsed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter() -> LinkRewriter {
        LinkRewriter::new().unwrap()
    }

    #[test]
    fn test_basic_rewrite() {
        let links = rewriter().rewrite_all("look https://x.com/user/status/123");
        assert_eq!(links, vec!["https://fixupx.com/user/status/123"]);
    }

    #[test]
    fn test_query_and_www_handled() {
        let links = rewriter().rewrite_all("https://www.x.com/user/status/123?s=20&t=abc");
        assert_eq!(links, vec!["https://fixupx.com/user/status/123?s=20&t=abc"]);
    }

    #[test]
    fn test_schemeless_link_gets_https() {
        let links = rewriter().rewrite_all("check x.com/user/status/456");
        assert_eq!(links, vec!["https://fixupx.com/user/status/456"]);
    }

    #[test]
    fn test_trailing_punctuation_stripped() {
        let links = rewriter().rewrite_all("see https://x.com/user/status/123!");
        assert_eq!(links, vec!["https://fixupx.com/user/status/123"]);
    }

    #[test]
    fn test_duplicates_removed_in_order() {
        let content =
            "https://x.com/a/status/1 then https://x.com/b/status/2 and https://x.com/a/status/1";
        let links = rewriter().rewrite_all(content);
        assert_eq!(
            links,
            vec![
                "https://fixupx.com/a/status/1",
                "https://fixupx.com/b/status/2"
            ]
        );
    }

    #[test]
    fn test_existing_fixupx_left_alone() {
        let links = rewriter().rewrite_all("already https://fixupx.com/user/status/123");
        assert!(links.is_empty());
    }

    #[test]
    fn test_plain_text_ignored() {
        assert!(rewriter().rewrite_all("no links here").is_empty());
        assert!(rewriter().rewrite_all("maxim.com/article is not x").is_empty());
    }
}
