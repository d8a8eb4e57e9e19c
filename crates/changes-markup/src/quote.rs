//! Text quoting: entity escaping followed by hyperlink and issue-reference
//! rewriting.
//!
//! Escaping must run first. The rewriting steps inject `<a>` elements that
//! would otherwise be escaped into literal text.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"]*"#).expect("url pattern compiles"));

/// The keyword must start a word, so `debug 12` is left alone.
static ISSUE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?P<keyword>[Bb]ug|[Rr]equest)\s+(?P<number>#?\d+)")
        .expect("issue reference pattern compiles")
});

/// Issue numbers with at least this many digits use the long-form tracker.
pub const LONG_FORM_DIGITS: usize = 6;
/// Issue numbers with at most this many digits use the short-form tracker.
pub const SHORT_FORM_DIGITS: usize = 5;

/// URL templates for issue references. `{id}` is replaced by the number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerLinks {
    pub bug_long: String,
    pub bug_short: String,
    pub request_long: String,
    pub request_short: String,
}

impl Default for TrackerLinks {
    fn default() -> Self {
        Self {
            bug_long: "http://sourceforge.net/tracker/index.php?func=detail&aid={id}&group_id=18598&atid=118598".into(),
            bug_short: "http://sourceforge.net/p/grinder/bugs/{id}".into(),
            request_long: "http://sourceforge.net/tracker/index.php?func=detail&aid={id}&group_id=18598&atid=368598".into(),
            request_short: "http://sourceforge.net/p/grinder/feature-requests/{id}".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOptions {
    /// Wrap bare URLs in `<a>` elements.
    pub hyperlinks: bool,
    pub trackers: TrackerLinks,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            hyperlinks: true,
            trackers: TrackerLinks::default(),
        }
    }
}

/// Entity-escapes `&`, `<` and `>`, ampersand first.
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Inverse of [`escape`].
pub fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Rewrites URLs and issue references in already escaped text.
pub fn link(escaped: &str, options: &LinkOptions) -> String {
    let text = if options.hyperlinks {
        URL_PATTERN
            .replace_all(escaped, |caps: &Captures| {
                format!("<a href=\"{0}\">{0}</a>", &caps[0])
            })
            .into_owned()
    } else {
        escaped.to_string()
    };

    ISSUE_PATTERN
        .replace_all(&text, |caps: &Captures| {
            issue_link(caps, &options.trackers).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Full quoting of one raw line: escape, then link.
pub fn quote(line: &str, options: &LinkOptions) -> String {
    link(&escape(line), options)
}

fn issue_link(caps: &Captures, trackers: &TrackerLinks) -> Option<String> {
    let keyword = &caps["keyword"];
    let number = &caps["number"];
    let digits = number.trim_start_matches('#');
    let hashed = digits.len() != number.len();
    let is_bug = keyword.eq_ignore_ascii_case("bug");

    let template = if !hashed && digits.len() >= LONG_FORM_DIGITS {
        if is_bug {
            &trackers.bug_long
        } else {
            &trackers.request_long
        }
    } else if digits.len() <= SHORT_FORM_DIGITS {
        if is_bug {
            &trackers.bug_short
        } else {
            &trackers.request_short
        }
    } else {
        return None;
    };

    let href = escape(&template.replace("{id}", digits));
    Some(format!("<a href=\"{href}\">{keyword} {number}</a>"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links() -> LinkOptions {
        LinkOptions::default()
    }

    #[test]
    fn escapes_ampersand_before_angle_brackets() {
        assert_eq!(escape("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
        assert_eq!(escape("&lt;"), "&amp;lt;");
    }

    #[test]
    fn unescape_reverses_escape() {
        for text in ["R&D <b> &amp; >>", "plain", "&&<<>>", "&lt;literal&gt;"] {
            assert_eq!(unescape(&escape(text)), text);
        }
    }

    #[test]
    fn wraps_bare_urls() {
        assert_eq!(
            quote("see http://grinder.sf.net/ now", &links()),
            "see <a href=\"http://grinder.sf.net/\">http://grinder.sf.net/</a> now"
        );
    }

    #[test]
    fn url_wrapping_can_be_disabled() {
        let options = LinkOptions {
            hyperlinks: false,
            ..LinkOptions::default()
        };
        assert_eq!(quote("http://example.com", &options), "http://example.com");
    }

    #[test]
    fn short_bug_numbers_use_short_tracker() {
        assert_eq!(
            quote("Fixed Bug 12345.", &links()),
            "Fixed <a href=\"http://sourceforge.net/p/grinder/bugs/12345\">Bug 12345</a>."
        );
    }

    #[test]
    fn long_bug_numbers_use_long_tracker() {
        assert_eq!(
            quote("bug  1234567", &links()),
            "<a href=\"http://sourceforge.net/tracker/index.php?func=detail&amp;aid=1234567&amp;group_id=18598&amp;atid=118598\">bug 1234567</a>"
        );
    }

    #[test]
    fn hashed_request_keeps_hash_in_text_only() {
        assert_eq!(
            quote("Request #42", &links()),
            "<a href=\"http://sourceforge.net/p/grinder/feature-requests/42\">Request #42</a>"
        );
    }

    #[test]
    fn hashed_long_numbers_are_left_alone() {
        assert_eq!(quote("bug #1234567", &links()), "bug #1234567");
    }

    #[test]
    fn keyword_inside_a_word_is_not_a_reference() {
        assert_eq!(quote("debug 12", &links()), "debug 12");
    }

    #[test]
    fn injected_markup_is_not_escaped() {
        let quoted = quote("x < y, bug 7", &links());
        assert!(quoted.starts_with("x &lt; y, <a href="));
    }
}
