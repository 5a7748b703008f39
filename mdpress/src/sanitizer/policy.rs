//! Whitelist policy for the sanitizer
//!
//! A policy names the tags that may appear in the output, the attributes
//! each tag may carry, and the URL schemes accepted in `href` and `src`.
//! The default policy covers everything the markdown renderer and the
//! built-in plugins emit.

use crate::url;
use std::collections::{HashMap, HashSet};

/// Tags allowed by the default policy
const DEFAULT_TAGS: [&str; 33] = [
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "br", "hr", "pre", "code", "blockquote", "ul", "ol",
    "li", "table", "thead", "tbody", "tr", "th", "td", "strong", "em", "del", "a", "img", "span",
    "div", "nav", "figure", "figcaption", "sup", "sub",
];

/// Presentational tags allowed by the default policy
const DEFAULT_INLINE_TAGS: [&str; 4] = ["b", "i", "u", "s"];

/// Per-tag attributes allowed by the default policy
const DEFAULT_ATTRIBUTES: [(&str, &[&str]); 18] = [
    ("h1", &["id"]),
    ("h2", &["id"]),
    ("h3", &["id"]),
    ("h4", &["id"]),
    ("h5", &["id"]),
    ("h6", &["id"]),
    ("pre", &["class"]),
    ("code", &["class"]),
    ("span", &["class"]),
    ("div", &["class"]),
    ("nav", &["class"]),
    ("ul", &["class"]),
    ("li", &["class"]),
    ("a", &["href", "title"]),
    ("img", &["src", "alt", "title"]),
    ("ol", &["start"]),
    ("th", &["align"]),
    ("td", &["align"]),
];

/// URL schemes allowed by the default policy
const DEFAULT_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

/// Which markup survives sanitization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizerPolicy {
    tags: HashSet<String>,
    attributes: HashMap<String, HashSet<String>>,
    schemes: HashSet<String>,
}

impl Default for SanitizerPolicy {
    fn default() -> Self {
        let mut policy = Self::empty()
            .allow_tags(DEFAULT_TAGS)
            .allow_tags(DEFAULT_INLINE_TAGS)
            .allow_schemes(DEFAULT_SCHEMES);
        for (tag, attributes) in DEFAULT_ATTRIBUTES {
            policy = policy.allow_attributes(tag, attributes.iter().copied());
        }
        policy
    }
}

impl SanitizerPolicy {
    /// A policy that allows nothing
    pub fn empty() -> Self {
        Self {
            tags: HashSet::new(),
            attributes: HashMap::new(),
            schemes: HashSet::new(),
        }
    }

    /// Allow additional tags
    pub fn allow_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags
            .extend(tags.into_iter().map(|t| t.as_ref().to_ascii_lowercase()));
        self
    }

    /// Allow additional attributes on one tag
    pub fn allow_attributes<I, S>(mut self, tag: &str, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.attributes
            .entry(tag.to_ascii_lowercase())
            .or_default()
            .extend(
                attributes
                    .into_iter()
                    .map(|a| a.as_ref().to_ascii_lowercase()),
            );
        self
    }

    /// Allow additional URL schemes (without the trailing colon)
    pub fn allow_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.schemes
            .extend(schemes.into_iter().map(|s| s.as_ref().to_ascii_lowercase()));
        self
    }

    /// Whether a tag may appear in the output
    pub fn allows_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Whether a tag may carry an attribute
    ///
    /// Event handler attributes (`on*`) are never allowed, whatever the
    /// configured whitelist says.
    pub fn allows_attribute(&self, tag: &str, attribute: &str) -> bool {
        if attribute.starts_with("on") {
            return false;
        }
        self.attributes
            .get(tag)
            .is_some_and(|allowed| allowed.contains(attribute))
    }

    /// Whether a URL may appear in `href` or `src`
    ///
    /// # Parameters
    /// * `value` - Attribute value as written, possibly entity-encoded
    /// * `image` - Whether the URL is an image source (`data:image/...` is then allowed)
    ///
    /// # Returns
    /// * `bool` - `true` for relative references and allowed schemes
    pub fn allows_url(&self, value: &str, image: bool) -> bool {
        let normalized = url::normalize(value);
        if url::is_script(&normalized) || url::is_protocol_relative(&normalized) {
            return false;
        }
        match url::scheme(&normalized) {
            Some("data") => image && url::is_image_data(&normalized),
            Some(scheme) => self.schemes.contains(scheme),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tags() {
        let policy = SanitizerPolicy::default();
        assert!(policy.allows_tag("p"));
        assert!(policy.allows_tag("figcaption"));
        assert!(!policy.allows_tag("script"));
        assert!(!policy.allows_tag("iframe"));
    }

    #[test]
    fn test_default_attributes() {
        let policy = SanitizerPolicy::default();
        assert!(policy.allows_attribute("a", "href"));
        assert!(policy.allows_attribute("h2", "id"));
        assert!(policy.allows_attribute("td", "align"));
        assert!(!policy.allows_attribute("p", "style"));
        assert!(!policy.allows_attribute("img", "onerror"));
    }

    #[test]
    fn test_event_handlers_never_allowed() {
        let policy = SanitizerPolicy::empty()
            .allow_tags(["div"])
            .allow_attributes("div", ["onclick", "class"]);
        assert!(!policy.allows_attribute("div", "onclick"));
        assert!(policy.allows_attribute("div", "class"));
    }

    #[test]
    fn test_urls() {
        let policy = SanitizerPolicy::default();
        assert!(policy.allows_url("https://example.com", false));
        assert!(policy.allows_url("docs/page.html", false));
        assert!(policy.allows_url("#top", false));
        assert!(policy.allows_url("mailto:a@example.com", false));
        assert!(!policy.allows_url("ftp://example.com", false));
        assert!(!policy.allows_url("//evil.example.com", false));
    }

    #[test]
    fn test_data_urls_only_for_images() {
        let policy = SanitizerPolicy::default();
        assert!(policy.allows_url("data:image/png;base64,AAAA", true));
        assert!(!policy.allows_url("data:image/png;base64,AAAA", false));
        assert!(!policy.allows_url("data:text/html,<b>", true));
    }

    #[test]
    fn test_obfuscated_script_urls() {
        let policy = SanitizerPolicy::default();
        assert!(!policy.allows_url("javascript:alert(1)", false));
        assert!(!policy.allows_url("JaVaScRiPt:alert(1)", false));
        assert!(!policy.allows_url("java\tscript:alert(1)", false));
        assert!(!policy.allows_url("&#106;avascript:alert(1)", false));
        assert!(!policy.allows_url("&#x6A;avascript:alert(1)", false));
        assert!(!policy.allows_url("&#106avascript:alert(1)", false));
        assert!(!policy.allows_url("javascript&colon;alert(1)", false));
        assert!(!policy.allows_url("java&Tab;script:alert(1)", false));
    }
}
