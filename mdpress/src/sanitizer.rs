//! Whitelist HTML sanitizer
//!
//! The sanitizer parses HTML into a tree, removes everything its
//! [`SanitizerPolicy`] does not explicitly allow, and serializes the result.
//! Disallowed elements are unwrapped so their text survives; comments and
//! declarations are dropped; attributes are filtered per tag, event handlers
//! are always removed, and `href`/`src` values must pass URL validation.
//!
//! Output of [`Sanitizer::sanitize`] is a fixed point: sanitizing it again
//! with the same policy returns it unchanged.

mod dom;
mod policy;
mod tokenizer;

pub use dom::{NodeId, NodeKind, Tree, ROOT};
pub use policy::SanitizerPolicy;
pub use tokenizer::{tokenize, Attribute, Token};

/// Attributes that carry URLs
const URL_ATTRIBUTES: [&str; 2] = ["href", "src"];

/// Whitelist sanitizer with an immutable policy
#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    policy: SanitizerPolicy,
}

impl Sanitizer {
    /// Create a sanitizer for a policy
    pub fn new(policy: SanitizerPolicy) -> Self {
        Self { policy }
    }

    /// The policy in effect
    pub fn policy(&self) -> &SanitizerPolicy {
        &self.policy
    }

    /// Sanitize an HTML fragment
    ///
    /// # Parameters
    /// * `html` - Arbitrary, possibly malformed HTML
    ///
    /// # Returns
    /// * `String` - HTML containing only allowed tags, attributes and URLs
    pub fn sanitize(&self, html: &str) -> String {
        if html.is_empty() {
            return String::new();
        }

        let mut tree = Tree::parse(html);
        let stats = self.clean(&mut tree);
        if stats.unwrapped + stats.removed + stats.attributes > 0 {
            log::debug!(
                "Sanitizer unwrapped {} elements, removed {} nodes and {} attributes",
                stats.unwrapped,
                stats.removed,
                stats.attributes
            );
        }
        tree.to_html()
    }

    /// Walk the tree depth-first and apply the policy in place
    fn clean(&self, tree: &mut Tree) -> CleanStats {
        let mut stats = CleanStats::default();
        let mut pending = vec![ROOT];

        while let Some(parent) = pending.pop() {
            let mut index = 0;
            while index < tree.children(parent).len() {
                let child = tree.children(parent)[index];
                match &tree.node(child).kind {
                    NodeKind::Text(_) => index += 1,
                    NodeKind::Element { name, .. } if !self.policy.allows_tag(name) => {
                        // The first promoted child now sits at `index`
                        tree.unwrap_child(parent, index);
                        stats.unwrapped += 1;
                    }
                    NodeKind::Element { name, .. } => {
                        let name = name.clone();
                        stats.attributes += self.clean_attributes(tree, child, &name);
                        pending.push(child);
                        index += 1;
                    }
                    NodeKind::Comment(_) | NodeKind::Declaration(_) | NodeKind::Root => {
                        tree.remove_child(parent, index);
                        stats.removed += 1;
                    }
                }
            }
        }

        stats
    }

    /// Drop attributes the policy rejects; returns how many were removed
    fn clean_attributes(&self, tree: &mut Tree, id: NodeId, tag: &str) -> usize {
        let Some(attributes) = tree.attributes_mut(id) else {
            return 0;
        };

        let before = attributes.len();
        attributes.retain(|attribute| {
            if !self.policy.allows_attribute(tag, &attribute.name) {
                return false;
            }
            if URL_ATTRIBUTES.contains(&attribute.name.as_str()) {
                let image = attribute.name == "src";
                if !self.policy.allows_url(&attribute.value, image) {
                    log::debug!("Removed unsafe {} on <{}>", attribute.name, tag);
                    return false;
                }
            }
            true
        });
        before - attributes.len()
    }
}

#[derive(Debug, Default)]
struct CleanStats {
    unwrapped: usize,
    removed: usize,
    attributes: usize,
}

/// Sanitize with the default policy
pub fn sanitize(html: &str) -> String {
    Sanitizer::default().sanitize(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_input() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("  \n "), "  \n ");
    }

    #[test]
    fn test_event_handlers_removed() {
        assert_eq!(sanitize("<div onclick=\"x\">y</div>"), "<div>y</div>");
        assert_eq!(
            sanitize("<img src=\"a.png\" onerror=\"alert(1)\" alt=\"A\">"),
            "<img src=\"a.png\" alt=\"A\">"
        );
    }

    #[test]
    fn test_disallowed_tags_unwrapped() {
        assert_eq!(
            sanitize("<p>a<font color=\"red\">b<em>c</em></font>d</p>"),
            "<p>ab<em>c</em>d</p>"
        );
    }

    #[test]
    fn test_nested_disallowed_tags_unwrapped() {
        // Arrange
        let html = "<section><article><p>kept</p></article></section>";

        // Act
        let clean = sanitize(html);

        // Assert
        assert_eq!(clean, "<p>kept</p>");
    }

    #[test]
    fn test_script_becomes_inert_text() {
        assert_eq!(
            sanitize("<p>x<script>alert('<b>')</script></p>"),
            "<p>xalert('&lt;b&gt;')</p>"
        );
    }

    #[test]
    fn test_comments_and_doctype_removed() {
        assert_eq!(
            sanitize("<!DOCTYPE html><!-- note --><p>a</p>"),
            "<p>a</p>"
        );
    }

    #[test]
    fn test_unsafe_urls_removed() {
        assert_eq!(
            sanitize("<a href=\"javascript:alert(1)\">x</a>"),
            "<a>x</a>"
        );
        assert_eq!(
            sanitize("<a href=\"&#106;avascript:alert(1)\">x</a>"),
            "<a>x</a>"
        );
        assert_eq!(sanitize("<a href=\"//evil.example\">x</a>"), "<a>x</a>");
        assert_eq!(
            sanitize("<img src=\"data:text/html;base64,AAAA\">"),
            "<img>"
        );
    }

    #[test]
    fn test_safe_urls_kept() {
        let html = "<a href=\"https://example.com\" title=\"t\">x</a>\
                    <a href=\"#intro\">y</a>\
                    <img src=\"data:image/png;base64,AAAA\" alt=\"\">";
        assert_eq!(sanitize(html), html);
    }

    #[test]
    fn test_disallowed_attributes_removed() {
        assert_eq!(
            sanitize("<p style=\"color:red\" class=\"x\">t</p>"),
            "<p>t</p>"
        );
        assert_eq!(
            sanitize("<pre><code class=\"language-rust\">x</code></pre>"),
            "<pre><code class=\"language-rust\">x</code></pre>"
        );
    }

    #[test]
    fn test_text_preserved() {
        assert_eq!(
            sanitize("<p>1 &lt; 2 &amp;&amp; 3 > 2</p>"),
            "<p>1 &lt; 2 &amp;&amp; 3 &gt; 2</p>"
        );
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "<div onclick=\"x\">y</div>",
            "<p>a<script>b<c</script>d</p>",
            "<a href='java&#x09;script:x' title=\"q&quot;\">l</a>",
            "<ul><li>one<li>two</ul><!-- c -->",
            "text & more < less",
            "<table><tr><td align=\"left\">1</td></tr></table>",
            "</p>\n",
            " <!--",
            "<script></script>\t",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "input: {}", input);
        }
    }

    #[test]
    fn test_custom_policy() {
        // Arrange
        let policy = SanitizerPolicy::empty()
            .allow_tags(["a", "iframe"])
            .allow_attributes("a", ["href"])
            .allow_schemes(["ftp"]);
        let sanitizer = Sanitizer::new(policy);

        // Act
        let clean = sanitizer.sanitize("<iframe></iframe><a href=\"ftp://x\">f</a><p>p</p>");

        // Assert
        assert_eq!(clean, "<iframe></iframe><a href=\"ftp://x\">f</a>p");
    }

    #[test]
    fn test_deeply_nested_input() {
        let depth = 50_000;
        let html = format!("{}x{}", "<span><font>".repeat(depth), "</font></span>".repeat(depth));
        let expected = format!("{}x{}", "<span>".repeat(depth), "</span>".repeat(depth));
        assert_eq!(sanitize(&html), expected);
    }
}
