//! Arena-backed HTML tree
//!
//! Nodes live in a single `Vec` and refer to each other by [`NodeId`]. The
//! tree is built from a token stream with an explicit stack of open
//! elements, and serialized back to text without recursion, so depth of the
//! input never translates into depth of the call stack.

use super::tokenizer::{tokenize, Attribute, Token, RAW_TEXT_ELEMENTS};

/// Elements that never have content or an end tag
pub const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Index of a node in the arena
pub type NodeId = usize;

/// The document root; it holds the top-level nodes
pub const ROOT: NodeId = 0;

/// What a node is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The synthetic document root
    Root,
    /// An element with lowercased name
    Element {
        name: String,
        attributes: Vec<Attribute>,
    },
    /// Character data as written in the source
    Text(String),
    /// A comment body
    Comment(String),
    /// Doctype, processing instruction or other declaration
    Declaration(String),
}

/// A node and its links
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<NodeId>,
}

/// A parsed HTML fragment
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Parse an HTML fragment
    ///
    /// Unmatched end tags are ignored. An end tag closes every element
    /// opened after its matching start tag. Elements left open at the end
    /// of the input are closed implicitly.
    pub fn parse(html: &str) -> Self {
        let mut tree = Tree {
            nodes: vec![Node {
                kind: NodeKind::Root,
                children: Vec::new(),
            }],
        };
        let mut open: Vec<(NodeId, String)> = Vec::new();

        for token in tokenize(html) {
            let parent = open.last().map_or(ROOT, |(id, _)| *id);
            match token {
                Token::StartTag {
                    name,
                    attributes,
                    self_closing,
                } => {
                    let void = VOID_ELEMENTS.contains(&name.as_str());
                    let id = tree.push(
                        parent,
                        NodeKind::Element {
                            name: name.clone(),
                            attributes,
                        },
                    );
                    if !void && !self_closing {
                        open.push((id, name));
                    }
                }
                Token::EndTag { name } => {
                    if let Some(position) = open.iter().rposition(|(_, open_name)| *open_name == name)
                    {
                        open.truncate(position);
                    }
                }
                Token::Text(text) => {
                    tree.push(parent, NodeKind::Text(text));
                }
                Token::Comment(text) => {
                    tree.push(parent, NodeKind::Comment(text));
                }
                Token::Declaration(text) => {
                    tree.push(parent, NodeKind::Declaration(text));
                }
            }
        }

        tree
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    /// Access a node
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Children of a node
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// Mutable attribute list of an element, if the node is one
    pub fn attributes_mut(&mut self, id: NodeId) -> Option<&mut Vec<Attribute>> {
        match &mut self.nodes[id].kind {
            NodeKind::Element { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    /// Detach the child at `index` of `parent` together with its subtree
    pub fn remove_child(&mut self, parent: NodeId, index: usize) {
        self.nodes[parent].children.remove(index);
    }

    /// Replace the child at `index` of `parent` with its own children
    ///
    /// The promoted children take the removed node's place, in order, so
    /// the next node to visit is the first of them.
    pub fn unwrap_child(&mut self, parent: NodeId, index: usize) {
        let child = self.nodes[parent].children[index];
        let grandchildren = std::mem::take(&mut self.nodes[child].children);
        self.nodes[parent]
            .children
            .splice(index..=index, grandchildren);
    }

    /// Serialize the tree back to HTML
    pub fn to_html(&self) -> String {
        enum Step {
            Open(NodeId, NodeId),
            Close(NodeId),
        }

        let mut output = String::new();
        let mut stack: Vec<Step> = self.nodes[ROOT]
            .children
            .iter()
            .rev()
            .map(|&id| Step::Open(id, ROOT))
            .collect();

        while let Some(step) = stack.pop() {
            match step {
                Step::Close(id) => {
                    if let NodeKind::Element { name, .. } = &self.nodes[id].kind {
                        output.push_str("</");
                        output.push_str(name);
                        output.push('>');
                    }
                }
                Step::Open(id, parent) => match &self.nodes[id].kind {
                    NodeKind::Root => {}
                    NodeKind::Text(text) => {
                        if self.is_raw_text_element(parent) {
                            output.push_str(text);
                        } else {
                            push_escaped(&mut output, text, false);
                        }
                    }
                    NodeKind::Comment(text) => {
                        output.push_str("<!--");
                        output.push_str(text);
                        output.push_str("-->");
                    }
                    NodeKind::Declaration(text) => output.push_str(text),
                    NodeKind::Element { name, attributes } => {
                        output.push('<');
                        output.push_str(name);
                        for attribute in attributes {
                            output.push(' ');
                            output.push_str(&attribute.name);
                            output.push_str("=\"");
                            push_escaped(&mut output, &attribute.value, true);
                            output.push('"');
                        }
                        output.push('>');

                        if !VOID_ELEMENTS.contains(&name.as_str()) {
                            stack.push(Step::Close(id));
                            stack.extend(
                                self.nodes[id]
                                    .children
                                    .iter()
                                    .rev()
                                    .map(|&child| Step::Open(child, id)),
                            );
                        }
                    }
                },
            }
        }

        output
    }

    fn is_raw_text_element(&self, id: NodeId) -> bool {
        matches!(
            &self.nodes[id].kind,
            NodeKind::Element { name, .. } if RAW_TEXT_ELEMENTS.contains(&name.as_str())
        )
    }
}

/// Escape text for output, leaving existing character references intact
fn push_escaped(output: &mut String, text: &str, attribute: bool) {
    for (index, c) in text.char_indices() {
        match c {
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' if attribute => output.push_str("&quot;"),
            '&' if !starts_with_reference(&text[index..]) => output.push_str("&amp;"),
            _ => output.push(c),
        }
    }
}

/// Whether `text` begins with a character reference such as `&amp;` or `&#39;`
fn starts_with_reference(text: &str) -> bool {
    let Some(body) = text.strip_prefix('&') else {
        return false;
    };
    let Some(end) = body.find(';') else {
        return false;
    };
    let name = &body[..end];
    if let Some(number) = name.strip_prefix('#') {
        return match number.strip_prefix(['x', 'X']) {
            Some(hex) => !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()),
            None => !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()),
        };
    }
    !name.is_empty() && name.len() <= 32 && name.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_trip_well_formed() {
        let html = "<p class=\"x\">Hi <strong>there</strong><br></p>";
        assert_eq!(Tree::parse(html).to_html(), html);
    }

    #[test]
    fn test_unclosed_elements_are_closed() {
        assert_eq!(
            Tree::parse("<div><p>text").to_html(),
            "<div><p>text</p></div>"
        );
    }

    #[test]
    fn test_stray_end_tag_ignored() {
        assert_eq!(Tree::parse("a</span>b").to_html(), "ab");
    }

    #[test]
    fn test_end_tag_closes_nested_elements() {
        assert_eq!(
            Tree::parse("<div><b>x</div>y").to_html(),
            "<div><b>x</b></div>y"
        );
    }

    #[test]
    fn test_text_escaping_keeps_entities() {
        assert_eq!(
            Tree::parse("a < b &amp; c & d").to_html(),
            "a &lt; b &amp; c &amp; d"
        );
    }

    #[test]
    fn test_attribute_escaping() {
        assert_eq!(
            Tree::parse("<a title='say \"hi\"'>x</a>").to_html(),
            "<a title=\"say &quot;hi&quot;\">x</a>"
        );
    }

    #[test]
    fn test_unwrap_child_promotes_in_place() {
        // Arrange
        let mut tree = Tree::parse("<p>a<span>b<i>c</i></span>d</p>");
        let paragraph = tree.children(ROOT)[0];

        // Act
        tree.unwrap_child(paragraph, 1);

        // Assert
        assert_eq!(tree.to_html(), "<p>ab<i>c</i>d</p>");
    }

    #[test]
    fn test_deep_nesting_serializes() {
        let depth = 20_000;
        let html = format!("{}x{}", "<div>".repeat(depth), "</div>".repeat(depth));
        assert_eq!(Tree::parse(&html).to_html(), html);
    }
}
