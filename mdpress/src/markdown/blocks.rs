//! Block-level markdown elements
//!
//! This module defines the structured representation produced by the block
//! parser and its rendering to HTML text. Text carried by blocks is still raw
//! span markup; the inline pass rewrites it after rendering.

use super::escape::escape_html;
use super::types::{Alignment, ListKind};
use itertools::Itertools;

/// Block-level markdown element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// An ATX heading
    Heading {
        /// Heading level (1 = h1, 2 = h2, etc.)
        level: usize,
        /// Raw heading text
        text: String,
        /// Identifier derived from the text
        id: String,
    },

    /// A paragraph holding one raw source line
    Paragraph(String),

    /// A fenced code block
    CodeBlock {
        /// Language tag from the opening fence (e.g., "rust", "python")
        language: Option<String>,
        /// Code lines, already HTML-escaped
        lines: Vec<String>,
    },

    /// Contiguous `>` lines merged into one paragraph
    BlockQuote(String),

    /// A flat ordered or unordered list
    List {
        /// Ordered or unordered
        kind: ListKind,
        /// Raw text of each item
        items: Vec<String>,
    },

    /// A pipe table
    Table {
        /// Column alignments from the delimiter row
        alignments: Vec<Alignment>,
        /// Header cells
        headers: Vec<String>,
        /// Body rows, each a list of cells
        rows: Vec<Vec<String>>,
    },

    /// A thematic break
    Rule,

    /// A raw HTML line passed through untouched
    Html(String),
}

impl Block {
    /// Render the block to an HTML string
    pub fn render(&self) -> String {
        match self {
            Block::Heading { level, text, id } => {
                format!("<h{level} id=\"{}\">{text}</h{level}>", escape_html(id))
            }

            Block::Paragraph(text) => format!("<p>{}</p>", text),

            Block::CodeBlock { language, lines } => match language {
                Some(lang) => format!(
                    "<pre><code class=\"language-{}\">{}</code></pre>",
                    escape_html(lang),
                    lines.join("\n")
                ),
                None => format!("<pre><code>{}</code></pre>", lines.join("\n")),
            },

            Block::BlockQuote(text) => format!("<blockquote><p>{}</p></blockquote>", text),

            Block::List { kind, items } => render_list(*kind, items),

            Block::Table {
                alignments,
                headers,
                rows,
            } => render_table(alignments, headers, rows),

            Block::Rule => "<hr>".to_string(),

            Block::Html(html) => html.clone(),
        }
    }
}

/// Render a list with one item per line
fn render_list(kind: ListKind, items: &[String]) -> String {
    let (open, close) = match kind {
        ListKind::Unordered => ("<ul>".to_string(), "</ul>"),
        ListKind::Ordered { start: 1 } => ("<ol>".to_string(), "</ol>"),
        ListKind::Ordered { start } => (format!("<ol start=\"{}\">", start), "</ol>"),
    };

    let body = items
        .iter()
        .map(|item| format!("<li>{}</li>\n", item))
        .join("");

    format!("{}\n{}{}", open, body, close)
}

/// Render a table with a header row and an optional body
fn render_table(alignments: &[Alignment], headers: &[String], rows: &[Vec<String>]) -> String {
    let mut output = String::from("<table>\n<thead>\n");
    output.push_str(&render_row("th", alignments, headers));
    output.push_str("</thead>\n");

    if !rows.is_empty() {
        output.push_str("<tbody>\n");
        for row in rows {
            output.push_str(&render_row("td", alignments, row));
        }
        output.push_str("</tbody>\n");
    }

    output.push_str("</table>");
    output
}

/// Render one table row; cells beyond the known alignments are unaligned
fn render_row(tag: &str, alignments: &[Alignment], cells: &[String]) -> String {
    let cells = cells
        .iter()
        .enumerate()
        .map(|(index, cell)| {
            let align = alignments
                .get(index)
                .and_then(|a| a.as_attribute())
                .map(|a| format!(" align=\"{}\"", a))
                .unwrap_or_default();
            format!("<{tag}{align}>{cell}</{tag}>")
        })
        .join("");

    format!("<tr>{}</tr>\n", cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_heading() {
        let block = Block::Heading {
            level: 2,
            text: "Getting Started".to_string(),
            id: "getting-started".to_string(),
        };
        assert_eq!(
            block.render(),
            "<h2 id=\"getting-started\">Getting Started</h2>"
        );
    }

    #[test]
    fn test_render_code_block() {
        let block = Block::CodeBlock {
            language: Some("rust".to_string()),
            lines: vec!["fn main() {".to_string(), "}".to_string()],
        };
        assert_eq!(
            block.render(),
            "<pre><code class=\"language-rust\">fn main() {\n}</code></pre>"
        );

        let plain = Block::CodeBlock {
            language: None,
            lines: vec!["x".to_string()],
        };
        assert_eq!(plain.render(), "<pre><code>x</code></pre>");
    }

    #[test]
    fn test_render_ordered_list_with_start() {
        let block = Block::List {
            kind: ListKind::Ordered { start: 3 },
            items: vec!["three".to_string(), "four".to_string()],
        };
        assert_eq!(
            block.render(),
            "<ol start=\"3\">\n<li>three</li>\n<li>four</li>\n</ol>"
        );
    }

    #[test]
    fn test_render_table_with_alignment() {
        let block = Block::Table {
            alignments: vec![Alignment::Left, Alignment::None],
            headers: vec!["A".to_string(), "B".to_string()],
            rows: vec![vec!["1".to_string(), "2".to_string()]],
        };
        assert_eq!(
            block.render(),
            "<table>\n<thead>\n<tr><th align=\"left\">A</th><th>B</th></tr>\n</thead>\n\
             <tbody>\n<tr><td align=\"left\">1</td><td>2</td></tr>\n</tbody>\n</table>"
        );
    }

    #[test]
    fn test_render_table_without_body() {
        let block = Block::Table {
            alignments: vec![Alignment::None],
            headers: vec!["Only".to_string()],
            rows: Vec::new(),
        };
        assert_eq!(
            block.render(),
            "<table>\n<thead>\n<tr><th>Only</th></tr>\n</thead>\n</table>"
        );
    }
}
