//! Line-oriented block parser
//!
//! The parser makes a single forward pass over the source lines. At every
//! position it tries the block detectors in a fixed priority order; the
//! first detector that recognizes the line returns the block together with
//! the number of lines it consumed. A non-blank line no detector claims
//! becomes a paragraph, and blank lines produce nothing.

use super::blocks::Block;
use super::escape::escape_html;
use super::slug::slugify;
use super::types::{Alignment, ListKind};
use itertools::Itertools;

/// Block-level tags that mark a line as raw HTML
const HTML_BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "details",
    "dialog",
    "div",
    "dl",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "iframe",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "script",
    "section",
    "style",
    "summary",
    "table",
    "ul",
];

/// Longest run of digits accepted as an ordered list number
const MAX_LIST_NUMBER_DIGITS: usize = 9;

/// Result of a detector: the block and how many lines it consumed
type Detection = Option<(Block, usize)>;

/// Block construct detectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Detector {
    FencedCode,
    Heading,
    ThematicBreak,
    BlockQuote,
    UnorderedList,
    OrderedList,
    Table,
    RawHtml,
}

impl Detector {
    /// Detectors in the order they are tried at each line
    const PRIORITY: [Detector; 8] = [
        Detector::FencedCode,
        Detector::Heading,
        Detector::ThematicBreak,
        Detector::BlockQuote,
        Detector::UnorderedList,
        Detector::OrderedList,
        Detector::Table,
        Detector::RawHtml,
    ];

    /// Try to recognize a construct starting at `index`
    fn detect(self, lines: &[&str], index: usize) -> Detection {
        match self {
            Detector::FencedCode => detect_fenced_code(lines, index),
            Detector::Heading => detect_heading(lines[index]),
            Detector::ThematicBreak => detect_thematic_break(lines[index]),
            Detector::BlockQuote => detect_blockquote(lines, index),
            Detector::UnorderedList => detect_unordered_list(lines, index),
            Detector::OrderedList => detect_ordered_list(lines, index),
            Detector::Table => detect_table(lines, index),
            Detector::RawHtml => detect_raw_html(lines[index]),
        }
    }
}

/// Parse markdown text into block-level HTML
///
/// # Parameters
/// * `text` - Raw markdown source
///
/// # Returns
/// * `String` - Rendered blocks joined with newlines, in source order
pub fn parse_blocks(text: &str) -> String {
    BlockParser::new(text)
        .parse()
        .iter()
        .map(Block::render)
        .join("\n")
}

/// Block parser over the lines of one document
pub struct BlockParser<'a> {
    /// Source lines with line terminators removed
    lines: Vec<&'a str>,
}

impl<'a> BlockParser<'a> {
    /// Create a parser for a document
    pub fn new(text: &'a str) -> Self {
        let lines = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();
        Self { lines }
    }

    /// Parse the document into blocks
    ///
    /// # Returns
    /// * `Vec<Block>` - Blocks in source order
    pub fn parse(&self) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut index = 0;

        while index < self.lines.len() {
            let line = self.lines[index];
            if line.trim().is_empty() {
                index += 1;
                continue;
            }

            let (block, consumed) = Detector::PRIORITY
                .iter()
                .find_map(|detector| detector.detect(&self.lines, index))
                .unwrap_or_else(|| (Block::Paragraph(line.to_string()), 1));

            blocks.push(block);
            index += consumed.max(1);
        }

        blocks
    }
}

/// Fenced code block: consumes up to the closing fence or end of input
fn detect_fenced_code(lines: &[&str], index: usize) -> Detection {
    let info = lines[index].trim().strip_prefix("```")?;
    let language = info
        .trim_start_matches('`')
        .split_whitespace()
        .next()
        .map(str::to_string);

    let mut code = Vec::new();
    for (offset, line) in lines[index + 1..].iter().enumerate() {
        if is_closing_fence(line) {
            return Some((Block::CodeBlock { language, lines: code }, offset + 2));
        }
        code.push(escape_html(line));
    }

    log::debug!(
        "Code fence opened on line {} is never closed, consuming to end of document",
        index + 1
    );
    let consumed = lines.len() - index;
    while code.last().is_some_and(|line| line.trim().is_empty()) {
        code.pop();
    }
    Some((Block::CodeBlock { language, lines: code }, consumed))
}

/// A closing fence is a line of three or more backticks
fn is_closing_fence(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.chars().all(|c| c == '`')
}

/// ATX heading: one to six `#` followed by whitespace
fn detect_heading(line: &str) -> Detection {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if !(1..=6).contains(&level) {
        return None;
    }

    let rest = &trimmed[level..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let text = strip_closing_hashes(rest.trim());
    let id = slugify(text);
    Some((
        Block::Heading {
            level,
            text: text.to_string(),
            id,
        },
        1,
    ))
}

/// Remove an optional closing `#` run (`## Title ##`)
fn strip_closing_hashes(text: &str) -> &str {
    let without = text.trim_end_matches('#');
    if without.len() == text.len() {
        text
    } else if without.is_empty() {
        ""
    } else if without.ends_with(char::is_whitespace) {
        without.trim_end()
    } else {
        text
    }
}

/// Thematic break: three or more of the same `*`, `-` or `_`
fn detect_thematic_break(line: &str) -> Detection {
    let mut markers = line.chars().filter(|c| !c.is_whitespace());
    let first = markers.next()?;
    if !matches!(first, '*' | '-' | '_') {
        return None;
    }

    let mut count = 1;
    for c in markers {
        if c != first {
            return None;
        }
        count += 1;
    }

    (count >= 3).then_some((Block::Rule, 1))
}

/// Whether a line belongs to a blockquote
fn is_blockquote_line(line: &str) -> bool {
    line.trim_start().starts_with('>')
}

/// Blockquote: contiguous `>` lines merged into one paragraph
fn detect_blockquote(lines: &[&str], index: usize) -> Detection {
    if !is_blockquote_line(lines[index]) {
        return None;
    }

    let quoted: Vec<&str> = lines[index..]
        .iter()
        .take_while(|line| is_blockquote_line(line))
        .map(|line| {
            let trimmed = line.trim();
            trimmed.strip_prefix('>').unwrap_or(trimmed).trim()
        })
        .collect();

    let consumed = quoted.len();
    let text = quoted.into_iter().filter(|part| !part.is_empty()).join(" ");
    Some((Block::BlockQuote(text), consumed))
}

/// Text of an unordered list item (`- item`, `* item`, `+ item`)
fn unordered_item(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let rest = trimmed.strip_prefix(['-', '*', '+'])?;
    rest.starts_with(char::is_whitespace).then(|| rest.trim())
}

/// Number and text of an ordered list item (`1. item`)
fn ordered_item(line: &str) -> Option<(u64, &str)> {
    let trimmed = line.trim_start();
    let digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || digits > MAX_LIST_NUMBER_DIGITS {
        return None;
    }

    let rest = trimmed[digits..].strip_prefix('.')?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let number = trimmed[..digits].parse().ok()?;
    Some((number, rest.trim()))
}

/// Unordered list: contiguous item lines
fn detect_unordered_list(lines: &[&str], index: usize) -> Detection {
    unordered_item(lines[index])?;

    let items: Vec<String> = lines[index..]
        .iter()
        .map_while(|line| unordered_item(line))
        .map(str::to_string)
        .collect();

    let consumed = items.len();
    Some((
        Block::List {
            kind: ListKind::Unordered,
            items,
        },
        consumed,
    ))
}

/// Ordered list: contiguous numbered lines
fn detect_ordered_list(lines: &[&str], index: usize) -> Detection {
    let (start, _) = ordered_item(lines[index])?;

    let items: Vec<String> = lines[index..]
        .iter()
        .map_while(|line| ordered_item(line))
        .map(|(_, text)| text.to_string())
        .collect();

    let consumed = items.len();
    Some((
        Block::List {
            kind: ListKind::Ordered { start },
            items,
        },
        consumed,
    ))
}

/// Split a table row into its non-empty trimmed cells
fn split_cells(line: &str) -> Vec<String> {
    line.split('|')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a delimiter row such as `|:--|--:|`
///
/// Only pipes, colons, hyphens and whitespace may appear, with at least one
/// pipe and one hyphen.
fn parse_delimiter_row(line: &str) -> Option<Vec<Alignment>> {
    let trimmed = line.trim();
    let only_delimiters = trimmed
        .chars()
        .all(|c| matches!(c, '|' | ':' | '-') || c.is_whitespace());
    if !only_delimiters || !trimmed.contains('|') || !trimmed.contains('-') {
        return None;
    }

    Some(
        trimmed
            .split('|')
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
            .map(Alignment::from_delimiter)
            .collect(),
    )
}

/// Pipe table: header line immediately followed by a delimiter row
fn detect_table(lines: &[&str], index: usize) -> Detection {
    let header_line = lines[index];
    if !header_line.contains('|') {
        return None;
    }

    let alignments = parse_delimiter_row(lines.get(index + 1)?)?;
    let headers = split_cells(header_line);
    if headers.is_empty() {
        return None;
    }

    let rows: Vec<Vec<String>> = lines[index + 2..]
        .iter()
        .take_while(|line| line.contains('|'))
        .map(|line| split_cells(line))
        .collect();

    let consumed = 2 + rows.len();
    Some((
        Block::Table {
            alignments,
            headers,
            rows,
        },
        consumed,
    ))
}

/// Raw HTML: a line made of a block-level tag (or a comment)
fn detect_raw_html(line: &str) -> Detection {
    let trimmed = line.trim();
    if !trimmed.ends_with('>') {
        return None;
    }
    if trimmed.starts_with("<!--") {
        return Some((Block::Html(line.to_string()), 1));
    }

    let after_open = trimmed.strip_prefix('<')?;
    let after_open = after_open.strip_prefix('/').unwrap_or(after_open);
    let name_len = after_open
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .count();
    let (name, rest) = after_open.split_at(name_len);

    let is_block_tag = HTML_BLOCK_TAGS.contains(&name.to_ascii_lowercase().as_str());
    let name_ends = rest.starts_with(|c: char| c == '>' || c == '/' || c.is_whitespace());
    (is_block_tag && name_ends).then(|| (Block::Html(line.to_string()), 1))
}
