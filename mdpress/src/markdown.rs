//! Markdown to HTML conversion
//!
//! Conversion happens in two passes:
//! 1. **Blocks**: a forward line scanner classifies whole lines into block
//!    constructs (headings, lists, tables, code fences, ...) and renders them
//! 2. **Inline**: span markup (bold, italic, code, links, images) inside the
//!    rendered block HTML is rewritten
//!
//! Neither pass ever fails. Content that matches no construct degrades to a
//! plain paragraph, and links or images with unsafe targets are dropped.

mod block_parser;
mod blocks;
mod escape;
mod inline;
mod slug;
mod types;

pub use block_parser::{parse_blocks, BlockParser};
pub use blocks::Block;
pub use escape::{escape_html, escape_text};
pub use inline::parse_inline;
pub use slug::slugify;
pub use types::{Alignment, ListKind};

/// Run both passes over a markdown document
///
/// # Parameters
/// * `markdown` - Raw markdown source
///
/// # Returns
/// * `String` - HTML fragment with block and span markup applied
pub fn to_html(markdown: &str) -> String {
    parse_inline(&parse_blocks(markdown))
}
