//! Inline (span-level) parser
//!
//! Rewrites span markup inside already block-structured HTML. Tags and
//! everything inside `<pre>` elements are copied as-is; only the text between
//! tags is scanned. At every text position the span matchers are tried in a
//! fixed priority order:
//!
//! 1. inline code (its content is escaped, never interpreted)
//! 2. images (`![alt](url)`), dropped entirely when the URL is unsafe
//! 3. links (`[text](url)`), reduced to their text when the URL is unsafe
//! 4. strong (`**x**`, `__x__`), claimed before emphasis
//! 5. strikethrough (`~~x~~`)
//! 6. emphasis (`*x*`, `_x_`)

use super::escape::escape_text;
use crate::url::{is_safe_image, is_safe_link};
use std::collections::HashMap;

/// Rewrite span markup in block HTML
///
/// # Parameters
/// * `html` - Output of the block parser (or any HTML fragment)
///
/// # Returns
/// * `String` - HTML with span markup converted to tags
pub fn parse_inline(html: &str) -> String {
    let mut output = String::with_capacity(html.len());

    for segment in segments(html) {
        match segment {
            Segment::Markup(markup) => output.push_str(markup),
            Segment::Text(text) => output.push_str(&render_spans(text)),
        }
    }

    output
}

/// A piece of the block HTML
#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    /// A tag, comment or whole `<pre>` element, copied unchanged
    Markup(&'a str),
    /// Text between tags, scanned for span markup
    Text(&'a str),
}

/// Split HTML into markup and text segments
///
/// Code spans are skipped as a unit so a `<` inside backticks stays text.
fn segments(html: &str) -> Vec<Segment<'_>> {
    let bytes = html.as_bytes();
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut index = 0;

    while index < bytes.len() {
        match bytes[index] {
            b'`' => {
                let run = backtick_run(&html[index..]);
                index += match find_code_close(&html[index + run..], run) {
                    Some(close) => run + close + run,
                    None => run,
                };
            }
            b'<' => match markup_end(html, index) {
                Some(end) => {
                    if text_start < index {
                        segments.push(Segment::Text(&html[text_start..index]));
                    }
                    segments.push(Segment::Markup(&html[index..end]));
                    index = end;
                    text_start = end;
                }
                None => index += 1,
            },
            _ => index += 1,
        }
    }

    if text_start < html.len() {
        segments.push(Segment::Text(&html[text_start..]));
    }

    segments
}

/// End offset of the markup starting at `start`, if `<` opens a tag
fn markup_end(html: &str, start: usize) -> Option<usize> {
    let rest = &html[start..];
    let next = rest[1..].chars().next()?;
    if !(next.is_ascii_alphabetic() || matches!(next, '/' | '!' | '?')) {
        return None;
    }

    if rest.starts_with("<!--") {
        return Some(start + rest.find("-->").map_or(rest.len(), |p| p + 3));
    }

    let opens_pre = rest.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("<pre"))
        && rest[4..].starts_with(|c: char| c == '>' || c.is_whitespace());
    if opens_pre {
        let lowered = rest.to_ascii_lowercase();
        return Some(start + lowered.find("</pre>").map_or(rest.len(), |p| p + 6));
    }

    rest.find('>').map(|p| start + p + 1)
}

/// Cell end tags emitted by the block parser; a code span never runs past one
const CELL_CLOSE_TAGS: [&str; 2] = ["</td>", "</th>"];

/// Deepest nesting of spans inside link labels and emphasis
const MAX_SPAN_DEPTH: usize = 32;

/// Number of backticks at the start of `text`
fn backtick_run(text: &str) -> usize {
    text.bytes().take_while(|&b| b == b'`').count()
}

/// Text a code span starting here may extend over: the rest of the line, up
/// to the end of the current table cell
fn code_window(text: &str) -> &str {
    let line = text.split('\n').next().unwrap_or_default();
    let end = CELL_CLOSE_TAGS
        .iter()
        .filter_map(|tag| line.find(tag))
        .min()
        .unwrap_or(line.len());
    &line[..end]
}

/// Offset of a closing backtick run of exactly `run` backticks
fn find_code_close(text: &str, run: usize) -> Option<usize> {
    let window = code_window(text);
    let bytes = window.as_bytes();
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] == b'`' {
            let len = backtick_run(&window[index..]);
            if len == run && index > 0 {
                return Some(index);
            }
            index += len;
        } else {
            index += 1;
        }
    }

    None
}

/// Span constructs, tried in priority order at each text position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Span {
    Code,
    Image,
    Link,
    Strong,
    Strikethrough,
    Emphasis,
}

impl Span {
    const PRIORITY: [Span; 6] = [
        Span::Code,
        Span::Image,
        Span::Link,
        Span::Strong,
        Span::Strikethrough,
        Span::Emphasis,
    ];
}

/// A matched span: replacement HTML and bytes consumed
type SpanMatch = Option<(String, usize)>;

/// Parsed `[text](url "title")` construct
struct LinkParts<'a> {
    text: &'a str,
    url: &'a str,
    title: Option<&'a str>,
    /// Bytes consumed from the opening `[`
    len: usize,
}

/// Pair each opening delimiter with its closing one, line by line
fn pair_up(text: &str, open: u8, close: u8) -> HashMap<usize, usize> {
    let mut pairs = HashMap::new();
    let mut stack = Vec::new();

    for (index, byte) in text.bytes().enumerate() {
        if byte == b'\n' {
            stack.clear();
        } else if byte == open {
            stack.push(index);
        } else if byte == close {
            if let Some(start) = stack.pop() {
                pairs.insert(start, index);
            }
        }
    }

    pairs
}

/// Span matcher over one run of text
///
/// Closing delimiters are looked up instead of scanned for: brackets and
/// parentheses are paired once up front, and the closer search for emphasis
/// markers is memoized by search position. A line full of unmatched openers
/// is therefore handled in linear time.
struct SpanParser<'a> {
    text: &'a str,
    depth: usize,
    brackets: HashMap<usize, usize>,
    parens: HashMap<usize, usize>,
    /// Closer reached from a search position, per marker
    closers: HashMap<(&'static str, usize), Option<usize>>,
}

impl<'a> SpanParser<'a> {
    fn new(text: &'a str, depth: usize) -> Self {
        Self {
            text,
            depth,
            brackets: pair_up(text, b'[', b']'),
            parens: pair_up(text, b'(', b')'),
            closers: HashMap::new(),
        }
    }

    /// Convert span markup in the whole text
    fn render(&mut self) -> String {
        let text = self.text;
        let mut output = String::with_capacity(text.len());
        let mut at = 0;
        let mut previous: Option<char> = None;

        while let Some(c) = text[at..].chars().next() {
            let matched = Span::PRIORITY
                .iter()
                .find_map(|&span| self.try_match(span, at, previous));

            match matched {
                Some((html, consumed)) => {
                    output.push_str(&html);
                    at += consumed;
                    previous = text[..at].chars().next_back();
                }
                None => {
                    output.push(c);
                    previous = Some(c);
                    at += c.len_utf8();
                }
            }
        }

        output
    }

    /// Span markup inside a matched span
    fn nested(&self, inner: &str) -> String {
        if self.depth >= MAX_SPAN_DEPTH {
            return inner.to_string();
        }
        SpanParser::new(inner, self.depth + 1).render()
    }

    /// Try to match `span` at byte offset `at`
    fn try_match(&mut self, span: Span, at: usize, previous: Option<char>) -> SpanMatch {
        let text = self.text;
        let rest = &text[at..];
        match span {
            Span::Code => match_code(rest),
            Span::Image => self.match_image(at),
            Span::Link => self.match_link(at),
            Span::Strong if rest.starts_with("**") => self.match_delimited(at, "**", "strong", None),
            Span::Strong if rest.starts_with("__") => {
                self.match_delimited(at, "__", "strong", Some(previous))
            }
            Span::Strikethrough => self.match_delimited(at, "~~", "del", None),
            Span::Emphasis if rest.starts_with('*') => self.match_delimited(at, "*", "em", None),
            Span::Emphasis if rest.starts_with('_') => {
                self.match_delimited(at, "_", "em", Some(previous))
            }
            Span::Strong | Span::Emphasis => None,
        }
    }

    /// Parse a bracketed link whose `[` is at `at`
    fn parse_link_parts(&self, at: usize) -> Option<LinkParts<'a>> {
        let text = self.text;
        if !text[at..].starts_with('[') {
            return None;
        }

        let close_bracket = *self.brackets.get(&at)?;
        let open_paren = close_bracket + 1;
        if !text[open_paren..].starts_with('(') {
            return None;
        }
        let close_paren = *self.parens.get(&open_paren)?;
        let destination = text[open_paren + 1..close_paren].trim();

        let (url, title) = match destination.find(char::is_whitespace) {
            None => (destination, None),
            Some(split) => {
                let title = destination[split..].trim();
                let title = title.strip_prefix('"')?.strip_suffix('"')?;
                (&destination[..split], Some(title))
            }
        };

        Some(LinkParts {
            text: &text[at + 1..close_bracket],
            url,
            title,
            len: close_paren + 1 - at,
        })
    }

    /// Image: emitted only for safe sources, otherwise dropped
    fn match_image(&self, at: usize) -> SpanMatch {
        if !self.text[at..].starts_with('!') {
            return None;
        }
        let parts = self.parse_link_parts(at + 1)?;
        let consumed = 1 + parts.len;

        if !is_safe_image(parts.url) {
            log::debug!("Dropping image with unsafe source: {}", parts.url);
            return Some((String::new(), consumed));
        }

        Some((
            format!(
                "<img src=\"{}\" alt=\"{}\"{}>",
                escape_attribute(parts.url),
                escape_attribute(parts.text),
                title_attribute(parts.title)
            ),
            consumed,
        ))
    }

    /// Link: emitted only for safe targets, otherwise reduced to its text
    fn match_link(&self, at: usize) -> SpanMatch {
        let parts = self.parse_link_parts(at)?;
        let label = self.nested(parts.text);

        if !is_safe_link(parts.url) {
            log::debug!("Dropping link with unsafe target: {}", parts.url);
            return Some((label, parts.len));
        }

        Some((
            format!(
                "<a href=\"{}\"{}>{}</a>",
                escape_attribute(parts.url),
                title_attribute(parts.title),
                label
            ),
            parts.len,
        ))
    }

    /// Match `marker inner marker` at `at` and wrap the inner text in `tag`
    ///
    /// The inner text must be non-empty and must not start or end with
    /// whitespace. For single-character markers, doubled markers inside the
    /// span are skipped so `*a **b** c*` nests. When `word_boundary` is set
    /// (underscore markers) the span may not touch word characters on either
    /// side, which keeps `snake_case_names` literal.
    fn match_delimited(
        &mut self,
        at: usize,
        marker: &'static str,
        tag: &str,
        word_boundary: Option<Option<char>>,
    ) -> SpanMatch {
        let text = self.text;
        if !text[at..].starts_with(marker) {
            return None;
        }
        if let Some(previous) = word_boundary {
            if is_word_char(previous) {
                return None;
            }
        }

        let body = at + marker.len();
        if text[body..].starts_with(char::is_whitespace) {
            return None;
        }

        // A marker right after the opener would close an empty span
        let mut search = body;
        if text[body..].starts_with(marker) && !is_doubled(text, marker, body) {
            search = body + marker.len();
        }

        let close = self.find_closer(marker, word_boundary.is_some(), search)?;
        Some((
            format!("<{tag}>{}</{tag}>", self.nested(&text[body..close])),
            close + marker.len() - at,
        ))
    }

    /// First accepted closing `marker` reached by scanning from `search`
    fn find_closer(
        &mut self,
        marker: &'static str,
        word_boundary: bool,
        search: usize,
    ) -> Option<usize> {
        let text = self.text;
        let mut visited = Vec::new();
        let mut search = search;

        let found = loop {
            if let Some(&known) = self.closers.get(&(marker, search)) {
                break known;
            }
            visited.push(search);

            let Some(offset) = text[search..].find(marker) else {
                break None;
            };
            let position = search + offset;

            if is_doubled(text, marker, position) {
                search = position + 2;
                continue;
            }
            if closes_span(text, marker, word_boundary, position) {
                break Some(position);
            }
            search = position + marker.len();
        };

        for position in visited {
            self.closers.insert((marker, position), found);
        }
        found
    }
}

/// Convert span markup in a run of text
fn render_spans(text: &str) -> String {
    SpanParser::new(text, 0).render()
}

/// Whether a single-character marker at `position` is followed by another
fn is_doubled(text: &str, marker: &str, position: usize) -> bool {
    marker.len() == 1 && text[position + 1..].starts_with(marker)
}

/// Whether the marker at `position` can close a span
fn closes_span(text: &str, marker: &str, word_boundary: bool, position: usize) -> bool {
    let before = text[..position].chars().next_back();
    let after = text[position + marker.len()..].chars().next();
    !before.is_some_and(char::is_whitespace) && !(word_boundary && is_word_char(after))
}

/// Inline code: backtick run, content escaped
fn match_code(text: &str) -> SpanMatch {
    let run = backtick_run(text);
    if run == 0 {
        return None;
    }

    let Some(close) = find_code_close(&text[run..], run) else {
        // An unmatched run stays literal as a whole
        return Some((text[..run].to_string(), run));
    };

    let mut code = &text[run..run + close];
    if run > 1 && code.len() > 2 && code.starts_with(' ') && code.ends_with(' ') {
        code = &code[1..code.len() - 1];
    }

    Some((
        format!("<code>{}</code>", escape_text(code)),
        run + close + run,
    ))
}

/// Escape an attribute value, keeping existing entity references
fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for (index, c) in value.char_indices() {
        match c {
            '&' if !starts_with_entity(&value[index..]) => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Whether `text` starts with an entity reference such as `&amp;` or `&#39;`
fn starts_with_entity(text: &str) -> bool {
    let body = &text[1..];
    let body = body.strip_prefix('#').unwrap_or(body);
    let len = body
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    len > 0 && body[len..].starts_with(';')
}

/// Optional ` title="..."` attribute
fn title_attribute(title: Option<&str>) -> String {
    title
        .map(|t| format!(" title=\"{}\"", escape_attribute(t)))
        .unwrap_or_default()
}

/// Whether a character counts as part of a word for `_` boundaries
fn is_word_char(c: Option<char>) -> bool {
    c.is_some_and(|c| c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strong_and_emphasis() {
        assert_eq!(
            parse_inline("<p>Some **bold** and *italic*.</p>"),
            "<p>Some <strong>bold</strong> and <em>italic</em>.</p>"
        );
        assert_eq!(
            parse_inline("<p>__bold__ and _italic_</p>"),
            "<p><strong>bold</strong> and <em>italic</em></p>"
        );
    }

    #[test]
    fn test_strong_claimed_before_emphasis() {
        assert_eq!(
            render_spans("**x**"),
            "<strong>x</strong>",
            "bold markers must not split into two emphasis spans"
        );
    }

    #[test]
    fn test_nested_spans() {
        assert_eq!(
            render_spans("*a **b** c*"),
            "<em>a <strong>b</strong> c</em>"
        );
        assert_eq!(
            render_spans("**bold with `code`**"),
            "<strong>bold with <code>code</code></strong>"
        );
    }

    #[test]
    fn test_strikethrough() {
        assert_eq!(render_spans("~~gone~~ here"), "<del>gone</del> here");
    }

    #[test]
    fn test_unmatched_markers_stay_literal() {
        assert_eq!(render_spans("2 * 3 = 6"), "2 * 3 = 6");
        assert_eq!(render_spans("**not closed"), "**not closed");
        assert_eq!(render_spans("** spaced **"), "** spaced **");
    }

    #[test]
    fn test_snake_case_untouched() {
        assert_eq!(render_spans("call my_func_name now"), "call my_func_name now");
    }

    #[test]
    fn test_inline_code_is_escaped_and_not_interpreted() {
        assert_eq!(
            parse_inline("<p>Use `**x** <b>` here</p>"),
            "<p>Use <code>**x** &lt;b&gt;</code> here</p>"
        );
        assert_eq!(
            parse_inline("<p>`Vec<T>` is generic</p>"),
            "<p><code>Vec&lt;T&gt;</code> is generic</p>"
        );
    }

    #[test]
    fn test_double_backtick_code() {
        assert_eq!(render_spans("`` a`b ``"), "<code>a`b</code>");
    }

    #[test]
    fn test_links() {
        assert_eq!(
            render_spans("see [Rust](https://rust-lang.org) now"),
            "see <a href=\"https://rust-lang.org\">Rust</a> now"
        );
        assert_eq!(
            render_spans("[**bold** link](#top \"Top\")"),
            "<a href=\"#top\" title=\"Top\"><strong>bold</strong> link</a>"
        );
        assert_eq!(
            render_spans("[q](/search?a=1&b=2)"),
            "<a href=\"/search?a=1&amp;b=2\">q</a>"
        );
    }

    #[test]
    fn test_unsafe_link_collapses_to_text() {
        assert_eq!(render_spans("[click](javascript:alert(1))"), "click");
        assert_eq!(render_spans("[x](vbscript:msgbox)"), "x");
        assert_eq!(render_spans("[x](data:text/html,hi)"), "x");
        assert_eq!(render_spans("[x](//evil.example.com)"), "x");
    }

    #[test]
    fn test_images() {
        assert_eq!(
            render_spans("![Logo](img/logo.png)"),
            "<img src=\"img/logo.png\" alt=\"Logo\">"
        );
        assert_eq!(
            render_spans("![dot](data:image/png;base64,AAAA)"),
            "<img src=\"data:image/png;base64,AAAA\" alt=\"dot\">"
        );
    }

    #[test]
    fn test_unsafe_image_is_dropped() {
        assert_eq!(render_spans("a ![x](javascript:alert(1)) b"), "a  b");
        assert_eq!(render_spans("![x](data:text/html,hi)"), "");
    }

    #[test]
    fn test_encoded_script_targets_rejected() {
        for target in [
            "javascript&#58;alert(1)",
            "javascript&colon;alert(1)",
            "&#106;avascript:alert(1)",
        ] {
            assert_eq!(render_spans(&format!("[x]({})", target)), "x", "link to {}", target);
            assert_eq!(render_spans(&format!("![z]({})", target)), "", "image from {}", target);
        }
    }

    #[test]
    fn test_code_span_stays_inside_table_cell() {
        let row = "<tr><th>`a</th><th>b`</th></tr>";
        assert_eq!(parse_inline(row), row);
        assert_eq!(
            parse_inline("<tr><td>`x`</td><td>y</td></tr>"),
            "<tr><td><code>x</code></td><td>y</td></tr>"
        );
    }

    #[test]
    fn test_unmatched_openers_on_long_line() {
        let brackets = "[".repeat(50_000);
        assert_eq!(render_spans(&brackets), brackets);

        let stars = "*a ".repeat(20_000);
        assert_eq!(render_spans(&stars), stars);

        let underscores = "_a _b ".repeat(10_000);
        assert_eq!(render_spans(&underscores), underscores);
    }

    #[test]
    fn test_deeply_nested_links_are_capped() {
        let text = format!("{}x{}", "[".repeat(100), "](u)".repeat(100));
        let html = render_spans(&text);
        assert!(html.starts_with("<a href=\"u\">"));
        assert_eq!(html.matches("<a href").count(), MAX_SPAN_DEPTH + 1);
    }

    #[test]
    fn test_tags_and_pre_untouched() {
        let html = "<h2 id=\"my_var_name\">Title</h2>\n<pre><code>a *b* c</code></pre>";
        assert_eq!(parse_inline(html), html);
    }

    #[test]
    fn test_segments() {
        assert_eq!(
            segments("<p>a < b</p>"),
            vec![
                Segment::Markup("<p>"),
                Segment::Text("a < b"),
                Segment::Markup("</p>"),
            ]
        );
    }
}
