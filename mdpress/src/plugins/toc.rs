//! Table of contents built from heading ids

use itertools::Itertools;
use regex::Regex;
use std::sync::LazyLock;

/// Paragraph that marks where the table of contents goes
pub const TOC_MARKER: &str = "<p>[TOC]</p>";

/// Regex to match a rendered heading with an id.
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<h([1-6]) id="([^"]+)">(.*?)</h[1-6]>"#).expect("invalid heading regex")
});

/// Regex to match any tag, used to flatten heading markup.
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("invalid tag regex"));

/// One entry of the table of contents
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    level: usize,
    id: String,
    text: String,
}

fn entries(html: &str) -> Vec<Entry> {
    HEADING_RE
        .captures_iter(html)
        .map(|caps| Entry {
            level: caps[1].parse().unwrap_or(1),
            id: caps[2].to_string(),
            text: TAG_RE.replace_all(&caps[3], "").trim().to_string(),
        })
        .collect()
}

fn render(entries: &[Entry]) -> String {
    let items = entries
        .iter()
        .map(|entry| {
            format!(
                "<li class=\"toc-h{}\"><a href=\"#{}\">{}</a></li>\n",
                entry.level, entry.id, entry.text
            )
        })
        .join("");
    format!("<nav class=\"toc\"><ul>\n{}</ul></nav>", items)
}

/// Insert a table of contents
///
/// The list replaces the first `[TOC]` paragraph, or is prepended when the
/// document has none. A document without headings gets no list, and its
/// marker is removed.
pub fn insert_toc(html: &str) -> String {
    let entries = entries(html);
    log::debug!("Table of contents has {} entries", entries.len());

    if entries.is_empty() {
        return html.replacen(TOC_MARKER, "", 1);
    }

    let toc = render(&entries);
    if html.contains(TOC_MARKER) {
        html.replacen(TOC_MARKER, &toc, 1)
    } else {
        format!("{}\n{}", toc, html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_toc_prepended() {
        // Arrange
        let html = "<h1 id=\"intro\">Intro</h1>\n<p>x</p>\n<h2 id=\"setup\">Set <em>up</em></h2>";

        // Act
        let result = insert_toc(html);

        // Assert
        assert_eq!(
            result,
            "<nav class=\"toc\"><ul>\n\
             <li class=\"toc-h1\"><a href=\"#intro\">Intro</a></li>\n\
             <li class=\"toc-h2\"><a href=\"#setup\">Set up</a></li>\n\
             </ul></nav>\n\
             <h1 id=\"intro\">Intro</h1>\n<p>x</p>\n<h2 id=\"setup\">Set <em>up</em></h2>"
        );
    }

    #[test]
    fn test_toc_replaces_marker() {
        let html = "<p>[TOC]</p>\n<h3 id=\"a\">A</h3>";
        assert_eq!(
            insert_toc(html),
            "<nav class=\"toc\"><ul>\n<li class=\"toc-h3\"><a href=\"#a\">A</a></li>\n</ul></nav>\n\
             <h3 id=\"a\">A</h3>"
        );
    }

    #[test]
    fn test_no_headings() {
        assert_eq!(insert_toc("<p>[TOC]</p>\n<p>x</p>"), "\n<p>x</p>");
        assert_eq!(insert_toc("<p>x</p>"), "<p>x</p>");
    }

    #[test]
    fn test_headings_without_id_skipped() {
        assert_eq!(insert_toc("<h2 id=\"\">!!!</h2>"), "<h2 id=\"\">!!!</h2>");
    }
}
