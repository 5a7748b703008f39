//! Full HTML documents around converted fragments
//!
//! A template is an HTML file with `{{variable}}` placeholders. The built-in
//! template carries print CSS: page size and margin from the settings, page
//! break rules for headings, tables, code and figures.

use crate::markdown::escape_html;
use crate::settings::Settings;
use crate::url::decode_references;
use regex::{Captures, Regex};
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;
use thiserror::Error;

/// Regex to match a `{{variable}}` placeholder.
static VARIABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("invalid template variable regex")
});

/// Regex to match the first level 1 heading.
static H1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<h1[^>]*>(.*?)</h1>").expect("invalid h1 regex"));

/// Regex to match any tag.
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("invalid tag regex"));

/// Built-in document template
pub const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{{title}}</title>
<style>
@page {
    size: {{page_format}};
    margin: {{page_margin}};
}
{{css}}</style>
</head>
<body>
<main class="document">
{{content}}
</main>
</body>
</html>
"#;

/// Built-in print stylesheet
pub const DEFAULT_CSS: &str = r#"
* {
    box-sizing: border-box;
}

body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Roboto', 'Helvetica Neue',
                 sans-serif;
    font-size: 11pt;
    line-height: 1.5;
    color: #1a1a1a;
    margin: 0;
}

h1, h2, h3, h4, h5, h6 {
    line-height: 1.25;
    margin: 1.4em 0 0.5em;
    page-break-after: avoid;
    break-after: avoid;
}

h1 {
    font-size: 2em;
    border-bottom: 2px solid #0066cc;
    padding-bottom: 0.2em;
}

h2 {
    font-size: 1.5em;
}

p, li {
    orphans: 3;
    widows: 3;
}

a {
    color: #0066cc;
    text-decoration: none;
}

blockquote {
    margin: 1em 0;
    padding: 0.5em 1em;
    border-left: 4px solid #ccc;
    color: #555;
}

pre {
    background-color: #f6f8fa;
    padding: 0.8em;
    border-radius: 4px;
    white-space: pre-wrap;
    word-wrap: break-word;
    page-break-inside: avoid;
    break-inside: avoid;
}

code {
    font-family: 'SFMono-Regular', Consolas, 'Liberation Mono', Menlo, monospace;
    font-size: 0.9em;
}

table {
    border-collapse: collapse;
    width: 100%;
    margin: 1em 0;
    page-break-inside: avoid;
    break-inside: avoid;
}

th, td {
    border: 1px solid #ddd;
    padding: 0.4em 0.6em;
    text-align: left;
}

th {
    background-color: #f0f0f0;
}

thead {
    display: table-header-group;
}

tr {
    page-break-inside: avoid;
    break-inside: avoid;
}

img {
    max-width: 100%;
}

figure {
    margin: 1em 0;
    text-align: center;
    page-break-inside: avoid;
    break-inside: avoid;
}

hr {
    border: none;
    border-top: 1px solid #ddd;
    margin: 2em 0;
}

nav.toc {
    page-break-after: always;
    break-after: page;
}

nav.toc ul {
    list-style: none;
    padding-left: 0;
}

.toc-h2 { padding-left: 1em; }
.toc-h3 { padding-left: 2em; }
.toc-h4 { padding-left: 3em; }
.toc-h5 { padding-left: 4em; }
.toc-h6 { padding-left: 5em; }

.hl-keyword { color: #cf222e; font-weight: 600; }
.hl-string { color: #0a3069; }
.hl-number { color: #0550ae; }
.hl-comment { color: #6e7781; font-style: italic; }
"#;

/// Errors that can occur when rendering a document
#[derive(Error, Debug)]
pub enum TemplateError {
    /// The custom template could not be read
    #[error("Failed to read template {path}: {source}", path = .path.display())]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The extra stylesheet could not be read
    #[error("Failed to read stylesheet {path}: {source}", path = .path.display())]
    StylesheetRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Wrap an HTML fragment into a complete document
///
/// # Parameters
/// * `fragment` - Converted HTML fragment
/// * `settings` - Settings providing page layout, template and stylesheet
/// * `title` - Document title
///
/// # Returns
/// * `Ok(String)` - Complete HTML document
/// * `Err(TemplateError)` - The custom template or stylesheet could not be read
pub fn render_document(
    fragment: &str,
    settings: &Settings,
    title: &str,
) -> Result<String, TemplateError> {
    let template = match &settings.page.template {
        Some(path) => fs::read_to_string(path).map_err(|source| TemplateError::TemplateRead {
            path: path.clone(),
            source,
        })?,
        None => DEFAULT_TEMPLATE.to_string(),
    };

    let mut css = DEFAULT_CSS.to_string();
    if let Some(path) = &settings.page.stylesheet {
        let extra = fs::read_to_string(path).map_err(|source| TemplateError::StylesheetRead {
            path: path.clone(),
            source,
        })?;
        css.push('\n');
        css.push_str(&extra.replace("</", "<\\/"));
    }

    let title = escape_html(title);
    let page_format = css_value(&settings.page.format);
    let page_margin = css_value(&settings.page.margin);

    Ok(substitute(&template, |name| match name {
        "title" => Some(title.as_str()),
        "css" => Some(css.as_str()),
        "content" => Some(fragment),
        "page_format" => Some(page_format.as_str()),
        "page_margin" => Some(page_margin.as_str()),
        _ => None,
    }))
}

/// Replace `{{name}}` placeholders in one pass; unknown names stay in place
pub fn substitute<'a, F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<&'a str>,
{
    VARIABLE_RE
        .replace_all(template, |caps: &Captures| match lookup(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Title for a document: its first level 1 heading, or the configured title
///
/// The heading is plain text: tags are stripped and character references
/// decoded, so the result is escaped exactly once when rendered.
pub fn document_title(fragment: &str, settings: &Settings) -> String {
    H1_RE
        .captures(fragment)
        .map(|caps| decode_references(&TAG_RE.replace_all(&caps[1], "")).trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| settings.page.title.clone())
}

/// Drop characters that could end a CSS declaration or the style element
fn css_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ';' | '{' | '}' | '<' | '>'))
        .collect()
}
