//! Keyword highlighting for fenced code blocks
//!
//! Works on the escaped contents of `<code class="language-…">` elements.
//! Tokens are classified as comments, string literals, numbers or keywords
//! and wrapped in `<span class="hl-…">`; everything else is copied as is.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Regex to match a code element with a language class.
static CODE_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<code class="language-([A-Za-z0-9_+#.-]+)">(.*?)</code>"#)
        .expect("invalid code block regex")
});

/// Regex to split escaped source into tokens.
///
/// Quoted strings are tried before other character references, and those
/// before everything else, so nothing matches inside a reference.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?P<string>&quot;.*?&quot;|&#39;[^\n]*?&#39;)",
        r"|(?P<entity>&(?:#[0-9]+|#x[0-9a-fA-F]+|[a-zA-Z]+);)",
        r"|(?P<slash>//[^\n]*|(?s:/\*.*?\*/))",
        r"|(?P<hash>#[^\n]*)",
        r"|(?P<number>\b[0-9][0-9_]*(?:\.[0-9]+)?\b)",
        r"|(?P<word>[A-Za-z_][A-Za-z0-9_]*)",
    ))
    .expect("invalid token regex")
});

/// How a token is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Comment,
    Literal,
    Number,
    Keyword,
}

impl Kind {
    fn class(self) -> &'static str {
        match self {
            Kind::Comment => "hl-comment",
            Kind::Literal => "hl-string",
            Kind::Number => "hl-number",
            Kind::Keyword => "hl-keyword",
        }
    }
}

/// Comment syntax of a language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentStyle {
    /// `//` and `/* */`
    Slash,
    /// `#`
    Hash,
}

/// What the highlighter knows about a language
struct Language {
    names: &'static [&'static str],
    comments: CommentStyle,
    single_quoted_strings: bool,
    keywords: &'static [&'static str],
}

static LANGUAGES: [Language; 6] = [
    Language {
        names: &["rust", "rs"],
        comments: CommentStyle::Slash,
        single_quoted_strings: false,
        keywords: &[
            "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else",
            "enum", "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match",
            "mod", "move", "mut", "pub", "ref", "return", "self", "Self", "static", "struct",
            "super", "trait", "true", "type", "unsafe", "use", "where", "while",
        ],
    },
    Language {
        names: &["python", "py"],
        comments: CommentStyle::Hash,
        single_quoted_strings: true,
        keywords: &[
            "and", "as", "assert", "async", "await", "break", "class", "continue", "def",
            "del", "elif", "else", "except", "False", "finally", "for", "from", "global", "if",
            "import", "in", "is", "lambda", "None", "nonlocal", "not", "or", "pass", "raise",
            "return", "True", "try", "while", "with", "yield",
        ],
    },
    Language {
        names: &["javascript", "js", "typescript", "ts"],
        comments: CommentStyle::Slash,
        single_quoted_strings: true,
        keywords: &[
            "async", "await", "break", "case", "catch", "class", "const", "continue",
            "default", "delete", "do", "else", "export", "extends", "false", "finally", "for",
            "function", "if", "import", "in", "instanceof", "interface", "let", "new", "null",
            "return", "switch", "this", "throw", "true", "try", "type", "typeof", "undefined",
            "var", "while", "yield",
        ],
    },
    Language {
        names: &["go", "golang"],
        comments: CommentStyle::Slash,
        single_quoted_strings: true,
        keywords: &[
            "break", "case", "chan", "const", "continue", "default", "defer", "else",
            "fallthrough", "for", "func", "go", "goto", "if", "import", "interface", "map",
            "nil", "package", "range", "return", "select", "struct", "switch", "type", "var",
        ],
    },
    Language {
        names: &["c", "cpp", "c++", "h", "hpp", "java", "csharp", "cs"],
        comments: CommentStyle::Slash,
        single_quoted_strings: true,
        keywords: &[
            "break", "case", "char", "class", "const", "continue", "default", "do", "double",
            "else", "enum", "extern", "false", "float", "for", "if", "int", "long", "namespace",
            "new", "null", "nullptr", "private", "protected", "public", "return", "short",
            "static", "struct", "switch", "this", "true", "typedef", "unsigned", "void",
            "while",
        ],
    },
    Language {
        names: &["sh", "bash", "shell", "zsh"],
        comments: CommentStyle::Hash,
        single_quoted_strings: true,
        keywords: &[
            "case", "do", "done", "elif", "else", "esac", "export", "fi", "for", "function",
            "if", "in", "local", "return", "then", "until", "while",
        ],
    },
];

fn language(name: &str) -> Option<&'static Language> {
    let name = name.to_ascii_lowercase();
    LANGUAGES.iter().find(|l| l.names.contains(&name.as_str()))
}

/// Highlight every code block whose language is known
pub fn highlight_code_blocks(html: &str) -> String {
    CODE_BLOCK_RE
        .replace_all(html, |caps: &Captures| match language(&caps[1]) {
            Some(lang) => format!(
                "<code class=\"language-{}\">{}</code>",
                &caps[1],
                highlight_with(lang, &caps[2])
            ),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Highlight already escaped source code
///
/// # Parameters
/// * `lang` - Language tag, such as `rust` or `py`
/// * `escaped` - HTML-escaped source
///
/// # Returns
/// * `Option<String>` - Marked-up source, `None` for unknown languages
pub fn highlight_source(lang: &str, escaped: &str) -> Option<String> {
    language(lang).map(|l| highlight_with(l, escaped))
}

fn highlight_with(lang: &Language, escaped: &str) -> String {
    let mut output = String::with_capacity(escaped.len() * 2);
    let mut last = 0;

    for caps in TOKEN_RE.captures_iter(escaped) {
        let Some(token) = caps.get(0) else {
            continue;
        };
        output.push_str(&escaped[last..token.start()]);
        last = token.end();

        let kind = classify(lang, &caps);
        match kind {
            Some(kind) => {
                output.push_str("<span class=\"");
                output.push_str(kind.class());
                output.push_str("\">");
                output.push_str(token.as_str());
                output.push_str("</span>");
            }
            None => output.push_str(token.as_str()),
        }
    }

    output.push_str(&escaped[last..]);
    output
}

fn classify(lang: &Language, caps: &Captures) -> Option<Kind> {
    if caps.name("slash").is_some() {
        return (lang.comments == CommentStyle::Slash).then_some(Kind::Comment);
    }
    if caps.name("hash").is_some() {
        return (lang.comments == CommentStyle::Hash).then_some(Kind::Comment);
    }
    if let Some(string) = caps.name("string") {
        let single = string.as_str().starts_with("&#39;");
        return (!single || lang.single_quoted_strings).then_some(Kind::Literal);
    }
    if caps.name("number").is_some() {
        return Some(Kind::Number);
    }
    if let Some(word) = caps.name("word") {
        return lang.keywords.contains(&word.as_str()).then_some(Kind::Keyword);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_highlight_rust() {
        let html = "<pre><code class=\"language-rust\">fn main() { let x = 42; }</code></pre>";
        assert_eq!(
            highlight_code_blocks(html),
            "<pre><code class=\"language-rust\"><span class=\"hl-keyword\">fn</span> main() { \
             <span class=\"hl-keyword\">let</span> x = <span class=\"hl-number\">42</span>; }\
             </code></pre>"
        );
    }

    #[test]
    fn test_strings_and_comments() {
        let source = "print(&quot;if&quot;) # done";
        assert_eq!(
            highlight_source("python", source).unwrap(),
            "print(<span class=\"hl-string\">&quot;if&quot;</span>) \
             <span class=\"hl-comment\"># done</span>"
        );
    }

    #[test]
    fn test_entities_are_not_split() {
        let source = "a &amp;&amp; b &lt; 3";
        assert_eq!(
            highlight_source("rust", source).unwrap(),
            "a &amp;&amp; b &lt; <span class=\"hl-number\">3</span>"
        );
    }

    #[test]
    fn test_rust_lifetimes_are_not_strings() {
        let source = "&amp;&#39;a str";
        assert_eq!(highlight_source("rust", source).unwrap(), source);
    }

    #[test]
    fn test_unknown_language_untouched() {
        let html = "<pre><code class=\"language-cobol\">MOVE 1 TO X</code></pre>";
        assert_eq!(highlight_code_blocks(html), html);
        assert_eq!(highlight_source("cobol", "x"), None);
    }

    #[test]
    fn test_plain_code_blocks_untouched() {
        let html = "<pre><code>fn main() {}</code></pre>";
        assert_eq!(highlight_code_blocks(html), html);
    }
}
