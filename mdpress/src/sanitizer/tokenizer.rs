//! Tolerant HTML tokenizer
//!
//! Splits an HTML string into start tags, end tags, text, comments and
//! other markup declarations. It never fails: a `<` that does not open a tag
//! is text, and a tag cut off by the end of input is discarded the way
//! browsers discard it. Tag and attribute names are lowercased; attribute
//! values and text are kept exactly as written.

/// Elements whose content is raw text up to the matching end tag
pub const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

/// An attribute on a start tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lowercased attribute name
    pub name: String,
    /// Attribute value as written (empty for valueless attributes)
    pub value: String,
}

impl Attribute {
    /// Create an attribute
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A lexical HTML token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `<name attr="value">` or `<name/>`
    StartTag {
        name: String,
        attributes: Vec<Attribute>,
        self_closing: bool,
    },
    /// `</name>`
    EndTag { name: String },
    /// Character data
    Text(String),
    /// `<!-- ... -->`
    Comment(String),
    /// `<!DOCTYPE ...>`, `<?...>`, `<![CDATA[...]]>` and similar
    Declaration(String),
}

/// Tokenize an HTML string
pub fn tokenize(html: &str) -> Vec<Token> {
    Tokenizer::new(html).run()
}

/// Cursor over the input
struct Tokenizer<'a> {
    input: &'a str,
    position: usize,
    tokens: Vec<Token>,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            tokens: Vec::new(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.position..]
    }

    fn run(mut self) -> Vec<Token> {
        while self.position < self.input.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.comment();
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.declaration();
            } else if opens_end_tag(rest) {
                self.end_tag();
            } else if opens_start_tag(rest) {
                self.start_tag();
            } else {
                self.text();
            }
        }
        self.tokens
    }

    /// Text up to the next construct that opens markup
    fn text(&mut self) {
        let rest = self.rest();
        let end = rest
            .char_indices()
            .skip(1)
            .find(|&(index, c)| c == '<' && opens_markup(&rest[index..]))
            .map_or(rest.len(), |(index, _)| index);

        self.push_text(&rest[..end]);
        self.position += end;
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Token::Text(previous)) = self.tokens.last_mut() {
            previous.push_str(text);
        } else {
            self.tokens.push(Token::Text(text.to_string()));
        }
    }

    fn comment(&mut self) {
        let rest = self.rest();
        let body = &rest[4..];
        let (content, consumed) = match body.find("-->") {
            Some(end) => (&body[..end], 4 + end + 3),
            None => (body, rest.len()),
        };
        self.tokens.push(Token::Comment(content.to_string()));
        self.position += consumed;
    }

    fn declaration(&mut self) {
        let rest = self.rest();
        let consumed = rest.find('>').map_or(rest.len(), |end| end + 1);
        self.tokens
            .push(Token::Declaration(rest[..consumed].to_string()));
        self.position += consumed;
    }

    fn end_tag(&mut self) {
        let rest = self.rest();
        let name = tag_name(&rest[2..]);
        match rest.find('>') {
            Some(end) => {
                self.tokens.push(Token::EndTag { name });
                self.position += end + 1;
            }
            None => self.position = self.input.len(),
        }
    }

    fn start_tag(&mut self) {
        let rest = self.rest();
        let name = tag_name(&rest[1..]);
        let mut cursor = 1 + name.len();
        let mut attributes: Vec<Attribute> = Vec::new();
        let bytes = rest.as_bytes();

        loop {
            while cursor < bytes.len() && (bytes[cursor].is_ascii_whitespace()) {
                cursor += 1;
            }
            if cursor >= bytes.len() {
                // Unterminated tag: dropped along with the rest of the input
                self.position = self.input.len();
                return;
            }

            match bytes[cursor] {
                b'>' => {
                    cursor += 1;
                    break;
                }
                b'/' if bytes.get(cursor + 1) == Some(&b'>') => {
                    self.position += cursor + 2;
                    self.tokens.push(Token::StartTag {
                        name,
                        attributes,
                        self_closing: true,
                    });
                    return;
                }
                b'/' => cursor += 1,
                _ => {
                    let (attribute, next) = parse_attribute(rest, cursor);
                    cursor = next;
                    if let Some(attribute) = attribute {
                        // Browsers keep the first of duplicated attributes
                        if !attributes.iter().any(|a| a.name == attribute.name) {
                            attributes.push(attribute);
                        }
                    }
                }
            }
        }

        self.position += cursor;
        let raw_text = RAW_TEXT_ELEMENTS.contains(&name.as_str());
        self.tokens.push(Token::StartTag {
            name: name.clone(),
            attributes,
            self_closing: false,
        });

        if raw_text {
            self.raw_text(&name);
        }
    }

    /// Content of a raw text element, up to its end tag
    fn raw_text(&mut self, name: &str) {
        let rest = self.rest();
        let closing = format!("</{}", name);
        let end = rest
            .to_ascii_lowercase()
            .find(&closing)
            .unwrap_or(rest.len());

        if end > 0 {
            self.tokens.push(Token::Text(rest[..end].to_string()));
        }
        self.position += end;
    }
}

/// Parse one attribute starting at `start`; returns it and the next offset
fn parse_attribute(tag: &str, start: usize) -> (Option<Attribute>, usize) {
    let bytes = tag.as_bytes();
    let mut cursor = start;

    // The first character always belongs to the name, even an `=`
    cursor += tag[cursor..].chars().next().map_or(1, char::len_utf8);
    while cursor < bytes.len()
        && !bytes[cursor].is_ascii_whitespace()
        && !matches!(bytes[cursor], b'=' | b'>' | b'/')
    {
        cursor += 1;
    }
    let name = tag[start..cursor].to_ascii_lowercase();

    let mut lookahead = cursor;
    while lookahead < bytes.len() && bytes[lookahead].is_ascii_whitespace() {
        lookahead += 1;
    }
    if bytes.get(lookahead) != Some(&b'=') {
        return (Some(Attribute::new(name, "")), cursor);
    }

    cursor = lookahead + 1;
    while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
        cursor += 1;
    }

    let value = match bytes.get(cursor) {
        Some(&quote @ (b'"' | b'\'')) => {
            let body = &tag[cursor + 1..];
            match body.find(quote as char) {
                Some(end) => {
                    cursor += 1 + end + 1;
                    &body[..end]
                }
                None => {
                    cursor = tag.len();
                    body
                }
            }
        }
        _ => {
            let value_start = cursor;
            while cursor < bytes.len()
                && !bytes[cursor].is_ascii_whitespace()
                && bytes[cursor] != b'>'
            {
                cursor += 1;
            }
            &tag[value_start..cursor]
        }
    };

    (Some(Attribute::new(name, value)), cursor)
}

/// Lowercased tag name at the start of `text`
fn tag_name(text: &str) -> String {
    let len = text
        .bytes()
        .take_while(|b| !b.is_ascii_whitespace() && !matches!(b, b'/' | b'>'))
        .count();
    text[..len].to_ascii_lowercase()
}

fn opens_start_tag(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() > 1 && bytes[0] == b'<' && bytes[1].is_ascii_alphabetic()
}

fn opens_end_tag(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() > 2 && text.starts_with("</") && bytes[2].is_ascii_alphabetic()
}

fn opens_markup(text: &str) -> bool {
    text.starts_with("<!") || text.starts_with("<?") || opens_end_tag(text) || opens_start_tag(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn start(name: &str, attributes: Vec<Attribute>) -> Token {
        Token::StartTag {
            name: name.to_string(),
            attributes,
            self_closing: false,
        }
    }

    #[test]
    fn test_tokenize_basic() {
        let tokens = tokenize("<P Class=\"a\">Hi</p>");
        assert_eq!(
            tokens,
            vec![
                start("p", vec![Attribute::new("class", "a")]),
                Token::Text("Hi".to_string()),
                Token::EndTag {
                    name: "p".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_attribute_forms() {
        let tokens = tokenize("<input disabled value='x y' data-n=5 title = \"t\">");
        assert_eq!(
            tokens,
            vec![start(
                "input",
                vec![
                    Attribute::new("disabled", ""),
                    Attribute::new("value", "x y"),
                    Attribute::new("data-n", "5"),
                    Attribute::new("title", "t"),
                ]
            )]
        );
    }

    #[test]
    fn test_duplicate_attributes_keep_first() {
        let tokens = tokenize("<a href=\"/ok\" href=\"javascript:x\">");
        assert_eq!(
            tokens,
            vec![start("a", vec![Attribute::new("href", "/ok")])]
        );
    }

    #[test]
    fn test_self_closing() {
        assert_eq!(
            tokenize("<br/>"),
            vec![Token::StartTag {
                name: "br".to_string(),
                attributes: Vec::new(),
                self_closing: true,
            }]
        );
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        assert_eq!(
            tokenize("a < b <3"),
            vec![Token::Text("a < b <3".to_string())]
        );
    }

    #[test]
    fn test_comments_and_declarations() {
        assert_eq!(
            tokenize("<!DOCTYPE html><!-- c -->x"),
            vec![
                Token::Declaration("<!DOCTYPE html>".to_string()),
                Token::Comment(" c ".to_string()),
                Token::Text("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_script_content_is_raw_text() {
        let tokens = tokenize("<script>if (a<b) { x('<p>') }</SCRIPT>");
        assert_eq!(
            tokens,
            vec![
                start("script", Vec::new()),
                Token::Text("if (a<b) { x('<p>') }".to_string()),
                Token::EndTag {
                    name: "script".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_unterminated_tag_is_dropped() {
        assert_eq!(
            tokenize("ok<img src=x onerror=alert(1)"),
            vec![Token::Text("ok".to_string())]
        );
    }
}
