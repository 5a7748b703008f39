//! URL scheme inspection shared by the inline parser and the sanitizer
//!
//! Browsers decode character references in attribute values and ignore
//! ASCII whitespace and control characters inside a URL scheme
//! (`java&#x9;script:` still runs script), so every check works on a
//! normalized form: references decoded, those characters removed and the
//! text lowercased.

/// URLs that would execute code when navigated to
const SCRIPT_SCHEMES: [&str; 2] = ["javascript:", "vbscript:"];

/// Normalize a URL for scheme checks
///
/// # Parameters
/// * `url` - URL as written in the document
///
/// # Returns
/// * `String` - Lowercased URL with character references decoded,
///   whitespace and control characters removed and backslashes read as
///   forward slashes
pub fn normalize(url: &str) -> String {
    decode_references(url)
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .map(|c| if c == '\\' { '/' } else { c })
        .collect::<String>()
        .to_lowercase()
}

/// Decode the character references an attacker can use to hide a scheme
///
/// Numeric references are decoded with or without the trailing `;`, as
/// browsers do inside attribute values.
pub fn decode_references(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(amp) = rest.find('&') {
        output.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match decode_one(rest) {
            Some((c, consumed)) => {
                output.push(c);
                rest = &rest[consumed..];
            }
            None => {
                output.push('&');
                rest = &rest[1..];
            }
        }
    }

    output.push_str(rest);
    output
}

/// Decode the reference at the start of `text`; returns the character and bytes consumed
fn decode_one(text: &str) -> Option<(char, usize)> {
    let body = &text[1..];

    if let Some(number) = body.strip_prefix('#') {
        let (digits, radix, prefix) = match number.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16, 2),
            None => (number, 10, 1),
        };
        let len = digits
            .chars()
            .take_while(|c| c.is_digit(radix))
            .count();
        if len == 0 {
            return None;
        }
        let code = u32::from_str_radix(&digits[..len], radix).ok()?;
        let c = char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER);
        let terminated = digits[len..].starts_with(';');
        return Some((c, 1 + prefix + len + usize::from(terminated)));
    }

    const NAMED: [(&str, char); 8] = [
        ("amp;", '&'),
        ("lt;", '<'),
        ("gt;", '>'),
        ("quot;", '"'),
        ("apos;", '\''),
        ("colon;", ':'),
        ("tab;", '\t'),
        ("newline;", '\n'),
    ];
    NAMED.iter().find_map(|(name, c)| {
        body.get(..name.len())
            .filter(|candidate| candidate.eq_ignore_ascii_case(name))
            .map(|_| (*c, 1 + name.len()))
    })
}

/// Extract the scheme (without the colon) of a normalized URL
///
/// Returns `None` for relative references, including paths such as
/// `docs/a:b` where the colon appears after a path separator.
pub fn scheme(normalized: &str) -> Option<&str> {
    let colon = normalized.find(':')?;
    let candidate = &normalized[..colon];
    let mut chars = candidate.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(candidate)
}

/// Whether the URL uses `javascript:` or `vbscript:`
pub fn is_script(normalized: &str) -> bool {
    SCRIPT_SCHEMES.iter().any(|s| normalized.starts_with(s))
}

/// Whether the URL is protocol-relative (`//host/path`)
pub fn is_protocol_relative(normalized: &str) -> bool {
    normalized.starts_with("//")
}

/// Whether the URL is a `data:` URL carrying an image
pub fn is_image_data(normalized: &str) -> bool {
    normalized.starts_with("data:image/")
}

/// Check a link target
///
/// Rejects script schemes, every `data:` URL and protocol-relative URLs.
/// Everything else, including relative paths and anchors, is accepted.
pub fn is_safe_link(url: &str) -> bool {
    let normalized = normalize(url);
    !(is_script(&normalized)
        || normalized.starts_with("data:")
        || is_protocol_relative(&normalized))
}

/// Check an image source
///
/// Same rules as [`is_safe_link`], except that `data:image/...` is allowed
/// so images can be inlined.
pub fn is_safe_image(url: &str) -> bool {
    let normalized = normalize(url);
    if is_script(&normalized) || is_protocol_relative(&normalized) {
        return false;
    }
    !normalized.starts_with("data:") || is_image_data(&normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_obfuscation() {
        assert_eq!(normalize(" Java\tScript:alert(1)"), "javascript:alert(1)");
        assert_eq!(normalize("java\u{0}script:x"), "javascript:x");
    }

    #[test]
    fn test_normalize_decodes_references() {
        assert_eq!(normalize("&#106;avascript:x"), "javascript:x");
        assert_eq!(normalize("javascript&colon;x"), "javascript:x");
        assert_eq!(normalize("java&Tab;script&#58x"), "javascript:x");
    }

    #[test]
    fn test_decode_references() {
        assert_eq!(decode_references("a&amp;b"), "a&b");
        assert_eq!(decode_references("&#65;&#x42;"), "AB");
        assert_eq!(decode_references("fish & chips"), "fish & chips");
        assert_eq!(decode_references("&unknown; &#;"), "&unknown; &#;");
    }

    #[test]
    fn test_scheme() {
        assert_eq!(scheme("https://example.com"), Some("https"));
        assert_eq!(scheme("mailto:a@b.c"), Some("mailto"));
        assert_eq!(scheme("docs/a:b"), None);
        assert_eq!(scheme("./file.md"), None);
        assert_eq!(scheme("#top"), None);
        assert_eq!(scheme("1http:x"), None);
    }

    #[test]
    fn test_safe_links() {
        assert!(is_safe_link("https://rust-lang.org"));
        assert!(is_safe_link("docs/intro.md"));
        assert!(is_safe_link("/absolute/path"));
        assert!(is_safe_link("../up"));
        assert!(is_safe_link("#section"));
        assert!(is_safe_link("mailto:someone@example.com"));
    }

    #[test]
    fn test_unsafe_links() {
        assert!(!is_safe_link("javascript:alert(1)"));
        assert!(!is_safe_link("JavaScript:alert(1)"));
        assert!(!is_safe_link("vbscript:msgbox"));
        assert!(!is_safe_link("data:text/html,<script>"));
        assert!(!is_safe_link("data:image/png;base64,AAAA"));
        assert!(!is_safe_link("//evil.example.com"));
        assert!(!is_safe_link("\\\\evil.example.com"));
        assert!(!is_safe_link("javascript&#58;alert(1)"));
        assert!(!is_safe_link("javascript&colon;alert(1)"));
        assert!(!is_safe_link("&#106;avascript:alert(1)"));
    }

    #[test]
    fn test_image_sources() {
        assert!(is_safe_image("img/logo.png"));
        assert!(is_safe_image("https://example.com/a.png"));
        assert!(is_safe_image("data:image/png;base64,AAAA"));
        assert!(!is_safe_image("data:text/html;base64,AAAA"));
        assert!(!is_safe_image("javascript:alert(1)"));
        assert!(!is_safe_image("//cdn.example.com/a.png"));
    }
}
