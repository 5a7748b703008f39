//! Heading identifier generation

/// Derive a heading id from heading text
///
/// Lowercases the text, strips everything except word characters (Unicode
/// letters and digits plus `_`), whitespace and hyphens, turns each
/// whitespace run into one hyphen and trims hyphens from both ends. Identical headings produce identical ids; duplicates are
/// not disambiguated.
///
/// # Parameters
/// * `text` - Raw heading text
///
/// # Returns
/// * `String` - The identifier (possibly empty)
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut in_whitespace = false;

    for c in text.to_lowercase().chars() {
        if c.is_whitespace() {
            in_whitespace = true;
            continue;
        }
        if !(c.is_alphanumeric() || c == '_' || c == '-') {
            continue;
        }
        if in_whitespace {
            slug.push('-');
            in_whitespace = false;
        }
        slug.push(c);
    }

    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Title"), "title");
        assert_eq!(slugify("Getting Started"), "getting-started");
        assert_eq!(slugify("  Padded   words  "), "padded-words");
    }

    #[test]
    fn test_slugify_strips_punctuation() {
        assert_eq!(slugify("What's new?"), "whats-new");
        assert_eq!(slugify("Some **bold** text"), "some-bold-text");
        assert_eq!(slugify("snake_case_name"), "snake_case_name");
    }

    #[test]
    fn test_slugify_keeps_unicode_letters() {
        assert_eq!(slugify("Über Café"), "über-café");
        assert_eq!(slugify("日本語 ガイド"), "日本語-ガイド");
    }

    #[test]
    fn test_slugify_trims_edge_hyphens() {
        assert_eq!(slugify("- leading and trailing -"), "leading-and-trailing");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slugify_keeps_inner_hyphen_runs() {
        assert_eq!(slugify("a -- b"), "a----b");
    }

    #[test]
    fn test_slugify_idempotent() {
        for text in ["Hello, World!", "A  B\tC", "Über Café", "x-y_z 1.2.3"] {
            let once = slugify(text);
            assert_eq!(slugify(&once), once, "slug of {:?} not stable", text);
        }
    }
}
