//! Shared type definitions

/// Table cell alignment, taken from the colons of a delimiter row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

impl Alignment {
    /// Parse a single delimiter cell such as `:---`, `---:` or `:-:`
    pub fn from_delimiter(cell: &str) -> Self {
        match (cell.starts_with(':'), cell.ends_with(':')) {
            (true, true) => Alignment::Center,
            (true, false) => Alignment::Left,
            (false, true) => Alignment::Right,
            (false, false) => Alignment::None,
        }
    }

    /// Value for the HTML `align` attribute, if any
    pub fn as_attribute(self) -> Option<&'static str> {
        match self {
            Alignment::None => None,
            Alignment::Left => Some("left"),
            Alignment::Center => Some("center"),
            Alignment::Right => Some("right"),
        }
    }
}

/// Kind of a flat list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// Bulleted list (`-`, `*` or `+` markers)
    Unordered,
    /// Numbered list, remembering the number of the first item
    Ordered { start: u64 },
}
