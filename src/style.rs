//! Styles and attribute runs decoded from a note body.
//!
//! A note body is plain text plus a sequence of [`AttributeRun`]s that
//! partition it. Each run carries the styles in effect for its span.

/// Paragraph kind codes as they appear in the archive.
///
/// These were observed in archives written by the Notes app rather than taken
/// from any published format description. Codes not listed here are reported
/// as unknown and rendered as a placeholder.
pub mod codes {
    pub const TITLE: i32 = 0;
    pub const HEADING: i32 = 1;
    pub const SUBHEADING: i32 = 2;
    pub const MONO: i32 = 4;
    /// First code of the list range. Lists are 100..=103.
    pub const LIST_START: i32 = 100;
    pub const BULLET: i32 = 100;
    pub const DASHED: i32 = 101;
    pub const NUMBERED: i32 = 102;
    pub const CHECKLIST: i32 = 103;

    /// Text style bits, also observed rather than documented.
    pub const BOLD: i32 = 0x1;
    pub const ITALIC: i32 = 0x2;
}

/// Font size the archive assumes when none is stored.
pub const DEFAULT_FONT_SIZE: f32 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParagraphKind {
    #[default]
    None,
    Title,
    Heading,
    Subheading,
    Mono,
    Bullet,
    Dashed,
    Numbered,
    Checklist,
    /// A code with no known meaning, kept so renderers can surface it.
    Unknown(i32),
}

impl ParagraphKind {
    /// Maps an archive code to a kind. Returns `None` for unrecognised codes.
    pub fn from_code(code: i32) -> Option<Self> {
        let kind = match code {
            codes::TITLE => Self::Title,
            codes::HEADING => Self::Heading,
            codes::SUBHEADING => Self::Subheading,
            codes::MONO => Self::Mono,
            codes::BULLET => Self::Bullet,
            codes::DASHED => Self::Dashed,
            codes::NUMBERED => Self::Numbered,
            codes::CHECKLIST => Self::Checklist,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_list(self) -> bool {
        matches!(
            self,
            Self::Bullet | Self::Dashed | Self::Numbered | Self::Checklist
        )
    }

    /// Kinds that share a block container when adjacent.
    ///
    /// Bullet, dashed and checklist items all live in one unordered list.
    fn family(self) -> Self {
        match self {
            Self::Dashed | Self::Checklist => Self::Bullet,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ParagraphStyle {
    pub kind: ParagraphKind,
    /// Nesting level; only meaningful for list kinds.
    pub indent: u32,
    /// Only meaningful for [`ParagraphKind::Checklist`].
    pub checked: bool,
}

impl ParagraphStyle {
    pub fn new(kind: ParagraphKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn list(kind: ParagraphKind, indent: u32) -> Self {
        Self {
            kind,
            indent,
            checked: false,
        }
    }

    pub fn checklist(checked: bool, indent: u32) -> Self {
        Self {
            kind: ParagraphKind::Checklist,
            indent,
            checked,
        }
    }

    pub fn is_list(&self) -> bool {
        self.kind.is_list()
    }

    /// True when both styles belong to the same open block, so moving from
    /// one to the other needs no close/open pair.
    pub fn same_block(&self, other: &Self) -> bool {
        self.kind.family() == other.kind.family() && self.indent == other.indent
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontStyle {
    /// Decoded but not rendered.
    pub name: Option<String>,
    pub size: f32,
}

impl Default for FontStyle {
    fn default() -> Self {
        Self {
            name: None,
            size: DEFAULT_FONT_SIZE,
        }
    }
}

impl FontStyle {
    /// Size as written into markup: integral sizes drop the fraction.
    pub fn size_label(&self) -> String {
        if self.size.fract() == 0.0 && self.size.is_finite() {
            format!("{}", self.size as i64)
        } else {
            format!("{}", self.size)
        }
    }
}

/// Character-level styles.
///
/// Only bold and italic are rendered. Underline, strikethrough and baseline
/// are carried through for callers that want them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStyle {
    pub bits: i32,
    pub underline: Option<i32>,
    pub strikethrough: Option<i32>,
    pub baseline: Option<i32>,
}

impl TextStyle {
    pub fn bold(&self) -> bool {
        self.bits & codes::BOLD != 0
    }

    pub fn italic(&self) -> bool {
        self.bits & codes::ITALIC != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
            && self.underline.is_none()
            && self.strikethrough.is_none()
            && self.baseline.is_none()
    }
}

/// RGBA, each channel in `[0, 1]`. Decoded but not rendered.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColorStyle {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlStyle {
    pub url: String,
}

/// Reference to an embedded object (attachment, table, drawing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UuidStyle {
    pub uuid: String,
    /// Uniform type identifier of the object, e.g. `public.jpeg`.
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StyleDescriptor {
    Paragraph(ParagraphStyle),
    Font(FontStyle),
    Text(TextStyle),
    Color(ColorStyle),
    Url(UrlStyle),
    Uuid(UuidStyle),
}

/// A span of text sharing one set of styles.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributeRun {
    /// Span length in UTF-16 code units.
    pub length: usize,
    pub styles: Vec<StyleDescriptor>,
}

impl AttributeRun {
    pub fn new(length: usize) -> Self {
        Self {
            length,
            styles: Vec::new(),
        }
    }

    pub fn with(mut self, style: StyleDescriptor) -> Self {
        self.styles.push(style);
        self
    }

    /// The run's paragraph style, or the plain default when it has none.
    pub fn paragraph(&self) -> ParagraphStyle {
        self.styles
            .iter()
            .find_map(|s| match s {
                StyleDescriptor::Paragraph(p) => Some(*p),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Styles other than the paragraph style, in encounter order.
    pub fn inline_styles(&self) -> impl Iterator<Item = &StyleDescriptor> {
        self.styles
            .iter()
            .filter(|s| !matches!(s, StyleDescriptor::Paragraph(_)))
    }
}

/// Length of `text` in UTF-16 code units.
pub fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}
