//! Fault types raised while decoding a note-body archive.
//!
//! Only [`SchemaFault`] can abort a decode, and only when the note text itself
//! cannot be located. Everything else is collected as a [`Defect`] on the
//! decoded body so a batch export never stops because of one odd note.

use thiserror::Error;

/// A malformed low-level record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeFault {
    /// The header byte carries a type tag other than 0, 2 or 5.
    #[error("unknown type tag {tag} at byte {offset}")]
    UnknownTag { offset: usize, tag: u8 },

    /// A varint does not fit in a signed 32-bit integer, or runs past 10 bytes.
    #[error("integer at byte {offset} does not fit in 32 bits")]
    IntegerOverflow { offset: usize },

    /// The buffer ended in the middle of a record.
    #[error("record at byte {offset} is truncated")]
    Truncated { offset: usize },
}

impl DecodeFault {
    /// Absolute byte offset of the offending record header.
    pub fn offset(&self) -> usize {
        match *self {
            Self::UnknownTag { offset, .. }
            | Self::IntegerOverflow { offset }
            | Self::Truncated { offset } => offset,
        }
    }
}

/// A record that does not match the expected note-body layout.
///
/// `path` names the nested structure being read, e.g. `note/document/string`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaFault {
    #[error("{path}: expected field {expected}, found field {found}")]
    UnexpectedField {
        path: String,
        expected: u32,
        found: u32,
    },

    #[error("{path}: expected field {expected}, found end of structure")]
    MissingField { path: String, expected: u32 },

    #[error("{path}: field {field} is not {expected}")]
    WrongType {
        path: String,
        field: u32,
        expected: &'static str,
    },

    #[error("{path}: nesting exceeds {limit} levels")]
    TooDeep { path: String, limit: usize },

    #[error("{path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: DecodeFault,
    },
}

/// The attribute runs do not cover exactly the decoded text.
///
/// Lengths are in UTF-16 code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("text length {text_len} does not match attribute run total {runs_len}")]
pub struct IntegrityFault {
    pub text_len: usize,
    pub runs_len: usize,
}

/// Where an unrecognised style value was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleSite {
    /// A field of the attribute run itself.
    Attribute,
    /// A field of the nested paragraph-style structure.
    Paragraph,
    /// A field of the nested font structure.
    Font,
    /// A paragraph kind code with no known meaning.
    ParagraphKind,
}

impl std::fmt::Display for StyleSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Attribute => "attribute field",
            Self::Paragraph => "paragraph field",
            Self::Font => "font field",
            Self::ParagraphKind => "paragraph kind",
        };
        f.write_str(name)
    }
}

/// An unrecognised style construct inside one attribute run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("run {run}: unknown {site} {value}")]
pub struct UnknownStyleFault {
    /// 1-based index of the attribute run.
    pub run: usize,
    pub site: StyleSite,
    /// The field index or code that was not recognised.
    pub value: i64,
}

/// A non-fatal fault attached to a decoded note body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Defect {
    #[error(transparent)]
    Schema(#[from] SchemaFault),

    #[error(transparent)]
    Integrity(#[from] IntegrityFault),

    #[error(transparent)]
    UnknownStyle(#[from] UnknownStyleFault),
}
