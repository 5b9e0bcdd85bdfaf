//! # apple-notes-export
//!
//! Decodes the note bodies stored by the macOS Notes app and renders them as
//! plain text, HTML, or Markdown.
//!
//! ## What it does
//!
//! Notes keeps each note body in `NoteStore.sqlite` as a gzip-compressed
//! archive of tagged binary records. The records carry no names, only field
//! numbers, so the layout of a note body is baked into [`note_body`]. Decoding
//! yields the plain text plus a list of attribute runs (paragraph kind, font,
//! bold/italic, links, embedded objects) that partition it, which one of the
//! [`render`] back ends turns into markup.
//!
//! ```text
//! bytes ─► record ─► note_body ─► (text, runs) ─► render ─► String
//! ```
//!
//! The library works on an already decompressed buffer. Reading the database
//! and writing files is left to the `apple-notes-export` binary.
//!
//! ## Faults
//!
//! A damaged or newer-than-expected archive never panics. Decoding fails only
//! when the text cannot be found; anything else is attached to the result as a
//! [`Defect`] and rendering carries on with what was decoded.
//!
//! ## Compatibility
//!
//! The archive layout was worked out by inspecting real notes. New Notes
//! releases may add fields; those surface as defects rather than being
//! guessed at.

pub mod error;
pub mod note_body;
pub mod record;
pub mod render;
pub mod style;

pub use error::{DecodeFault, Defect, IntegrityFault, SchemaFault, UnknownStyleFault};
pub use note_body::{NoteBody, decode_note_body, decode_note_text};
pub use render::{Format, render};
pub use style::{AttributeRun, ParagraphKind, ParagraphStyle, StyleDescriptor};

/// A rendered note and the defects met while decoding it.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub output: String,
    pub defects: Vec<Defect>,
}

/// Decodes a decompressed note body and renders it in `format`.
///
/// [`Format::Text`] stops after the text and never reports style defects.
pub fn convert(bytes: &[u8], format: Format) -> Result<Rendered, SchemaFault> {
    if format == Format::Text {
        return Ok(Rendered {
            output: decode_note_text(bytes)?,
            defects: Vec::new(),
        });
    }
    let body = decode_note_body(bytes)?;
    Ok(Rendered {
        output: render(format, &body.text, &body.runs),
        defects: body.defects,
    })
}
