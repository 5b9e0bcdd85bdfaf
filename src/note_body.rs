//! Schema walk over a decoded note-body archive.
//!
//! The archive is not self-describing, so the layout below is baked in. Each
//! `{n: ...}` is a nested record stream and `n` the field index expected at
//! that position:
//!
//! ```text
//! note     {1: 0, 2: document}
//! document {1: 0, 2: 0, 3: string}
//! string   {2: text, 3: edit*, 4: version, 5: run*}
//! edit     {1: {1: flag, 2: position}, 2: length, 3: {1: .., 2: ..}, [4: bool], [5: next]*}
//! version  {1: {1: bytes, 2: {[1: int]}, 2: {[1: int]}}}
//! run      {1: length, [2: paragraph], [3: font], [5..12: ...]}
//! ```
//!
//! Edit records describe the note's editing history; the text already holds
//! the final state, so they are read only to advance the stream. The edit
//! list ends at the first record with a negative position.
//!
//! Nested streams are tracked on an explicit [`CursorStack`] of borrowed
//! views, bounded by [`MAX_DEPTH`], instead of recursive calls.

use crate::error::{Defect, IntegrityFault, SchemaFault, StyleSite, UnknownStyleFault};
use crate::record::{Record, RecordStream};
use crate::style::{
    AttributeRun, ColorStyle, DEFAULT_FONT_SIZE, FontStyle, ParagraphKind, ParagraphStyle,
    StyleDescriptor, TextStyle, UrlStyle, UuidStyle, utf16_len,
};
use log::debug;
use std::borrow::Cow;

/// Deepest nesting the walker will open.
pub const MAX_DEPTH: usize = 16;

/// The two version markers stored after the edit list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatVersion {
    pub major: Option<i32>,
    pub minor: Option<i32>,
}

/// Plain text and attribute runs of one note.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NoteBody {
    pub text: String,
    pub runs: Vec<AttributeRun>,
    pub version: Option<FormatVersion>,
    /// Non-fatal faults met while decoding. Empty for a well-formed archive.
    pub defects: Vec<Defect>,
}

impl NoteBody {
    pub fn is_clean(&self) -> bool {
        self.defects.is_empty()
    }

    fn check_integrity(&mut self) {
        let text_len = utf16_len(&self.text);
        let runs_len: usize = self.runs.iter().map(|r| r.length).sum();
        if text_len != runs_len {
            debug!("text len {text_len}, attribute len {runs_len}");
            self.defects.push(IntegrityFault { text_len, runs_len }.into());
        }
    }
}

/// Decodes the text and the attribute runs of a note body.
///
/// Returns `Err` only when the text itself cannot be located. Faults after
/// that point are recorded in [`NoteBody::defects`] and the runs decoded so
/// far are kept.
pub fn decode_note_body(bytes: &[u8]) -> Result<NoteBody, SchemaFault> {
    let mut cursors = CursorStack::new(bytes);
    let text = read_text(&mut cursors)?;
    debug!("text len: {}", utf16_len(&text));

    let mut body = NoteBody {
        text,
        ..NoteBody::default()
    };
    if let Err(fault) = read_styles(&mut cursors, &mut body) {
        debug!("note body: {fault}");
        body.defects.push(fault.into());
    }
    body.check_integrity();
    Ok(body)
}

/// Decodes only the plain text of a note body, skipping the style data.
pub fn decode_note_text(bytes: &[u8]) -> Result<String, SchemaFault> {
    read_text(&mut CursorStack::new(bytes))
}

fn read_text(cursors: &mut CursorStack<'_>) -> Result<String, SchemaFault> {
    let marker = cursors.expect_int(1)?;
    if marker != 0 {
        debug!("note marker {marker}");
    }
    cursors.enter_field(2, "document")?;
    cursors.expect_int(1)?;
    cursors.expect_int(2)?;
    cursors.enter_field(3, "string")?;
    Ok(cursors.expect_str(2)?.into_owned())
}

fn read_styles(cursors: &mut CursorStack<'_>, body: &mut NoteBody) -> Result<(), SchemaFault> {
    skip_edits(cursors)?;
    body.version = Some(read_version(cursors)?);
    read_runs(cursors, body)
}

fn skip_edits(cursors: &mut CursorStack<'_>) -> Result<(), SchemaFault> {
    loop {
        cursors.enter_field(3, "edit")?;
        cursors.enter_field(1, "position")?;
        let flag = cursors.expect_int(1)?;
        let pos = cursors.expect_int(2)?;
        cursors.leave();
        if pos < 0 {
            debug!("edit rec: flag {flag} pos {pos}");
            cursors.leave();
            return Ok(());
        }

        let len = cursors.expect_int(2)?;
        cursors.enter_field(3, "origin")?;
        let s1 = cursors.expect_int(1)?;
        let i1 = cursors.expect_int(2)?;
        cursors.leave();

        let mut marked = false;
        let mut links = Vec::new();
        let mut next = cursors.next()?;
        if let Some(rec) = next
            && rec.field == 4
        {
            marked = cursors.bool_of(&rec)?;
            next = cursors.next()?;
        }
        while let Some(rec) = next {
            if rec.field != 5 {
                return Err(cursors.unexpected(5, rec.field));
            }
            links.push(cursors.int_of(&rec)?);
            next = cursors.next()?;
        }
        debug!(
            "edit rec: flag {flag} pos {pos} len {len} s1 {s1} i1 {i1} marked {marked} next {links:?}"
        );
        cursors.leave();
    }
}

fn read_version(cursors: &mut CursorStack<'_>) -> Result<FormatVersion, SchemaFault> {
    cursors.enter_field(4, "version")?;
    cursors.enter_field(1, "data")?;
    let unknown = cursors.expect(1)?;
    if let Some(bytes) = unknown.as_bytes() {
        debug!("version data: {}", hex(bytes));
    }
    let major = read_marker(cursors)?;
    let minor = read_marker(cursors)?;
    cursors.leave();
    cursors.leave();

    let fmt = |v: Option<i32>| v.map_or_else(|| "-".to_string(), |v| format!("{v:02x}"));
    debug!("vers: {} {}", fmt(major), fmt(minor));
    Ok(FormatVersion { major, minor })
}

fn read_marker(cursors: &mut CursorStack<'_>) -> Result<Option<i32>, SchemaFault> {
    cursors.enter_field(2, "marker")?;
    let value = match cursors.next()? {
        Some(rec) if rec.field == 1 => Some(cursors.int_of(&rec)?),
        Some(rec) => return Err(cursors.unexpected(1, rec.field)),
        None => None,
    };
    cursors.leave();
    Ok(value)
}

fn read_runs(cursors: &mut CursorStack<'_>, body: &mut NoteBody) -> Result<(), SchemaFault> {
    let depth = cursors.depth();
    let mut index = 0;
    while let Some(rec) = cursors.next()? {
        index += 1;
        if rec.field != 5 {
            return Err(cursors.unexpected(5, rec.field));
        }

        let mut run = RunBuilder::new(index);
        if let Err(fault) = read_run(cursors, &rec, &mut run) {
            debug!("attr {index}: {fault}");
            cursors.truncate(depth);
            run.defects.push(fault.into());
        }
        let (run, mut defects) = run.finish();
        body.defects.append(&mut defects);
        body.runs.extend(run);
    }
    Ok(())
}

/// Collects one attribute run's fields; whatever was parsed before a fault is
/// kept.
struct RunBuilder {
    index: usize,
    length: Option<usize>,
    paragraph_code: Option<i32>,
    indent: u32,
    checked: bool,
    font: FontStyle,
    text: TextStyle,
    color: Option<ColorStyle>,
    url: Option<String>,
    object: Option<UuidStyle>,
    defects: Vec<Defect>,
}

impl RunBuilder {
    fn new(index: usize) -> Self {
        Self {
            index,
            length: None,
            paragraph_code: None,
            indent: 0,
            checked: false,
            font: FontStyle::default(),
            text: TextStyle::default(),
            color: None,
            url: None,
            object: None,
            defects: Vec::new(),
        }
    }

    fn unknown(&mut self, site: StyleSite, value: i64) {
        debug!("attr {}: unknown {site} {value}", self.index);
        self.defects.push(
            UnknownStyleFault {
                run: self.index,
                site,
                value,
            }
            .into(),
        );
    }

    fn paragraph(&mut self) -> ParagraphStyle {
        let kind = match self.paragraph_code {
            None => ParagraphKind::None,
            Some(code) => match ParagraphKind::from_code(code) {
                Some(kind) => kind,
                None => {
                    self.unknown(StyleSite::ParagraphKind, i64::from(code));
                    ParagraphKind::Unknown(code)
                }
            },
        };
        match kind {
            ParagraphKind::Checklist => ParagraphStyle::checklist(self.checked, self.indent),
            k if k.is_list() => ParagraphStyle::list(k, self.indent),
            k => ParagraphStyle::new(k),
        }
    }

    fn finish(mut self) -> (Option<AttributeRun>, Vec<Defect>) {
        let Some(length) = self.length else {
            return (None, self.defects);
        };
        let paragraph = self.paragraph();
        let mut run = AttributeRun::new(length).with(StyleDescriptor::Paragraph(paragraph));
        if let Some(object) = self.object.take() {
            run.styles.push(StyleDescriptor::Uuid(object));
        }
        if let Some(url) = self.url.take() {
            run.styles.push(StyleDescriptor::Url(UrlStyle { url }));
        }
        if self.font.name.is_some() || self.font.size != DEFAULT_FONT_SIZE {
            run.styles.push(StyleDescriptor::Font(self.font.clone()));
        }
        if !self.text.is_empty() {
            run.styles.push(StyleDescriptor::Text(self.text));
        }
        if let Some(color) = self.color {
            run.styles.push(StyleDescriptor::Color(color));
        }
        (Some(run), self.defects)
    }
}

fn read_run<'a>(
    cursors: &mut CursorStack<'a>,
    rec: &Record<'a>,
    run: &mut RunBuilder,
) -> Result<(), SchemaFault> {
    cursors.enter(rec, "run")?;
    let len = cursors.expect_int(1)?;
    let len = usize::try_from(len).map_err(|_| cursors.wrong_type(1, "a non-negative length"))?;
    run.length = Some(len);

    while let Some(field) = cursors.next()? {
        match field.field {
            2 => read_paragraph(cursors, &field, run)?,
            3 => read_font(cursors, &field, run)?,
            5 => run.text.bits = cursors.int_of(&field)?,
            6 => run.text.underline = Some(cursors.int_of(&field)?),
            7 => run.text.strikethrough = Some(cursors.int_of(&field)?),
            8 => run.text.baseline = Some(cursors.int_of(&field)?),
            9 => run.url = Some(cursors.str_of(&field)?.into_owned()),
            10 => run.color = Some(read_color(cursors, &field)?),
            11 => {
                let value = cursors.int_of(&field)?;
                debug!("attr {}: field 11 = {value}", run.index);
            }
            12 => run.object = Some(read_object(cursors, &field)?),
            other => {
                run.unknown(StyleSite::Attribute, i64::from(other));
                break;
            }
        }
    }
    cursors.leave();
    Ok(())
}

fn read_paragraph<'a>(
    cursors: &mut CursorStack<'a>,
    rec: &Record<'a>,
    run: &mut RunBuilder,
) -> Result<(), SchemaFault> {
    cursors.enter(rec, "paragraph")?;
    while let Some(field) = cursors.next()? {
        match field.field {
            1 => run.paragraph_code = Some(cursors.int_of(&field)?),
            4 => {
                let value = cursors.int_of(&field)?;
                match u32::try_from(value) {
                    Ok(indent) => run.indent = indent,
                    Err(_) => run.unknown(StyleSite::Paragraph, i64::from(value)),
                }
            }
            5 => {
                cursors.enter(&field, "checkbox")?;
                while let Some(item) = cursors.next()? {
                    if item.field == 2 {
                        run.checked = cursors.bool_of(&item)?;
                    }
                }
                cursors.leave();
            }
            2 | 3 | 7 => {
                let value = cursors.int_of(&field)?;
                debug!("attr {}: paragraph field {} = {value}", run.index, field.field);
            }
            other => {
                run.unknown(StyleSite::Paragraph, i64::from(other));
                break;
            }
        }
    }
    cursors.leave();
    Ok(())
}

fn read_font<'a>(
    cursors: &mut CursorStack<'a>,
    rec: &Record<'a>,
    run: &mut RunBuilder,
) -> Result<(), SchemaFault> {
    cursors.enter(rec, "font")?;
    while let Some(field) = cursors.next()? {
        match field.field {
            1 => run.font.name = Some(cursors.str_of(&field)?.into_owned()),
            2 => run.font.size = cursors.float_of(&field)?,
            // Always 1 when present.
            3 => {
                let value = cursors.int_of(&field)?;
                debug!("attr {}: font-byte {value}", run.index);
            }
            other => {
                run.unknown(StyleSite::Font, i64::from(other));
                break;
            }
        }
    }
    cursors.leave();
    Ok(())
}

fn read_color<'a>(
    cursors: &mut CursorStack<'a>,
    rec: &Record<'a>,
) -> Result<ColorStyle, SchemaFault> {
    cursors.enter(rec, "color")?;
    let color = ColorStyle {
        red: cursors.expect_float(1)?,
        green: cursors.expect_float(2)?,
        blue: cursors.expect_float(3)?,
        alpha: cursors.expect_float(4)?,
    };
    cursors.leave();
    Ok(color)
}

fn read_object<'a>(
    cursors: &mut CursorStack<'a>,
    rec: &Record<'a>,
) -> Result<UuidStyle, SchemaFault> {
    cursors.enter(rec, "object")?;
    let uuid = cursors.expect_str(1)?.into_owned();
    let kind = cursors.expect_str(2)?.into_owned();
    cursors.leave();
    Ok(UuidStyle { uuid, kind })
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

struct Frame<'a> {
    name: &'static str,
    stream: RecordStream<'a>,
}

/// Stack of nested record streams, innermost on top.
///
/// Every read goes to the top stream. Faults carry the names of all open
/// frames as their path.
pub(crate) struct CursorStack<'a> {
    frames: Vec<Frame<'a>>,
}

impl<'a> CursorStack<'a> {
    pub(crate) fn new(root: &'a [u8]) -> Self {
        Self {
            frames: vec![Frame {
                name: "note",
                stream: RecordStream::new(root),
            }],
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    fn path(&self) -> String {
        self.frames
            .iter()
            .map(|f| f.name)
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Opens `rec`'s byte payload as the new top stream.
    pub(crate) fn enter(&mut self, rec: &Record<'a>, name: &'static str) -> Result<(), SchemaFault> {
        let stream = rec
            .open()
            .ok_or_else(|| self.wrong_type(rec.field, "a nested structure"))?;
        if self.frames.len() >= MAX_DEPTH {
            return Err(SchemaFault::TooDeep {
                path: self.path(),
                limit: MAX_DEPTH,
            });
        }
        self.frames.push(Frame { name, stream });
        Ok(())
    }

    pub(crate) fn enter_field(&mut self, field: u32, name: &'static str) -> Result<(), SchemaFault> {
        let rec = self.expect(field)?;
        self.enter(&rec, name)
    }

    /// Drops the top stream. The root is never dropped.
    pub(crate) fn leave(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub(crate) fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth.max(1));
    }

    pub(crate) fn next(&mut self) -> Result<Option<Record<'a>>, SchemaFault> {
        let top = self.frames.len() - 1;
        self.frames[top]
            .stream
            .next_record()
            .map_err(|source| SchemaFault::Decode {
                path: self.path(),
                source,
            })
    }

    pub(crate) fn expect(&mut self, field: u32) -> Result<Record<'a>, SchemaFault> {
        match self.next()? {
            Some(rec) if rec.field == field => Ok(rec),
            Some(rec) => Err(self.unexpected(field, rec.field)),
            None => Err(SchemaFault::MissingField {
                path: self.path(),
                expected: field,
            }),
        }
    }

    pub(crate) fn expect_int(&mut self, field: u32) -> Result<i32, SchemaFault> {
        let rec = self.expect(field)?;
        self.int_of(&rec)
    }

    pub(crate) fn expect_float(&mut self, field: u32) -> Result<f32, SchemaFault> {
        let rec = self.expect(field)?;
        self.float_of(&rec)
    }

    pub(crate) fn expect_str(&mut self, field: u32) -> Result<Cow<'a, str>, SchemaFault> {
        let rec = self.expect(field)?;
        self.str_of(&rec)
    }

    pub(crate) fn int_of(&self, rec: &Record<'a>) -> Result<i32, SchemaFault> {
        rec.as_int()
            .ok_or_else(|| self.wrong_type(rec.field, "an integer"))
    }

    pub(crate) fn bool_of(&self, rec: &Record<'a>) -> Result<bool, SchemaFault> {
        rec.as_bool()
            .ok_or_else(|| self.wrong_type(rec.field, "a boolean"))
    }

    pub(crate) fn float_of(&self, rec: &Record<'a>) -> Result<f32, SchemaFault> {
        rec.as_float()
            .ok_or_else(|| self.wrong_type(rec.field, "a float"))
    }

    pub(crate) fn str_of(&self, rec: &Record<'a>) -> Result<Cow<'a, str>, SchemaFault> {
        rec.as_str()
            .ok_or_else(|| self.wrong_type(rec.field, "a string"))
    }

    pub(crate) fn unexpected(&self, expected: u32, found: u32) -> SchemaFault {
        SchemaFault::UnexpectedField {
            path: self.path(),
            expected,
            found,
        }
    }

    pub(crate) fn wrong_type(&self, field: u32, expected: &'static str) -> SchemaFault {
        SchemaFault::WrongType {
            path: self.path(),
            field,
            expected,
        }
    }
}
