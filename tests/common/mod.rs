//! Builders for hand-made note-body archives.
#![allow(dead_code)]

use apple_notes_export::style::codes;

pub fn varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// A record stream under construction.
#[derive(Clone, Default)]
pub struct Fields(pub Vec<u8>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn int(mut self, field: u32, value: i32) -> Self {
        varint(&mut self.0, u64::from(field << 3));
        varint(&mut self.0, value as i64 as u64);
        self
    }

    pub fn float(mut self, field: u32, value: f32) -> Self {
        varint(&mut self.0, u64::from(field << 3 | 5));
        self.0.extend(value.to_le_bytes());
        self
    }

    pub fn bytes(mut self, field: u32, value: &[u8]) -> Self {
        varint(&mut self.0, u64::from(field << 3 | 2));
        varint(&mut self.0, value.len() as u64);
        self.0.extend(value);
        self
    }

    pub fn str(self, field: u32, value: &str) -> Self {
        self.bytes(field, value.as_bytes())
    }

    pub fn nested(self, field: u32, inner: Fields) -> Self {
        self.bytes(field, &inner.0)
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.0.extend(bytes);
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// One attribute run.
#[derive(Clone)]
pub struct Run(Fields);

impl Run {
    pub fn new(length: i32) -> Self {
        Self(Fields::new().int(1, length))
    }

    pub fn paragraph(self, code: i32) -> Self {
        self.paragraph_fields(Fields::new().int(1, code))
    }

    pub fn list(self, code: i32, indent: i32) -> Self {
        self.paragraph_fields(Fields::new().int(1, code).int(4, indent))
    }

    pub fn checklist(self, checked: bool, indent: i32) -> Self {
        self.paragraph_fields(
            Fields::new()
                .int(1, codes::CHECKLIST)
                .int(4, indent)
                .nested(5, Fields::new().bytes(1, b"\x01\x02").int(2, checked as i32)),
        )
    }

    pub fn paragraph_fields(self, fields: Fields) -> Self {
        Self(self.0.nested(2, fields))
    }

    pub fn font(self, name: &str, size: f32) -> Self {
        Self(self.0.nested(3, Fields::new().str(1, name).float(2, size)))
    }

    pub fn bits(self, bits: i32) -> Self {
        Self(self.0.int(5, bits))
    }

    pub fn bold(self) -> Self {
        self.bits(codes::BOLD)
    }

    pub fn url(self, url: &str) -> Self {
        Self(self.0.str(9, url))
    }

    pub fn color(self, rgba: [f32; 4]) -> Self {
        Self(
            self.0.nested(
                10,
                Fields::new()
                    .float(1, rgba[0])
                    .float(2, rgba[1])
                    .float(3, rgba[2])
                    .float(4, rgba[3]),
            ),
        )
    }

    pub fn object(self, uuid: &str, kind: &str) -> Self {
        Self(self.0.nested(12, Fields::new().str(1, uuid).str(2, kind)))
    }

    pub fn int(self, field: u32, value: i32) -> Self {
        Self(self.0.int(field, value))
    }

    pub fn raw(self, bytes: &[u8]) -> Self {
        Self(self.0.raw(bytes))
    }
}

/// A full note body: text, edit history, version block and runs.
#[derive(Clone)]
pub struct Note {
    text: String,
    edits: Vec<Fields>,
    version: (Option<i32>, Option<i32>),
    runs: Vec<Run>,
}

impl Note {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            edits: Vec::new(),
            version: (Some(1), Some(0)),
            runs: Vec::new(),
        }
    }

    pub fn edit(mut self, position: i32, length: i32) -> Self {
        self.edits.push(
            Fields::new()
                .nested(1, Fields::new().int(1, 0).int(2, position))
                .int(2, length)
                .nested(3, Fields::new().int(1, 1).int(2, 2))
                .int(4, 1)
                .int(5, 3),
        );
        self
    }

    pub fn version(mut self, major: Option<i32>, minor: Option<i32>) -> Self {
        self.version = (major, minor);
        self
    }

    pub fn run(mut self, run: Run) -> Self {
        self.runs.push(run);
        self
    }

    /// The string structure without its closing runs, for custom tails.
    pub fn string_fields(&self) -> Fields {
        let mut string = Fields::new().str(2, &self.text);
        for edit in &self.edits {
            string = string.nested(3, edit.clone());
        }
        let terminator = Fields::new().nested(1, Fields::new().int(1, 0).int(2, -1));
        string = string.nested(3, terminator);

        let marker = |value: Option<i32>| match value {
            Some(v) => Fields::new().int(1, v),
            None => Fields::new(),
        };
        let data = Fields::new()
            .bytes(1, &[0xde, 0xad])
            .nested(2, marker(self.version.0))
            .nested(2, marker(self.version.1));
        string.nested(4, Fields::new().nested(1, data))
    }

    pub fn wrap(string: Fields) -> Vec<u8> {
        let document = Fields::new().int(1, 0).int(2, 0).nested(3, string);
        Fields::new().int(1, 0).nested(2, document).into_bytes()
    }

    pub fn build(&self) -> Vec<u8> {
        let mut string = self.string_fields();
        for run in &self.runs {
            string = string.nested(5, run.0.clone());
        }
        Self::wrap(string)
    }
}
