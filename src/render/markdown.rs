//! Markdown renderer.
//!
//! Headings and list items are prefixed per line, monospaced blocks become
//! fenced code. Consecutive plain lines are joined with a backslash hard
//! break so they do not collapse into one paragraph.

use super::{LineContext, Markup, drive, expand_leading_whitespace};
use crate::style::{AttributeRun, ParagraphKind, ParagraphStyle, StyleDescriptor};
use std::fmt::Write;

const FENCE: &str = "```\n";

pub fn render(text: &str, runs: &[AttributeRun]) -> String {
    drive(&mut Markdown::default(), text, runs)
}

#[derive(Default)]
struct Markdown {
    /// Set while a plain line has started but none of its text is out yet.
    line_start: bool,
}

impl Markup for Markdown {
    fn open_block(&mut self, out: &mut String, style: &ParagraphStyle) {
        ensure_newline(out);
        match style.kind {
            ParagraphKind::None => ensure_blank_line(out),
            ParagraphKind::Mono => {
                ensure_blank_line(out);
                out.push_str(FENCE);
            }
            ParagraphKind::Unknown(code) => {
                let _ = writeln!(out, "<div style=\"{code}\">");
            }
            ParagraphKind::Title
            | ParagraphKind::Heading
            | ParagraphKind::Subheading
            | ParagraphKind::Bullet
            | ParagraphKind::Dashed
            | ParagraphKind::Numbered
            | ParagraphKind::Checklist => {}
        }
    }

    fn close_block(&mut self, out: &mut String, style: &ParagraphStyle) {
        match style.kind {
            ParagraphKind::Mono => {
                ensure_newline(out);
                out.push_str(FENCE);
            }
            ParagraphKind::Unknown(_) => {
                ensure_newline(out);
                out.push_str("</div>\n");
            }
            ParagraphKind::None
            | ParagraphKind::Title
            | ParagraphKind::Heading
            | ParagraphKind::Subheading
            | ParagraphKind::Bullet
            | ParagraphKind::Dashed
            | ParagraphKind::Numbered
            | ParagraphKind::Checklist => {}
        }
    }

    fn start_line<'l>(
        &mut self,
        out: &mut String,
        style: &ParagraphStyle,
        line: &'l str,
        ctx: LineContext,
    ) -> &'l str {
        let heading = |out: &mut String, prefix: &str| {
            if !line.is_empty() {
                out.push_str(prefix);
            }
        };
        self.line_start = false;
        match style.kind {
            ParagraphKind::None => {
                if ctx.follows_text && out.ends_with('\n') {
                    out.pop();
                    out.push_str("\\\n");
                }
                self.line_start = true;
                return expand_leading_whitespace(out, line);
            }
            ParagraphKind::Title => heading(out, "# "),
            ParagraphKind::Heading => heading(out, "## "),
            ParagraphKind::Subheading => heading(out, "### "),
            ParagraphKind::Bullet => list_prefix(out, style.indent, "* "),
            ParagraphKind::Dashed => list_prefix(out, style.indent, "- "),
            ParagraphKind::Numbered => list_prefix(out, style.indent, "1. "),
            ParagraphKind::Checklist if style.checked => list_prefix(out, style.indent, "- [x] "),
            ParagraphKind::Checklist => list_prefix(out, style.indent, "- [ ] "),
            ParagraphKind::Mono | ParagraphKind::Unknown(_) => {}
        }
        line
    }

    fn open_inline(
        &self,
        out: &mut String,
        style: &StyleDescriptor,
        block: &ParagraphStyle,
        closes: &mut Vec<String>,
    ) {
        let in_code = block.kind == ParagraphKind::Mono;
        match style {
            StyleDescriptor::Uuid(object) => {
                let _ = write!(out, "<INSERT UUID {}, TYPE {}>", object.uuid, object.kind);
                closes.push(String::new());
            }
            _ if in_code => {}
            StyleDescriptor::Url(link) => {
                out.push('[');
                closes.push(format!("]({})", link.url));
            }
            StyleDescriptor::Font(font) => {
                let _ = write!(out, "<font size=\"{}\">", font.size_label());
                closes.push("</font>".into());
            }
            StyleDescriptor::Text(text) => {
                if text.bold() {
                    out.push_str("**");
                    closes.push("**".into());
                }
                if text.italic() {
                    out.push('_');
                    closes.push("_".into());
                }
            }
            StyleDescriptor::Color(_) | StyleDescriptor::Paragraph(_) => {}
        }
    }

    fn escape(&mut self, out: &mut String, text: &str, block: &ParagraphStyle) {
        if block.kind == ParagraphKind::Mono {
            out.push_str(text);
            return;
        }
        let mut text = text;
        if self.line_start && !text.is_empty() {
            self.line_start = false;
            text = escape_line_start(out, text);
        }
        for c in text.chars() {
            if matches!(c, '\\' | '*' | '_' | '`' | '[' | ']' | '<') {
                out.push('\\');
            }
            out.push(c);
        }
    }

    fn end_line(&mut self, out: &mut String, _block: &ParagraphStyle) {
        self.line_start = false;
        out.push('\n');
    }
}

/// Escapes a heading, quote or list marker at the start of a plain line.
///
/// Ordered-list digits are written out here, so the returned part starts at
/// the escaped `.` or `)`.
fn escape_line_start<'l>(out: &mut String, rest: &'l str) -> &'l str {
    if rest.starts_with(['#', '-', '+', '>']) {
        out.push('\\');
        return rest;
    }
    let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 && rest[digits..].starts_with(['.', ')']) {
        out.push_str(&rest[..digits]);
        out.push('\\');
        return &rest[digits..];
    }
    rest
}

fn list_prefix(out: &mut String, indent: u32, marker: &str) {
    for _ in 0..indent {
        out.push_str("  ");
    }
    out.push_str(marker);
}

fn ensure_newline(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

/// Makes the output end in an empty line, unless it is empty.
fn ensure_blank_line(out: &mut String) {
    if out.is_empty() || out.ends_with("\n\n") || out == "\n" {
        return;
    }
    if out.ends_with('\n') {
        out.push('\n');
    } else {
        out.push_str("\n\n");
    }
}
