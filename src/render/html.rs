//! HTML fragment renderer.

use super::{LineContext, Markup, drive, expand_leading_whitespace};
use crate::style::{AttributeRun, ParagraphKind, ParagraphStyle, StyleDescriptor};
use std::fmt::Write;

pub fn render(text: &str, runs: &[AttributeRun]) -> String {
    drive(&mut Html, text, runs)
}

struct Html;

impl Markup for Html {
    fn open_block(&mut self, out: &mut String, style: &ParagraphStyle) {
        match style.kind {
            ParagraphKind::None => out.push_str("<p>\n"),
            ParagraphKind::Title => out.push_str("<h1>\n"),
            ParagraphKind::Heading => out.push_str("<h2>\n"),
            ParagraphKind::Subheading => out.push_str("<h3>\n"),
            ParagraphKind::Mono => out.push_str("<code>\n"),
            ParagraphKind::Bullet | ParagraphKind::Dashed | ParagraphKind::Checklist => {
                out.push_str("<ul>\n")
            }
            ParagraphKind::Numbered => out.push_str("<ol>\n"),
            ParagraphKind::Unknown(code) => {
                let _ = writeln!(out, "<div style=\"{code}\">");
            }
        }
    }

    fn close_block(&mut self, out: &mut String, style: &ParagraphStyle) {
        let close = match style.kind {
            ParagraphKind::None => "</p>\n",
            ParagraphKind::Title => "</h1>\n",
            ParagraphKind::Heading => "</h2>\n",
            ParagraphKind::Subheading => "</h3>\n",
            ParagraphKind::Mono => "</code>\n",
            ParagraphKind::Bullet | ParagraphKind::Dashed | ParagraphKind::Checklist => "</ul>\n",
            ParagraphKind::Numbered => "</ol>\n",
            ParagraphKind::Unknown(_) => "</div>\n",
        };
        out.push_str(close);
    }

    fn start_line<'l>(
        &mut self,
        out: &mut String,
        style: &ParagraphStyle,
        line: &'l str,
        _ctx: LineContext,
    ) -> &'l str {
        match style.kind {
            ParagraphKind::None => return expand_leading_whitespace(out, line),
            ParagraphKind::Bullet | ParagraphKind::Dashed | ParagraphKind::Numbered => {
                out.push_str("<li>")
            }
            ParagraphKind::Checklist if style.checked => {
                out.push_str("<li><input checked=\"\" disabled=\"\" type=\"checkbox\">")
            }
            ParagraphKind::Checklist => out.push_str("<li><input disabled=\"\" type=\"checkbox\">"),
            ParagraphKind::Title
            | ParagraphKind::Heading
            | ParagraphKind::Subheading
            | ParagraphKind::Mono
            | ParagraphKind::Unknown(_) => {}
        }
        line
    }

    fn open_inline(
        &self,
        out: &mut String,
        style: &StyleDescriptor,
        _block: &ParagraphStyle,
        closes: &mut Vec<String>,
    ) {
        match style {
            StyleDescriptor::Uuid(object) => {
                let _ = write!(out, "<INSERT UUID {}, TYPE {}>", object.uuid, object.kind);
                closes.push("</INSERT>".into());
            }
            StyleDescriptor::Url(link) => {
                out.push_str("<a href=\"");
                escape_into(out, &link.url, true);
                out.push_str("\">");
                closes.push("</a>".into());
            }
            StyleDescriptor::Font(font) => {
                // The font name is not rendered.
                let _ = write!(out, "<font size=\"{}\">", font.size_label());
                closes.push("</font>".into());
            }
            StyleDescriptor::Text(text) => {
                if text.bold() {
                    out.push_str("<b>");
                    closes.push("</b>".into());
                }
                if text.italic() {
                    out.push_str("<i>");
                    closes.push("</i>".into());
                }
            }
            StyleDescriptor::Color(_) | StyleDescriptor::Paragraph(_) => {}
        }
    }

    fn escape(&mut self, out: &mut String, text: &str, _block: &ParagraphStyle) {
        escape_into(out, text, false);
    }

    fn end_line(&mut self, out: &mut String, block: &ParagraphStyle) {
        let terminator = match block.kind {
            ParagraphKind::None | ParagraphKind::Mono => "<br/>\n",
            ParagraphKind::Bullet
            | ParagraphKind::Dashed
            | ParagraphKind::Numbered
            | ParagraphKind::Checklist => "</li>\n",
            ParagraphKind::Title
            | ParagraphKind::Heading
            | ParagraphKind::Subheading
            | ParagraphKind::Unknown(_) => "\n",
        };
        out.push_str(terminator);
    }
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}
