//! Rendering of decoded note bodies.
//!
//! [`render`] turns `(text, runs)` into one of the [`Format`]s. HTML and
//! Markdown share the [`drive`] loop, which walks the runs line by line and
//! keeps block structure in a [`BlockStack`]; each format only supplies the
//! markup for the transitions through the [`Markup`] trait.

pub mod annotated;
pub mod html;
pub mod markdown;

use crate::style::{AttributeRun, ParagraphStyle, StyleDescriptor};

/// Output formats produced by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// The plain text, no markup.
    Text,
    /// Each run wrapped in numbered `<N>`…`</N>` markers.
    Annotated,
    Html,
    #[default]
    Markdown,
}

/// Renders a note body. Never fails; malformed runs are clamped to the text.
pub fn render(format: Format, text: &str, runs: &[AttributeRun]) -> String {
    match format {
        Format::Text => text.to_string(),
        Format::Annotated => annotated::render(text, runs),
        Format::Html => html::render(text, runs),
        Format::Markdown => markdown::render(text, runs),
    }
}

/// A change to the open block structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOp {
    Open(ParagraphStyle),
    Close(ParagraphStyle),
}

/// The open block groupings, outermost first.
///
/// An empty stack means no block is open. Nested lists push one level per
/// indent step; every other block kind occupies the stack alone.
#[derive(Debug, Clone, Default)]
pub struct BlockStack {
    open: Vec<ParagraphStyle>,
}

impl BlockStack {
    /// The innermost open block.
    pub fn current(&self) -> Option<&ParagraphStyle> {
        self.open.last()
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Moves to `next` and returns the closes and opens that takes.
    ///
    /// Between list styles, a deeper indent opens a level inside the current
    /// one and a shallower indent closes only the deeper levels, so sibling
    /// items never reopen their list.
    pub fn transition(&mut self, next: ParagraphStyle) -> Vec<BlockOp> {
        let Some(&top) = self.open.last() else {
            self.open.push(next);
            return vec![BlockOp::Open(next)];
        };

        let mut ops = Vec::new();
        if top.is_list() && next.is_list() {
            if next.indent > top.indent {
                self.open.push(next);
                return vec![BlockOp::Open(next)];
            }
            while let Some(&deeper) = self.open.last()
                && deeper.is_list()
                && deeper.indent > next.indent
            {
                self.open.pop();
                ops.push(BlockOp::Close(deeper));
            }
            match self.open.last().copied() {
                Some(level) if level.same_block(&next) => {
                    self.replace_top(next);
                }
                Some(level) if level.is_list() && level.indent < next.indent => {
                    self.open.push(next);
                    ops.push(BlockOp::Open(next));
                }
                Some(level) if level.is_list() => {
                    self.open.pop();
                    ops.push(BlockOp::Close(level));
                    self.open.push(next);
                    ops.push(BlockOp::Open(next));
                }
                _ => {
                    ops.extend(self.close_all());
                    self.open.push(next);
                    ops.push(BlockOp::Open(next));
                }
            }
            return ops;
        }

        if top.same_block(&next) {
            self.replace_top(next);
            return ops;
        }
        ops.extend(self.close_all());
        self.open.push(next);
        ops.push(BlockOp::Open(next));
        ops
    }

    /// Closes every open level, innermost first.
    pub fn close_all(&mut self) -> Vec<BlockOp> {
        let mut ops = Vec::with_capacity(self.open.len());
        while let Some(style) = self.open.pop() {
            ops.push(BlockOp::Close(style));
        }
        ops
    }

    fn replace_top(&mut self, style: ParagraphStyle) {
        if let Some(top) = self.open.last_mut() {
            *top = style;
        }
    }
}

/// Context handed to [`Markup::start_line`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LineContext {
    /// No block changed since the previous line, and both that line and this
    /// one carry text.
    pub follows_text: bool,
}

/// Format-specific markup emitted by [`drive`].
pub trait Markup {
    fn open_block(&mut self, out: &mut String, style: &ParagraphStyle);

    fn close_block(&mut self, out: &mut String, style: &ParagraphStyle);

    /// Emits the prefix for a line that starts a new output line and returns
    /// the part of `line` still to be printed.
    fn start_line<'l>(
        &mut self,
        out: &mut String,
        style: &ParagraphStyle,
        line: &'l str,
        ctx: LineContext,
    ) -> &'l str;

    /// Emits the opening markup for `style` and pushes its closing markup.
    fn open_inline(
        &self,
        out: &mut String,
        style: &StyleDescriptor,
        block: &ParagraphStyle,
        closes: &mut Vec<String>,
    );

    fn escape(&mut self, out: &mut String, text: &str, block: &ParagraphStyle);

    /// Emits the terminator for a line that ended in a newline.
    fn end_line(&mut self, out: &mut String, block: &ParagraphStyle);
}

/// Renders `(text, runs)` through `markup`.
pub fn drive<M: Markup>(markup: &mut M, text: &str, runs: &[AttributeRun]) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    let mut blocks = BlockStack::default();
    let mut line_has_text = false;
    let mut prev_line_had_text = false;

    for (_, run, slice) in segments(text, runs) {
        let para = run.paragraph();
        for (line, newline) in split_lines(slice) {
            let ops = blocks.transition(para);
            let moved = !ops.is_empty();
            apply(markup, &mut out, &ops);

            let mut rest = line;
            if out.is_empty() || out.ends_with('\n') {
                let ctx = LineContext {
                    follows_text: !moved && prev_line_had_text && !line.is_empty(),
                };
                rest = markup.start_line(&mut out, &para, line, ctx);
            }

            // Inline markup wraps only the non-blank core of the slice.
            let (lead, core, trail) = split_edges(rest);
            markup.escape(&mut out, lead, &para);
            if !core.is_empty() {
                let mut closes = Vec::new();
                for style in run.inline_styles() {
                    markup.open_inline(&mut out, style, &para, &mut closes);
                }
                markup.escape(&mut out, core, &para);
                while let Some(close) = closes.pop() {
                    out.push_str(&close);
                }
            }
            markup.escape(&mut out, trail, &para);

            line_has_text |= !line.is_empty();
            if newline {
                let current = blocks.current().copied().unwrap_or_default();
                markup.end_line(&mut out, &current);
                prev_line_had_text = line_has_text;
                line_has_text = false;
            }
        }
    }

    apply(markup, &mut out, &blocks.close_all());
    out
}

fn apply<M: Markup>(markup: &mut M, out: &mut String, ops: &[BlockOp]) {
    for op in ops {
        match op {
            BlockOp::Open(style) => markup.open_block(out, style),
            BlockOp::Close(style) => markup.close_block(out, style),
        }
    }
}

/// Slices `text` by the runs' UTF-16 lengths, yielding `(n, run, slice)` with
/// `n` counted from 1.
///
/// Slices are clamped to the text. A boundary inside a surrogate pair rounds
/// up to the end of that character. Runs past the end of the text are not
/// yielded, except zero-length ones.
pub fn segments<'t, 'r>(
    text: &'t str,
    runs: &'r [AttributeRun],
) -> impl Iterator<Item = (usize, &'r AttributeRun, &'t str)> {
    let mut start = 0;
    runs.iter()
        .enumerate()
        .filter_map(move |(i, run)| {
            if start >= text.len() && run.length > 0 {
                return None;
            }
            let end = advance_utf16(text, start, run.length);
            let slice = &text[start..end];
            start = end;
            Some((i + 1, run, slice))
        })
}

fn advance_utf16(text: &str, start: usize, units: usize) -> usize {
    let mut remaining = units;
    let mut end = start;
    for c in text[start..].chars() {
        if remaining == 0 {
            break;
        }
        remaining = remaining.saturating_sub(c.len_utf16());
        end += c.len_utf8();
    }
    end
}

/// Splits at `\n`, yielding each line without its newline plus whether it had
/// one. An empty slice yields one empty line.
pub fn split_lines(slice: &str) -> impl Iterator<Item = (&str, bool)> {
    let mut rest = Some(slice);
    std::iter::from_fn(move || {
        let cur = rest?;
        match cur.find('\n') {
            Some(i) => {
                let tail = &cur[i + 1..];
                rest = (!tail.is_empty()).then_some(tail);
                Some((&cur[..i], true))
            }
            None => {
                rest = None;
                Some((cur, false))
            }
        }
    })
}

const NBSP: &str = "&nbsp;";
const NBSP_TAB: &str = "&nbsp;&nbsp;&nbsp;&nbsp;&nbsp;&nbsp;&nbsp;&nbsp;";

/// Replaces the leading spaces and tabs of `line` with non-breaking spaces,
/// eight per tab. Returns the rest of the line.
/// Splits `s` into leading whitespace, core and trailing whitespace.
fn split_edges(s: &str) -> (&str, &str, &str) {
    let start = s.len() - s.trim_start().len();
    let end = s.trim_end().len().max(start);
    (&s[..start], &s[start..end], &s[end..])
}

pub(crate) fn expand_leading_whitespace<'l>(out: &mut String, line: &'l str) -> &'l str {
    let rest = line.trim_start_matches([' ', '\t']);
    for c in line[..line.len() - rest.len()].chars() {
        out.push_str(if c == '\t' { NBSP_TAB } else { NBSP });
    }
    rest
}
