mod common;

use apple_notes_export::record::{RecordStream, Value};
use apple_notes_export::style::{FontStyle, TextStyle, UrlStyle, codes};
use apple_notes_export::{
    AttributeRun, DecodeFault, Format, ParagraphKind, ParagraphStyle, StyleDescriptor, convert,
    render,
};
use common::{Fields, Note, Run, varint};

fn para(len: usize, style: ParagraphStyle) -> AttributeRun {
    AttributeRun::new(len).with(StyleDescriptor::Paragraph(style))
}

fn bold(len: usize) -> AttributeRun {
    AttributeRun::new(len).with(StyleDescriptor::Text(TextStyle {
        bits: codes::BOLD,
        ..TextStyle::default()
    }))
}

#[test]
fn scenario_a_plain_paragraph() {
    let runs = [para(6, ParagraphStyle::default())];
    assert_eq!(render(Format::Html, "Hello\n", &runs), "<p>\nHello<br/>\n</p>\n");
}

#[test]
fn scenario_b_one_list_for_adjacent_bullets() {
    let bullet = ParagraphStyle::list(ParagraphKind::Bullet, 0);
    let out = render(
        Format::Html,
        "Item one\nItem two\n",
        &[para(9, bullet), para(9, bullet)],
    );
    assert_eq!(out.matches("<ul>").count(), 1);
    assert_eq!(out.matches("</ul>").count(), 1);
    assert_eq!(out.matches("<li>").count(), 2);
    assert_eq!(out, "<ul>\n<li>Item one</li>\n<li>Item two</li>\n</ul>\n");
}

#[test]
fn scenario_c_bold_run() {
    assert_eq!(render(Format::Markdown, "Bold", &[bold(4)]), "**Bold**");
    assert_eq!(render(Format::Annotated, "Bold", &[bold(4)]), "<1>Bold</1>");
}

#[test]
fn scenario_d_checked_nested_item() {
    let runs = [para(5, ParagraphStyle::checklist(true, 1))];
    let out = render(Format::Markdown, "Task\n", &runs);
    assert!(out.starts_with("  - [x] Task"), "{out:?}");
}

#[test]
fn scenario_e_unknown_tag() {
    let bytes = [0x0b, 0x01, 0x02];
    let mut stream = RecordStream::new(&bytes);
    assert_eq!(
        stream.next_record(),
        Err(DecodeFault::UnknownTag { offset: 0, tag: 3 })
    );
    assert_eq!(stream.position(), 1);
    assert_eq!(stream.next_record(), Ok(None));
    assert_eq!(stream.position(), 1);
}

#[test]
fn scenarios_through_the_archive() {
    let bullets = Note::new("Item one\nItem two\n")
        .run(Run::new(9).list(codes::BULLET, 0))
        .run(Run::new(9).list(codes::BULLET, 0))
        .build();
    let html = convert(&bullets, Format::Html).unwrap();
    assert!(html.defects.is_empty(), "{:?}", html.defects);
    assert_eq!(html.output, "<ul>\n<li>Item one</li>\n<li>Item two</li>\n</ul>\n");

    let task = Note::new("Task\n").run(Run::new(5).checklist(true, 1)).build();
    let md = convert(&task, Format::Markdown).unwrap();
    assert_eq!(md.output, "  - [x] Task\n");

    assert_eq!(convert(&task, Format::Text).unwrap().output, "Task\n");
}

#[test]
fn inline_markup_closes_in_reverse_order() {
    let run = para(4, ParagraphStyle::default())
        .with(StyleDescriptor::Url(UrlStyle {
            url: "https://example.com".into(),
        }))
        .with(StyleDescriptor::Font(FontStyle {
            name: None,
            size: 18.0,
        }))
        .with(StyleDescriptor::Text(TextStyle {
            bits: codes::BOLD | codes::ITALIC,
            ..TextStyle::default()
        }));

    assert_eq!(
        render(Format::Html, "link", std::slice::from_ref(&run)),
        "<p>\n<a href=\"https://example.com\"><font size=\"18\"><b><i>link</i></b></font></a></p>\n"
    );
    assert_eq!(
        render(Format::Markdown, "link", &[run]),
        "[<font size=\"18\">**_link_**</font>](https://example.com)"
    );
}

#[test]
fn nested_lists_in_markdown() {
    let runs = [
        para(2, ParagraphStyle::list(ParagraphKind::Bullet, 0)),
        para(2, ParagraphStyle::list(ParagraphKind::Bullet, 1)),
        para(2, ParagraphStyle::list(ParagraphKind::Numbered, 0)),
    ];
    assert_eq!(
        render(Format::Markdown, "a\nb\nc\n", &runs),
        "* a\n  * b\n1. c\n"
    );
}

#[test]
fn list_kind_change_at_same_depth_swaps_containers() {
    let runs = [
        para(2, ParagraphStyle::list(ParagraphKind::Bullet, 0)),
        para(2, ParagraphStyle::list(ParagraphKind::Numbered, 0)),
    ];
    assert_eq!(
        render(Format::Html, "a\nb\n", &runs),
        "<ul>\n<li>a</li>\n</ul>\n<ol>\n<li>b</li>\n</ol>\n"
    );
}

#[test]
fn rendering_is_idempotent() {
    let bytes = Note::new("Title\nSome *text*\n\tindented\n")
        .run(Run::new(6).paragraph(codes::TITLE))
        .run(Run::new(5))
        .run(Run::new(6).bold())
        .run(Run::new(11))
        .build();
    for format in [Format::Text, Format::Annotated, Format::Html, Format::Markdown] {
        let first = convert(&bytes, format).unwrap();
        let second = convert(&bytes, format).unwrap();
        assert_eq!(first, second, "{format:?}");
    }
}

#[test]
fn split_surrogate_pair_rounds_up() {
    let runs = [AttributeRun::new(1), AttributeRun::new(2)];
    assert_eq!(
        render(Format::Annotated, "😀b", &runs),
        "<1>😀</1><2>b</2>"
    );
}

#[test]
fn non_ascii_text_keeps_run_alignment() {
    let bytes = Note::new("héllo wörld")
        .run(Run::new(6).bold())
        .run(Run::new(5))
        .build();
    let out = convert(&bytes, Format::Markdown).unwrap();
    assert!(out.defects.is_empty(), "{:?}", out.defects);
    assert_eq!(out.output, "**héllo** wörld");
}

#[test]
fn blank_line_inside_a_styled_run_gets_no_markup() {
    assert_eq!(
        render(Format::Markdown, "one\n\ntwo", &[bold(8)]),
        "**one**\n\n**two**"
    );
    let html = render(Format::Html, "one\n\ntwo", &[bold(8)]);
    assert!(!html.contains("<b></b>"), "{html:?}");
    assert_eq!(html.matches("<b>").count(), 2);
}

#[test]
fn run_edge_whitespace_stays_outside_inline_markup() {
    let runs = [bold(5), AttributeRun::new(1)];
    assert_eq!(render(Format::Markdown, "bold x", &runs), "**bold** x");
    assert_eq!(render(Format::Html, "a b ", &[bold(4)]), "<p>\n<b>a b</b> </p>\n");
}

#[test]
fn varints_round_trip() {
    let mut samples: Vec<u64> = (0..300).collect();
    samples.extend((0..31).map(|shift| 1u64 << shift));
    samples.extend((1..31).map(|shift| (1u64 << shift) - 1));
    samples.extend((0..2_000u64).map(|i| i * 1_073_741 + 17));
    samples.push(i32::MAX as u64);

    for value in samples {
        let bytes = Fields::new().int(1, value as i32).into_bytes();
        let mut stream = RecordStream::new(&bytes);
        let rec = stream.next_record().unwrap().unwrap();
        assert_eq!(rec.field, 1);
        assert_eq!(rec.value, Value::Integer(value as i32), "{value}");
        assert!(stream.is_exhausted());
    }
}

#[test]
fn negative_integers_use_ten_bytes() {
    let mut bytes = vec![0x08];
    varint(&mut bytes, -5i64 as u64);
    assert_eq!(bytes.len(), 11);
    let rec = RecordStream::new(&bytes).next_record().unwrap().unwrap();
    assert_eq!(rec.as_int(), Some(-5));
}

#[test]
fn floats_are_bit_exact() {
    for value in [0.0f32, -0.0, 1.5, 12.0, f32::MIN_POSITIVE, f32::MAX, 0.1] {
        let bytes = Fields::new().float(2, value).into_bytes();
        let rec = RecordStream::new(&bytes).next_record().unwrap().unwrap();
        match rec.value {
            Value::Float(f) => assert_eq!(f.to_bits(), value.to_bits()),
            other => panic!("expected float, got {other:?}"),
        }
    }
}
