//! Run-boundary view for debugging attribute runs.
//!
//! Each run's text is wrapped in `<N>`…`</N>`, numbered from 1. Styles are
//! not shown.

use super::segments;
use crate::style::AttributeRun;
use std::fmt::Write;

pub fn render(text: &str, runs: &[AttributeRun]) -> String {
    let mut out = String::with_capacity(text.len() + runs.len() * 8);
    for (n, _, slice) in segments(text, runs) {
        let _ = write!(out, "<{n}>{slice}</{n}>");
    }
    out
}
