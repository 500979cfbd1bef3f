/*
 * diagnostic.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Text renderings used in error messages.
 */

//! Text renderings attached to fatal errors.
//!
//! - [`render_snippet`]: caret-annotated source excerpt (via ariadne)
//! - [`side_by_side`]: two dumps in adjacent columns
//! - [`numbered_listing`]: a whole document with line numbers

use std::fmt::Write;

/// Render a source excerpt pointing at `line`/`column` (both 1-based).
///
/// Falls back to a plain two-line excerpt if ariadne cannot render the
/// location (e.g. an empty document).
pub fn render_snippet(
    source_name: &str,
    content: &str,
    line: usize,
    column: usize,
    message: &str,
) -> String {
    render_ariadne(source_name, content, line, column, message)
        .unwrap_or_else(|| render_plain(content, line, column, message))
}

fn render_ariadne(
    source_name: &str,
    content: &str,
    line: usize,
    column: usize,
    message: &str,
) -> Option<String> {
    use ariadne::{Config, Label, Report, ReportKind, Source};

    let line_text = content.lines().nth(line.checked_sub(1)?)?;
    let line_start: usize = content
        .lines()
        .take(line - 1)
        .map(|l| l.chars().count() + 1)
        .sum();
    let line_len = line_text.chars().count();
    let start = line_start + column.saturating_sub(1).min(line_len);
    let end = (line_start + line_len).max(start + 1);

    let id = source_name.to_string();
    let report = Report::build(ReportKind::Error, id.clone(), start)
        .with_config(Config::default().with_color(false))
        .with_message(format!("line {}: {}", line, message))
        .with_label(Label::new((id.clone(), start..end)).with_message(message))
        .finish();

    let mut output = Vec::new();
    report
        .write((id, Source::from(content)), &mut output)
        .ok()?;

    String::from_utf8(output).ok()
}

fn render_plain(content: &str, line: usize, column: usize, message: &str) -> String {
    let text = content
        .lines()
        .nth(line.saturating_sub(1))
        .unwrap_or_default();
    let mut result = String::new();
    let _ = writeln!(result, "{:>4} | {}", line, text);
    let _ = writeln!(
        result,
        "     | {}^ {}",
        " ".repeat(column.saturating_sub(1)),
        message
    );
    result
}

/// Lay out two blocks of lines next to each other.
pub fn side_by_side(
    left_title: &str,
    left: &[String],
    right_title: &str,
    right: &[String],
) -> String {
    let width = left
        .iter()
        .map(|l| l.chars().count())
        .chain(std::iter::once(left_title.chars().count()))
        .max()
        .unwrap_or(0)
        + 4;

    let mut result = String::new();
    let _ = writeln!(result, "{:<width$}| {}", left_title, right_title, width = width);
    let _ = writeln!(result, "{}+{}", "-".repeat(width), "-".repeat(width));
    for i in 0..left.len().max(right.len()) {
        let l = left.get(i).map(String::as_str).unwrap_or_default();
        let r = right.get(i).map(String::as_str).unwrap_or_default();
        let _ = writeln!(result, "{:<width$}| {}", l, r, width = width);
    }
    result
}

/// Render a document with 1-based line numbers in a left gutter.
pub fn numbered_listing(content: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let digits = lines.len().to_string().len();
    let mut result = String::new();
    for (i, line) in lines.iter().enumerate() {
        let _ = writeln!(result, "{:>digits$}| {}", i + 1, line, digits = digits);
    }
    result
}
