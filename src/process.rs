use crate::exporter::{note_path, write_note};
use crate::store::{self, NoteRow, NoteSummary};
use crate::utils::{
    ExportConfig, OutputFormat, ProcessResult, decompress, is_up_to_date, stamp_mtime,
};
use apple_notes_export::convert;
use eyre::{Context, Result, eyre};
use rusqlite::Connection;
use std::fs::{self, File};
use std::io::{BufWriter, Write};

/// Notes selected by `config`, in note order.
pub fn selected_notes(conn: &Connection, config: &ExportConfig) -> Result<Vec<NoteSummary>> {
    let notes = store::list_notes(conn)?;
    let total = notes.len();
    let selected: Vec<_> = notes
        .into_iter()
        .filter(|n| config.wants(&n.title, n.folder.as_deref()))
        .collect();
    log::info!("{} of {} notes selected", selected.len(), total);
    Ok(selected)
}

/// Decompresses and renders one note body.
pub fn render_note(note: &NoteRow, format: OutputFormat) -> Result<Vec<u8>> {
    let data = note
        .data
        .as_deref()
        .ok_or_else(|| eyre!("note has no data"))?;
    let bytes = decompress(data)?;
    let Some(format) = format.render_format() else {
        return Ok(bytes);
    };
    let rendered = convert(&bytes, format).wrap_err("Failed to decode note body")?;
    for defect in &rendered.defects {
        log::warn!("note {}: {}", note.label(), defect);
    }
    Ok(rendered.output.into_bytes())
}

/// Renders one note into its file under the target directory.
pub fn export_note(note: &NoteRow, config: &ExportConfig) -> Result<(ProcessResult, String)> {
    let path = note_path(&config.target_dir, note, config.format);
    let display = path
        .strip_prefix(&config.target_dir)
        .unwrap_or(&path)
        .display()
        .to_string();
    let existed = path.exists();

    if existed && !config.force && is_up_to_date(&path, note.modified) {
        return Ok((ProcessResult::Skipped, display));
    }

    let body = render_note(note, config.format)?;

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .wrap_err_with(|| format!("Failed to create dir: {}", dir.display()))?;
    }
    let file = File::create(&path)
        .wrap_err_with(|| format!("Failed to create: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_note(&mut writer, note, config.format, &body)?;
    writer.flush()?;
    drop(writer);
    stamp_mtime(&path, note.modified)?;

    let result = if existed {
        ProcessResult::Updated
    } else {
        ProcessResult::Created
    };
    Ok((result, display))
}

/// Writes every selected note to `out`, one after another.
pub fn print_notes<W: Write>(
    conn: &Connection,
    notes: &[NoteSummary],
    config: &ExportConfig,
    out: &mut W,
) -> Result<usize> {
    let mut errors = 0;
    for summary in notes {
        let printed = store::fetch_note(conn, summary.pk)
            .and_then(|note| render_note(&note, config.format).map(|body| (note, body)));
        match printed {
            Ok((note, body)) => {
                write_note(out, &note, config.format, &body)?;
                if config.format != OutputFormat::Raw {
                    writeln!(out)?;
                }
            }
            Err(e) => {
                errors += 1;
                eprintln!("Error [{}]: {:#}", summary.pk, e);
            }
        }
    }
    out.flush()?;
    Ok(errors)
}
