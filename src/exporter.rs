use crate::store::NoteRow;
use crate::utils::OutputFormat;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Folder used for rows that no longer belong to a folder.
pub const DELETED_FOLDER: &str = "Deleted";

#[derive(Serialize)]
struct Frontmatter<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    folder: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified: Option<DateTime<Utc>>,
}

/// `<target>/<folder>/<pk>_<slug>.<ext>`; the pk keeps equal titles apart.
pub fn note_path(target_dir: &Path, note: &NoteRow, format: OutputFormat) -> PathBuf {
    let folder = note
        .folder
        .as_deref()
        .map(folder_dir_name)
        .unwrap_or_else(|| DELETED_FOLDER.to_string());
    target_dir
        .join(folder)
        .join(format!("{}.{}", file_stem(note.pk, &note.title), format.extension()))
}

fn file_stem(pk: i64, title: &str) -> String {
    let raw_slug = slug::slugify(title);
    // slug output is ASCII-only, so byte == char
    let slug = raw_slug[..raw_slug.len().min(60)].trim_end_matches('-');
    if slug.is_empty() {
        pk.to_string()
    } else {
        format!("{pk}_{slug}")
    }
}

/// Folder titles are user text; keep them readable but path-safe.
fn folder_dir_name(folder: &str) -> String {
    let cleaned: String = folder
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.');
    if cleaned.is_empty() {
        "Untitled".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Writes one exported note. Markdown gets a YAML frontmatter block first.
pub fn write_note<W: Write>(
    writer: &mut W,
    note: &NoteRow,
    format: OutputFormat,
    body: &[u8],
) -> std::io::Result<()> {
    if format == OutputFormat::Markdown {
        let fm = Frontmatter {
            title: &note.title,
            folder: note.folder.as_deref(),
            id: note.identifier.as_deref(),
            created: note.created,
            modified: note.modified,
        };
        let yaml = serde_yaml::to_string(&fm).map_err(std::io::Error::other)?;
        writeln!(writer, "---")?;
        write!(writer, "{yaml}")?;
        writeln!(writer, "---")?;
        writeln!(writer)?;
    }
    writer.write_all(body)?;
    if format != OutputFormat::Raw && !body.is_empty() && !body.ends_with(b"\n") {
        writeln!(writer)?;
    }
    Ok(())
}
