use apple_notes_export::Format;
use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use flate2::read::GzDecoder;
use regex::Regex;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;

/// Configuration required to run the export process.
/// This decouples the logic from how the arguments were parsed (CLI/Config file).
#[derive(Clone)]
pub struct ExportConfig {
    pub target_dir: PathBuf,
    pub db_path: PathBuf,
    pub format: OutputFormat,
    pub title_filter: Option<Regex>,
    pub all: bool,
    pub print: bool,
    pub force: bool,
    pub verbose: bool,
    pub quiet: bool,
}

impl ExportConfig {
    /// Row filter applied before any note body is loaded.
    pub fn wants(&self, title: &str, folder: Option<&str>) -> bool {
        if folder.is_none() && !self.all {
            return false;
        }
        self.title_filter
            .as_ref()
            .is_none_or(|re| re.is_match(title))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessResult {
    Created,
    Updated,
    Skipped,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Annotated,
    Html,
    #[default]
    Markdown,
    /// Decompressed archive bytes, unparsed.
    Raw,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Text | OutputFormat::Annotated => "txt",
            OutputFormat::Html => "html",
            OutputFormat::Markdown => "md",
            OutputFormat::Raw => "raw",
        }
    }

    /// The renderer behind this format; `None` for [`OutputFormat::Raw`].
    pub fn render_format(self) -> Option<Format> {
        match self {
            OutputFormat::Text => Some(Format::Text),
            OutputFormat::Annotated => Some(Format::Annotated),
            OutputFormat::Html => Some(Format::Html),
            OutputFormat::Markdown => Some(Format::Markdown),
            OutputFormat::Raw => None,
        }
    }
}

/// Copy the database to a temporary file with SQLite's online backup.
/// Notes keeps the live file open, so reading a snapshot avoids lock contention.
pub fn snapshot_database(db_path: &Path) -> Result<NamedTempFile> {
    use rusqlite::{Connection, OpenFlags, backup::Backup};

    let src = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .wrap_err_with(|| format!("Failed to open source database: {}", db_path.display()))?;

    let tmp = NamedTempFile::new().wrap_err("Failed to create temporary file")?;
    let mut dst =
        Connection::open(tmp.path()).wrap_err("Failed to open snapshot database connection")?;

    {
        let backup = Backup::new(&src, &mut dst).wrap_err("Failed to initialize backup")?;
        backup
            .run_to_completion(1000, Duration::from_millis(5), None)
            .wrap_err("Backup did not complete successfully")?;
    }

    log::info!("snapshot of {} at {}", db_path.display(), tmp.path().display());
    Ok(tmp)
}

/// Gunzip a `ZDATA` blob.
pub fn decompress(raw_data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(raw_data.len() * 4);
    GzDecoder::new(raw_data)
        .read_to_end(&mut out)
        .wrap_err("gzip decompression failed")?;
    Ok(out)
}

/// True when `path` exists and was written no earlier than `modified`.
pub fn is_up_to_date(path: &Path, modified: Option<DateTime<Utc>>) -> bool {
    let Some(modified) = modified else {
        return false;
    };
    let Ok(written) = path.metadata().and_then(|m| m.modified()) else {
        return false;
    };
    DateTime::<Utc>::from(written) >= modified
}

/// Marks `path` as written at `modified`, so later runs can skip it.
pub fn stamp_mtime(path: &Path, modified: Option<DateTime<Utc>>) -> Result<()> {
    let Some(modified) = modified else {
        return Ok(());
    };
    let file = std::fs::File::options()
        .write(true)
        .open(path)
        .wrap_err_with(|| format!("Failed to open {} for stamping", path.display()))?;
    file.set_modified(SystemTime::from(modified))
        .wrap_err_with(|| format!("Failed to set mtime on {}", path.display()))
}
