mod exporter;
#[cfg(not(feature = "sequential"))]
mod parallel;
mod process;
#[cfg(feature = "sequential")]
mod sequential;
mod store;
mod utils;

use clap::Parser;
use eyre::{Context, Result, eyre};
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use utils::OutputFormat;

/// Export Apple Notes to text, HTML or Markdown files.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to export notes into, one subdirectory per folder.
    /// Defaults to ./apple-notes-export if not set in config.
    #[arg(value_name = "TARGET_DIR")]
    target_dir: Option<PathBuf>,

    /// Path to the Notes database (NoteStore.sqlite).
    /// Auto-detected if omitted.
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/apple-notes-export/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output format. Defaults to markdown if not set in config.
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Only export notes whose title matches this regex.
    #[arg(long, value_name = "REGEX")]
    title: Option<String>,

    /// Include recently deleted notes (those without a folder).
    #[arg(long)]
    all: bool,

    /// Write notes to stdout instead of files.
    #[arg(long)]
    print: bool,

    /// Read from a snapshot copy of the database instead of the live file.
    #[arg(long)]
    snapshot: bool,

    /// Overwrite existing files even if they are newer.
    #[arg(short, long)]
    force: bool,

    /// Print each file written or skipped.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress standard output (progress and summary).
    #[arg(short, long)]
    quiet: bool,

    /// Log archive decoding details.
    #[arg(long)]
    debug: bool,
}

#[derive(Deserialize, Default)]
struct FileConfig {
    target_dir: Option<PathBuf>,
    db_path: Option<PathBuf>,
    format: Option<OutputFormat>,
    all: Option<bool>,
}

fn default_db_path() -> Option<PathBuf> {
    dirs::home_dir()
        .map(|d| d.join("Library/Group Containers/group.com.apple.notes/NoteStore.sqlite"))
}

fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    let path = if let Some(p) = explicit_path {
        if !p.exists() {
            return Err(eyre!("Config file not found: {}", p.display()));
        }
        Some(p.to_path_buf())
    } else {
        dirs::config_dir()
            .map(|d| d.join("apple-notes-export/config.toml"))
            .filter(|p| p.exists())
    };

    match path {
        None => Ok(FileConfig::default()),
        Some(p) => {
            let content = fs::read_to_string(&p)
                .wrap_err_with(|| format!("Failed to read config: {}", p.display()))?;
            toml::from_str(&content)
                .wrap_err_with(|| format!("Failed to parse config: {}", p.display()))
        }
    }
}

fn init_logging(cli: &Cli) {
    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    // CLI > config file > default
    let file_cfg = load_file_config(cli.config.as_deref())?;

    let target_dir = cli
        .target_dir
        .or(file_cfg.target_dir)
        .unwrap_or_else(|| PathBuf::from("apple-notes-export"));

    let db_path = cli
        .db
        .or(file_cfg.db_path)
        .or_else(default_db_path)
        .ok_or_else(|| {
            eyre!("Could not determine database path.\nUse --db to specify manually, or set db_path in config.toml.")
        })?;

    if !db_path.exists() {
        return Err(eyre!(
            "Database not found at: {}\nUse --db to specify the path manually.",
            db_path.display()
        ));
    }

    let title_filter = cli
        .title
        .as_deref()
        .map(Regex::new)
        .transpose()
        .wrap_err("Invalid --title regex")?;

    // Held until the export finishes; dropping it deletes the copy.
    let snapshot = if cli.snapshot {
        Some(utils::snapshot_database(&db_path)?)
    } else {
        None
    };

    let config = utils::ExportConfig {
        target_dir,
        db_path: snapshot
            .as_ref()
            .map_or_else(|| db_path.clone(), |s| s.path().to_path_buf()),
        format: cli.format.or(file_cfg.format).unwrap_or_default(),
        title_filter,
        all: cli.all || file_cfg.all.unwrap_or(false),
        print: cli.print,
        force: cli.force,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    #[cfg(feature = "sequential")]
    return sequential::execute(config);

    #[cfg(not(feature = "sequential"))]
    parallel::execute(config)
}
