use crate::process::{export_note, print_notes, selected_notes};
use crate::store::{self, open_db};
use crate::utils::{ExportConfig, ProcessResult};
use eyre::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;

/// Single-threaded export loop with a progress bar.
pub fn execute(config: ExportConfig) -> Result<()> {
    let conn = open_db(&config.db_path)?;
    let notes = selected_notes(&conn, &config)?;

    if config.print {
        let stdout = std::io::stdout();
        let errors = print_notes(&conn, &notes, &config, &mut stdout.lock())?;
        if errors > 0 && !config.quiet {
            eprintln!("Errors: {}", errors);
        }
        return Ok(());
    }

    fs::create_dir_all(&config.target_dir).wrap_err_with(|| {
        format!(
            "Failed to create target directory: {}",
            config.target_dir.display()
        )
    })?;

    let pb = if config.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(notes.len() as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)",
            )
            .wrap_err("Invalid progress template")?
            .progress_chars("=>-"),
        );
        bar.println(format!("Found {} notes.", notes.len()));
        bar
    };

    let mut count_created = 0usize;
    let mut count_updated = 0usize;
    let mut count_skipped = 0usize;
    let mut count_errors = 0usize;

    for summary in &notes {
        let exported =
            store::fetch_note(&conn, summary.pk).and_then(|note| export_note(&note, &config));
        match exported {
            Ok((result, name)) => {
                match result {
                    ProcessResult::Created => count_created += 1,
                    ProcessResult::Updated => count_updated += 1,
                    ProcessResult::Skipped => count_skipped += 1,
                }
                if config.verbose {
                    let verb = match result {
                        ProcessResult::Created => "Created",
                        ProcessResult::Updated => "Updated",
                        ProcessResult::Skipped => "Skipped",
                    };
                    pb.println(format!("{verb}:  {name}"));
                }
            }
            Err(e) => {
                count_errors += 1;
                pb.println(format!("Error [{}]: {:#}", summary.pk, e));
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();

    if !config.quiet {
        let mut summary = format!(
            "Done. {} created, {} updated, {} skipped.",
            count_created, count_updated, count_skipped
        );
        if count_errors > 0 {
            summary.push_str(&format!(" Completed with {} error(s).", count_errors));
        }
        eprintln!("{}", summary);
    }

    Ok(())
}
