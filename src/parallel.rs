use crate::process::{export_note, print_notes, selected_notes};
use crate::store::{self, open_db};
use crate::utils::{ExportConfig, ProcessResult};
use crossbeam_channel::{SendTimeoutError, bounded};
use eyre::{Context, Result};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
struct Counts {
    created: AtomicUsize,
    updated: AtomicUsize,
    skipped: AtomicUsize,
    errors: AtomicUsize,
}

impl Counts {
    fn record(&self, result: ProcessResult) {
        let counter = match result {
            ProcessResult::Created => &self.created,
            ProcessResult::Updated => &self.updated,
            ProcessResult::Skipped => &self.skipped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn execute(config: ExportConfig) -> Result<()> {
    let notes = {
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
        notes
    };

    fs::create_dir_all(&config.target_dir).wrap_err("Failed to create target dir")?;

    let (tx, rx) = bounded::<i64>(512);
    let counts = Counts::default();
    let n_workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(8);

    std::thread::scope(|s| {
        for _ in 0..n_workers {
            let rx = rx.clone();
            let (config, counts) = (&config, &counts);

            s.spawn(move || {
                let conn = match open_db(&config.db_path) {
                    Ok(c) => c,
                    Err(e) => {
                        eprintln!("Worker DB open failed: {:#}", e);
                        return;
                    }
                };

                while let Ok(pk) = rx.recv() {
                    let exported = store::fetch_note(&conn, pk)
                        .and_then(|note| export_note(&note, config));
                    match exported {
                        Ok((result, name)) => {
                            counts.record(result);
                            if config.verbose {
                                match result {
                                    ProcessResult::Created => eprintln!("Created: {}", name),
                                    ProcessResult::Updated => eprintln!("Updated: {}", name),
                                    ProcessResult::Skipped => eprintln!("Skipped: {}", name),
                                }
                            }
                        }
                        Err(e) => {
                            counts.errors.fetch_add(1, Ordering::Relaxed);
                            eprintln!("Error [{}]: {:#}", pk, e);
                        }
                    }
                }
            });
        }

        drop(rx);

        'outer: for note in &notes {
            let mut pending = note.pk;
            loop {
                match tx.send_timeout(pending, Duration::from_millis(50)) {
                    Ok(()) => break,
                    Err(SendTimeoutError::Disconnected(_)) => break 'outer,
                    Err(SendTimeoutError::Timeout(r)) => {
                        pending = r;
                    }
                }
            }
        }

        drop(tx);
        Ok::<_, eyre::Error>(())
    })
    .wrap_err("Export pipeline failed")?;

    if !config.quiet {
        eprintln!(
            "Done. {} created, {} updated, {} skipped. Errors: {}",
            counts.created.load(Ordering::Relaxed),
            counts.updated.load(Ordering::Relaxed),
            counts.skipped.load(Ordering::Relaxed),
            counts.errors.load(Ordering::Relaxed),
        );
    }

    Ok(())
}
