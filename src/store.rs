//! Row access for the Notes database (`NoteStore.sqlite`).
//!
//! Storage format: gzip-compressed note-body archive in `ZICNOTEDATA.ZDATA`.
//! Note metadata (title, dates, folder) lives in `ZICCLOUDSYNCINGOBJECT`,
//! which also holds folders, accounts and attachments; the joins below pick
//! the note row and its folder row.
//!
//! Relevant columns:
//! ```sql
//! ZICNOTEDATA            (Z_PK, ZNOTE, ZDATA BLOB)
//! ZICCLOUDSYNCINGOBJECT  (Z_PK, ZNOTEDATA, ZFOLDER, ZTITLE1, ZIDENTIFIER,
//!                         ZCREATIONDATE1, ZMODIFICATIONDATE1, ZTITLE2)
//! ```
//!
//! Dates are Core Data timestamps: seconds since 2001-01-01 UTC, as REAL.
//! A note without a folder has been deleted.
use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use rusqlite::{Connection, OpenFlags, Row};
use std::path::Path;

const NOTE_JOINS: &str = "FROM ZICNOTEDATA AS n \
     LEFT JOIN ZICCLOUDSYNCINGOBJECT AS c1 ON c1.ZNOTEDATA = n.Z_PK \
     LEFT JOIN ZICCLOUDSYNCINGOBJECT AS c2 ON c2.Z_PK = c1.ZFOLDER";

/// Seconds between the Unix epoch and 2001-01-01 UTC.
const CORE_DATA_EPOCH_OFFSET: i64 = 978_307_200;

/// Listing entry, loaded without the data blob.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteSummary {
    pub pk: i64,
    pub title: String,
    pub folder: Option<String>,
}

/// A full note row.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteRow {
    pub pk: i64,
    pub title: String,
    pub identifier: Option<String>,
    pub folder: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    /// Gzip-compressed archive; `None` for notes that were never saved.
    pub data: Option<Vec<u8>>,
}

impl NoteRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            pk: row.get(0)?,
            title: title_or_default(row.get(1)?),
            identifier: row.get(2)?,
            folder: row.get(3)?,
            created: row.get::<_, Option<f64>>(4)?.and_then(core_data_time),
            modified: row.get::<_, Option<f64>>(5)?.and_then(core_data_time),
            data: row.get(6)?,
        })
    }

    /// Short label used in log and error lines.
    pub fn label(&self) -> String {
        format!("{} ({})", self.pk, self.title)
    }
}

fn title_or_default(title: Option<String>) -> String {
    title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "Untitled".to_string())
}

/// Converts a Core Data timestamp to UTC.
pub fn core_data_time(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9) as u32;
    DateTime::from_timestamp(whole as i64 + CORE_DATA_EPOCH_OFFSET, nanos)
}

pub fn open_db(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .wrap_err_with(|| format!("Failed to open database: {}", path.display()))?;
    conn.execute_batch("PRAGMA cache_size = -16384;")
        .wrap_err("Failed to set cache_size")?;
    Ok(conn)
}

/// Lists every note body in note order.
pub fn list_notes(conn: &Connection) -> Result<Vec<NoteSummary>> {
    let sql = format!("SELECT n.Z_PK, c1.ZTITLE1, c2.ZTITLE2 {NOTE_JOINS} ORDER BY n.ZNOTE");
    let mut stmt = conn.prepare(&sql).wrap_err("Failed to prepare note listing")?;
    stmt.query_map([], |row| {
        Ok(NoteSummary {
            pk: row.get(0)?,
            title: title_or_default(row.get(1)?),
            folder: row.get(2)?,
        })
    })?
    .collect::<Result<_, _>>()
    .wrap_err("Failed to collect notes")
}

pub fn fetch_note(conn: &Connection, pk: i64) -> Result<NoteRow> {
    let sql = format!(
        "SELECT n.Z_PK, c1.ZTITLE1, c1.ZIDENTIFIER, c2.ZTITLE2, \
         c1.ZCREATIONDATE1, c1.ZMODIFICATIONDATE1, n.ZDATA \
         {NOTE_JOINS} WHERE n.Z_PK = ?"
    );
    conn.query_row(&sql, [pk], NoteRow::from_row)
        .wrap_err_with(|| format!("Failed to fetch note {pk}"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn fixture_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE ZICNOTEDATA (Z_PK INTEGER PRIMARY KEY, ZNOTE INTEGER, ZDATA BLOB);
             CREATE TABLE ZICCLOUDSYNCINGOBJECT (
                 Z_PK INTEGER PRIMARY KEY, ZNOTEDATA INTEGER, ZFOLDER INTEGER,
                 ZTITLE1 TEXT, ZIDENTIFIER TEXT, ZCREATIONDATE1 REAL,
                 ZMODIFICATIONDATE1 REAL, ZTITLE2 TEXT);
             INSERT INTO ZICCLOUDSYNCINGOBJECT (Z_PK, ZTITLE2) VALUES (1, 'Notes');
             INSERT INTO ZICNOTEDATA VALUES (10, 2, x'00');
             INSERT INTO ZICNOTEDATA VALUES (11, 1, NULL);
             INSERT INTO ZICCLOUDSYNCINGOBJECT VALUES
                 (2, 10, 1, 'Groceries', 'AAAA-1', 0.0, 86400.5, NULL);
             INSERT INTO ZICCLOUDSYNCINGOBJECT VALUES
                 (3, 11, NULL, NULL, 'BBBB-2', NULL, NULL, NULL);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn list_orders_by_note_and_defaults_titles() {
        let conn = fixture_db();
        let notes = list_notes(&conn).unwrap();
        assert_eq!(
            notes,
            vec![
                NoteSummary {
                    pk: 11,
                    title: "Untitled".into(),
                    folder: None
                },
                NoteSummary {
                    pk: 10,
                    title: "Groceries".into(),
                    folder: Some("Notes".into())
                },
            ]
        );
    }

    #[test]
    fn fetch_reads_metadata_and_blob() {
        let conn = fixture_db();
        let row = fetch_note(&conn, 10).unwrap();
        assert_eq!(row.title, "Groceries");
        assert_eq!(row.identifier.as_deref(), Some("AAAA-1"));
        assert_eq!(row.folder.as_deref(), Some("Notes"));
        assert_eq!(row.data, Some(vec![0]));
        assert_eq!(
            row.created.unwrap().to_rfc3339(),
            "2001-01-01T00:00:00+00:00"
        );
        assert_eq!(
            row.modified.unwrap().to_rfc3339(),
            "2001-01-02T00:00:00.500+00:00"
        );

        let empty = fetch_note(&conn, 11).unwrap();
        assert_eq!(empty.data, None);
        assert_eq!(empty.modified, None);
    }

    #[test]
    fn fetch_missing_note_is_an_error() {
        let conn = fixture_db();
        assert!(fetch_note(&conn, 99).is_err());
    }
}
