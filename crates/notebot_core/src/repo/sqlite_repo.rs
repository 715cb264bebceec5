//! SQLite note backend (canonical relational schema).
//!
//! # Responsibility
//! - Persist notes in the `notes` table created by the migrations.
//! - Serialize access to the single connection across async tasks.
//!
//! # Invariants
//! - Timestamps are stored as fixed-width RFC 3339 text so `ORDER BY
//!   timestamp DESC, id DESC` is newest-first with insertion-order tiebreak.
//! - Connections are verified to carry the expected columns before use.

use crate::db::{open_db, open_db_in_memory};
use crate::model::note::{parse_timestamp, Note, NoteOrigin, UserId};
use crate::repo::note_repo::{NoteRepository, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const NOTE_COLUMNS: [&str; 6] = ["id", "user_id", "note", "timestamp", "chat_id", "username"];

/// SQLite-backed note repository.
pub struct SqliteNoteRepository {
    conn: Mutex<Connection>,
}

impl SqliteNoteRepository {
    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens a private in-memory database.
    pub fn in_memory() -> RepoResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Wraps a migrated connection after checking the notes schema.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_notes_table_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // A panic mid-call leaves no open transaction, so the connection stays usable.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            log::warn!("event=lock_recovered module=sqlite_repo status=poisoned");
            self.conn.clear_poison();
            poisoned.into_inner()
        })
    }
}

impl NoteRepository for SqliteNoteRepository {
    fn insert_note(&self, note: &Note) -> RepoResult<()> {
        note.validate()?;

        let conn = self.lock();
        conn.execute(
            "INSERT INTO notes (user_id, note, timestamp, chat_id, username)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                note.user_id,
                note.text.as_str(),
                note.timestamp_rfc3339(),
                note.origin.chat_id,
                note.origin.username.as_deref(),
            ],
        )?;
        Ok(())
    }

    fn list_notes(&self, user_id: UserId, limit: Option<u32>) -> RepoResult<Vec<Note>> {
        // SQLite treats a negative LIMIT as "no limit".
        let limit = limit.map_or(-1, i64::from);

        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT user_id, note, timestamp, chat_id, username
             FROM notes
             WHERE user_id = ?1
             ORDER BY timestamp DESC, id DESC
             LIMIT ?2;",
        )?;
        let mut rows = stmt.query(params![user_id, limit])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let timestamp: String = row.get("timestamp")?;
    let created_at = parse_timestamp(&timestamp).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid timestamp `{timestamp}` in notes.timestamp"))
    })?;

    Ok(Note {
        user_id: row.get("user_id")?,
        text: row.get("note")?,
        created_at,
        origin: NoteOrigin {
            chat_id: row.get("chat_id")?,
            username: row.get("username")?,
        },
    })
}

fn ensure_notes_table_ready(conn: &Connection) -> RepoResult<()> {
    let columns = table_columns(conn, "notes")?;
    if columns.is_empty() {
        return Err(RepoError::MissingRequiredTable("notes"));
    }
    for column in NOTE_COLUMNS {
        if !columns.iter().any(|current| current == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: "notes",
                column,
            });
        }
    }
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::SqliteNoteRepository;
    use crate::model::note::Note;
    use crate::repo::note_repo::{NoteRepository, RepoError};
    use rusqlite::Connection;
    use std::sync::Arc;

    #[test]
    fn poisoned_lock_is_recovered() {
        let repo = Arc::new(SqliteNoteRepository::in_memory().unwrap());
        repo.insert_note(&Note::new(1, "before")).unwrap();

        let holder = Arc::clone(&repo);
        let panicked = std::thread::spawn(move || {
            let _conn = holder.conn.lock().unwrap();
            panic!("writer crashed");
        })
        .join();
        assert!(panicked.is_err());
        assert!(repo.conn.is_poisoned());

        repo.insert_note(&Note::new(1, "after")).unwrap();
        assert_eq!(repo.list_notes(1, None).unwrap().len(), 2);
        assert!(!repo.conn.is_poisoned());
    }

    #[test]
    fn try_new_rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let err = SqliteNoteRepository::try_new(conn).err().unwrap();
        assert!(matches!(err, RepoError::MissingRequiredTable("notes")));
    }

    #[test]
    fn try_new_rejects_schema_without_origin_columns() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(include_str!("../db/migrations/0001_notes.sql"))
            .unwrap();
        let err = SqliteNoteRepository::try_new(conn).err().unwrap();
        assert!(matches!(
            err,
            RepoError::MissingRequiredColumn {
                table: "notes",
                column: "chat_id"
            }
        ));
    }

    #[test]
    fn limit_caps_rows() {
        let repo = SqliteNoteRepository::in_memory().unwrap();
        for idx in 0..5 {
            repo.insert_note(&crate::Note::new(9, format!("n{idx}")))
                .unwrap();
        }
        assert_eq!(repo.list_notes(9, Some(3)).unwrap().len(), 3);
        assert_eq!(repo.list_notes(9, None).unwrap().len(), 5);
    }
}
