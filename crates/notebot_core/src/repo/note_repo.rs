//! Note repository contract and shared error type.
//!
//! # Invariants
//! - `list_notes` returns newest-first by `created_at`; ties return the most
//!   recently inserted note first.
//! - No method ever returns a note owned by a different user.

use crate::db::DbError;
use crate::model::note::{Note, NoteValidationError, UserId};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Backend-erased repository handle used by the bot binary.
pub type DynNoteRepository = Box<dyn NoteRepository + Send + Sync>;

/// Persistence error for note storage backends.
#[derive(Debug)]
pub enum RepoError {
    Validation(NoteValidationError),
    Db(DbError),
    Io(std::io::Error),
    /// Stored data cannot be decoded into a `Note`.
    InvalidData(String),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "note file i/o failed: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NoteValidationError> for RepoError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<std::io::Error> for RepoError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Capability set every note backend provides.
pub trait NoteRepository {
    /// Appends one validated note.
    fn insert_note(&self, note: &Note) -> RepoResult<()>;

    /// Lists a user's notes newest-first, optionally capped at `limit`.
    fn list_notes(&self, user_id: UserId, limit: Option<u32>) -> RepoResult<Vec<Note>>;

    /// Case-insensitive substring search over a user's notes, newest-first.
    fn search_notes(&self, user_id: UserId, query: &str) -> RepoResult<Vec<Note>> {
        Ok(self
            .list_notes(user_id, None)?
            .into_iter()
            .filter(|note| note.matches(query))
            .collect())
    }
}

impl<R: NoteRepository + ?Sized> NoteRepository for Box<R> {
    fn insert_note(&self, note: &Note) -> RepoResult<()> {
        (**self).insert_note(note)
    }

    fn list_notes(&self, user_id: UserId, limit: Option<u32>) -> RepoResult<Vec<Note>> {
        (**self).list_notes(user_id, limit)
    }

    fn search_notes(&self, user_id: UserId, query: &str) -> RepoResult<Vec<Note>> {
        (**self).search_notes(user_id, query)
    }
}
