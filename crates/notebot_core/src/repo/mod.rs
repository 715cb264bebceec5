//! Repository layer: the note capability set and its storage backends.
//!
//! # Responsibility
//! - Define the fallible `NoteRepository` contract used by `NoteStore`.
//! - Keep SQL and document-file details out of the service layer.
//!
//! # Invariants
//! - Writes call `Note::validate()` before persisting.
//! - Every read is scoped to one `UserId`.

pub mod json_repo;
pub mod note_repo;
pub mod sqlite_repo;

use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;

use json_repo::JsonFileNoteRepository;
use note_repo::{DynNoteRepository, RepoResult};
use sqlite_repo::SqliteNoteRepository;

/// Selects which backend persists notes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageBackend {
    /// Relational schema with timestamps (canonical).
    #[default]
    Sqlite,
    /// Flat keyed JSON document.
    Json,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Json => "json",
        }
    }

    pub fn default_path(self) -> &'static str {
        match self {
            Self::Sqlite => "notes.db",
            Self::Json => "notes.json",
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sql" | "db" => Ok(Self::Sqlite),
            "json" | "file" => Ok(Self::Json),
            other => Err(format!(
                "unsupported storage backend `{other}`; expected sqlite|json"
            )),
        }
    }
}

/// Opens the selected backend, creating its storage on first use.
pub fn open_repository(
    backend: StorageBackend,
    path: impl AsRef<Path>,
) -> RepoResult<DynNoteRepository> {
    Ok(match backend {
        StorageBackend::Sqlite => Box::new(SqliteNoteRepository::open(path)?),
        StorageBackend::Json => Box::new(JsonFileNoteRepository::open(path)?),
    })
}
