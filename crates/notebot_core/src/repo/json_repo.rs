//! Flat JSON document note backend.
//!
//! Layout: `{ "<user id>": [ { "text": ..., "created_at": ... }, ... ] }`,
//! each list in insertion order.
//!
//! # Invariants
//! - Timestamps are kept; bare-string entries from older files are read with
//!   the Unix epoch as their timestamp and written back unchanged.
//! - A document that fails to parse is an error, never silently replaced.
//! - Writes go through a temp file and rename so a crash never truncates data.

use crate::model::note::{Note, NoteOrigin, UserId};
use crate::repo::note_repo::{NoteRepository, RepoError, RepoResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

type Document = BTreeMap<String, Vec<StoredEntry>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Note(StoredNote),
    Legacy(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredNote {
    text: String,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    chat_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
}

impl StoredEntry {
    fn into_note(self, user_id: UserId) -> Note {
        match self {
            Self::Note(stored) => Note {
                user_id,
                text: stored.text,
                created_at: stored.created_at,
                origin: NoteOrigin {
                    chat_id: stored.chat_id,
                    username: stored.username,
                },
            },
            Self::Legacy(text) => Note::with_timestamp(user_id, text, DateTime::<Utc>::UNIX_EPOCH),
        }
    }
}

/// JSON-file-backed note repository.
pub struct JsonFileNoteRepository {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileNoteRepository {
    /// Opens the document at `path`, creating an empty one if absent.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            write_document(&path, &Document::new())?;
            log::info!(
                "event=store_init module=json_repo status=created path={}",
                path.display()
            );
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // The file is only replaced by rename, so a panic never leaves it half-written.
    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|poisoned| {
            log::warn!("event=lock_recovered module=json_repo status=poisoned");
            self.write_lock.clear_poison();
            poisoned.into_inner()
        })
    }

    fn load(&self) -> RepoResult<Document> {
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Document::new());
        }
        serde_json::from_str(&raw).map_err(|err| {
            RepoError::InvalidData(format!(
                "corrupt note document `{}`: {err}",
                self.path.display()
            ))
        })
    }
}

impl NoteRepository for JsonFileNoteRepository {
    fn insert_note(&self, note: &Note) -> RepoResult<()> {
        note.validate()?;

        let _guard = self.lock();
        let mut document = self.load()?;
        document
            .entry(note.user_id.to_string())
            .or_default()
            .push(StoredEntry::Note(StoredNote {
                text: note.text.clone(),
                created_at: note.created_at,
                chat_id: note.origin.chat_id,
                username: note.origin.username.clone(),
            }));
        write_document(&self.path, &document)
    }

    fn list_notes(&self, user_id: UserId, limit: Option<u32>) -> RepoResult<Vec<Note>> {
        let entries = {
            let _guard = self.lock();
            self.load()?
                .remove(&user_id.to_string())
                .unwrap_or_default()
        };

        let mut notes: Vec<Note> = entries
            .into_iter()
            .rev()
            .map(|entry| entry.into_note(user_id))
            .collect();
        // Stable sort keeps last-inserted-first among equal timestamps.
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            notes.truncate(limit as usize);
        }
        Ok(notes)
    }
}

fn write_document(path: &Path, document: &Document) -> RepoResult<()> {
    let body = serde_json::to_string_pretty(document)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode note document: {err}")))?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, body)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
