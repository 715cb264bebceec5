//! Infallible note store over any `NoteRepository`.
//!
//! # Responsibility
//! - Stamp new notes with the current UTC time.
//! - Absorb every backend failure: log it, then report `false` or an empty
//!   list so callers never handle storage errors.
//!
//! # Invariants
//! - Results are always scoped to the requested user.
//! - Log events carry ids and counts only, never note or query text.

use crate::model::note::{Note, NoteOrigin, UserId};
use crate::repo::note_repo::NoteRepository;
use log::{debug, error, warn};

/// Shared note store handle.
pub struct NoteStore<R: NoteRepository> {
    repo: R,
}

impl<R: NoteRepository> NoteStore<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Appends a note timestamped now. Returns `false` on any failure.
    pub fn add_note(&self, user_id: UserId, text: &str) -> bool {
        self.add_note_with_origin(user_id, text, NoteOrigin::default())
    }

    /// Same as [`NoteStore::add_note`], also recording where the note came from.
    pub fn add_note_with_origin(&self, user_id: UserId, text: &str, origin: NoteOrigin) -> bool {
        let note = Note::new(user_id, text).with_origin(origin);
        match self.repo.insert_note(&note) {
            Ok(()) => {
                debug!(
                    "event=note_add module=store status=ok user_id={} chars={}",
                    user_id,
                    note.text.chars().count()
                );
                true
            }
            Err(err) => {
                error!(
                    "event=note_add module=store status=error user_id={} error={}",
                    user_id, err
                );
                false
            }
        }
    }

    /// All notes of `user_id`, newest-first. Empty on failure.
    pub fn get_notes(&self, user_id: UserId) -> Vec<Note> {
        self.read("note_list", user_id, || self.repo.list_notes(user_id, None))
    }

    /// At most `limit` newest notes of `user_id`. Empty on failure.
    pub fn recent_notes(&self, user_id: UserId, limit: u32) -> Vec<Note> {
        if limit == 0 {
            return Vec::new();
        }
        self.read("note_recent", user_id, || {
            self.repo.list_notes(user_id, Some(limit))
        })
    }

    /// Notes of `user_id` containing `query` (case-insensitive), newest-first.
    ///
    /// An empty query returns every note. Empty on failure.
    pub fn search_notes(&self, user_id: UserId, query: &str) -> Vec<Note> {
        self.read("note_search", user_id, || {
            self.repo.search_notes(user_id, query)
        })
    }

    fn read<E: std::fmt::Display>(
        &self,
        event: &'static str,
        user_id: UserId,
        op: impl FnOnce() -> Result<Vec<Note>, E>,
    ) -> Vec<Note> {
        match op() {
            Ok(notes) => {
                let foreign = notes.iter().filter(|note| note.user_id != user_id).count();
                if foreign > 0 {
                    warn!(
                        "event={} module=store status=filtered user_id={} foreign_rows={}",
                        event, user_id, foreign
                    );
                    return notes
                        .into_iter()
                        .filter(|note| note.user_id == user_id)
                        .collect();
                }
                debug!(
                    "event={} module=store status=ok user_id={} rows={}",
                    event,
                    user_id,
                    notes.len()
                );
                notes
            }
            Err(err) => {
                error!(
                    "event={} module=store status=error user_id={} error={}",
                    event, user_id, err
                );
                Vec::new()
            }
        }
    }
}
