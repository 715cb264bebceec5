//! Note use-case service and reply formatting.
//!
//! # Invariants
//! - Empty or whitespace-only note text never reaches storage.
//! - Listings are numbered from 1 in newest-first order.
//! - An empty result set renders as [`NO_NOTES_MESSAGE`].

use crate::model::note::{Note, NoteOrigin, UserId};
use crate::repo::note_repo::NoteRepository;
use crate::store::NoteStore;
use std::error::Error;
use std::fmt::{Display, Formatter, Write};
use std::sync::Arc;

pub const NO_NOTES_MESSAGE: &str = "No notes found.";
/// Number of notes shown by the recent-notes listing.
pub const RECENT_NOTES_LIMIT: u32 = 10;

const HELP_MESSAGE: &str = "🤖 Available commands:

/note <text> - Save a new note
/ask <search term> - Search through your notes
/log - Show your last 10 notes
/summary - Summarize your notes
/question <text> - Ask a question about your notes
/cancel - Cancel the current prompt
/help - Show this help message

Examples:
/note Remember to buy milk
/ask milk";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteServiceError {
    /// Note text was empty after trimming.
    EmptyText,
    /// The store could not persist the note (already logged).
    StorageUnavailable,
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "note text is empty"),
            Self::StorageUnavailable => write!(f, "note storage unavailable"),
        }
    }
}

impl Error for NoteServiceError {}

/// Note facade used by the command router.
pub struct NoteService<R: NoteRepository> {
    store: Arc<NoteStore<R>>,
}

impl<R: NoteRepository> Clone for NoteService<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<R: NoteRepository> NoteService<R> {
    pub fn new(store: Arc<NoteStore<R>>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<NoteStore<R>> {
        &self.store
    }

    /// Validates and saves one note.
    pub fn add_note(
        &self,
        user_id: UserId,
        text: &str,
        origin: NoteOrigin,
    ) -> Result<(), NoteServiceError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(NoteServiceError::EmptyText);
        }
        if self.store.add_note_with_origin(user_id, text, origin) {
            Ok(())
        } else {
            Err(NoteServiceError::StorageUnavailable)
        }
    }

    /// Searches and renders matching notes.
    pub fn search(&self, user_id: UserId, query: &str) -> String {
        format_notes_response(&self.store.search_notes(user_id, query.trim()))
    }

    /// Renders the newest [`RECENT_NOTES_LIMIT`] notes with timestamps.
    pub fn recent(&self, user_id: UserId) -> String {
        format_recent_notes(&self.store.recent_notes(user_id, RECENT_NOTES_LIMIT))
    }
}

pub fn help_message() -> &'static str {
    HELP_MESSAGE
}

/// Numbered listing of note texts.
pub fn format_notes_response(notes: &[Note]) -> String {
    if notes.is_empty() {
        return NO_NOTES_MESSAGE.to_string();
    }
    let mut response = String::from("📝 Your Notes:\n\n");
    for (idx, note) in notes.iter().enumerate() {
        let _ = writeln!(response, "{}. {}", idx + 1, note.text);
    }
    response
}

/// Numbered listing with creation timestamps.
pub fn format_recent_notes(notes: &[Note]) -> String {
    if notes.is_empty() {
        return NO_NOTES_MESSAGE.to_string();
    }
    let mut response = format!("📋 Your Last {RECENT_NOTES_LIMIT} Notes:\n\n");
    for (idx, note) in notes.iter().enumerate() {
        let _ = writeln!(
            response,
            "{}. [{}] {}",
            idx + 1,
            note.created_at.format("%Y-%m-%d %H:%M UTC"),
            note.text
        );
    }
    response
}
