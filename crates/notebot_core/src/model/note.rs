//! Note domain model.
//!
//! # Responsibility
//! - Define the immutable note record shared by every storage backend.
//! - Own the text validation and substring matching rules.
//!
//! # Invariants
//! - `text` is never empty or whitespace-only once validated.
//! - `created_at` is UTC and fixed at creation time.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Chat-platform user identity that owns notes.
pub type UserId = i64;

/// Where a note was submitted from. Informational only, never used for lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteOrigin {
    pub chat_id: Option<i64>,
    pub username: Option<String>,
}

/// One saved note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub user_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "NoteOrigin::is_empty")]
    pub origin: NoteOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    EmptyText,
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "note text must not be empty"),
        }
    }
}

impl Error for NoteValidationError {}

impl NoteOrigin {
    pub fn is_empty(&self) -> bool {
        self.chat_id.is_none() && self.username.is_none()
    }
}

impl Note {
    /// Creates a note stamped with the current UTC time.
    pub fn new(user_id: UserId, text: impl Into<String>) -> Self {
        Self::with_timestamp(user_id, text, Utc::now())
    }

    /// Creates a note with a caller-provided timestamp (imports, tests).
    pub fn with_timestamp(
        user_id: UserId,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            text: text.into(),
            created_at,
            origin: NoteOrigin::default(),
        }
    }

    pub fn with_origin(mut self, origin: NoteOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn validate(&self) -> Result<(), NoteValidationError> {
        if self.text.trim().is_empty() {
            return Err(NoteValidationError::EmptyText);
        }
        Ok(())
    }

    /// Case-insensitive substring match. An empty query matches every note.
    pub fn matches(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        self.text.to_lowercase().contains(&query.to_lowercase())
    }

    /// Canonical ISO-8601 form used for persistence.
    pub fn timestamp_rfc3339(&self) -> String {
        format_timestamp(&self.created_at)
    }
}

/// Formats a timestamp as RFC 3339 with microseconds and a `Z` suffix.
///
/// The fixed width keeps lexicographic order equal to chronological order.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a persisted RFC 3339 timestamp back into UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::{format_timestamp, parse_timestamp, Note, NoteValidationError};
    use chrono::{TimeZone, Utc};

    #[test]
    fn validate_rejects_whitespace_only_text() {
        let note = Note::new(1, " \n\t ");
        assert_eq!(note.validate(), Err(NoteValidationError::EmptyText));
        assert!(Note::new(1, "x").validate().is_ok());
    }

    #[test]
    fn matches_ignores_case_and_accepts_empty_query() {
        let note = Note::new(1, "Buy milk today");
        assert!(note.matches("MILK"));
        assert!(note.matches(""));
        assert!(!note.matches("bread"));
    }

    #[test]
    fn matches_lowercases_non_ascii_text() {
        let note = Note::new(1, "Ärzte Termin");
        assert!(note.matches("ärzte"));
    }

    #[test]
    fn timestamp_roundtrips_through_text() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        let text = format_timestamp(&at);
        assert_eq!(text, "2024-03-01T08:30:00.000000Z");
        assert_eq!(parse_timestamp(&text), Some(at));
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
