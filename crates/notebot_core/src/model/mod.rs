//! Domain model for user notes.
//!
//! # Invariants
//! - Every note is owned by exactly one `UserId`.
//! - Notes are immutable after creation; there is no update or delete.

pub mod note;
