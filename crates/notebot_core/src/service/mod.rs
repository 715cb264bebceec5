//! Use-case services over the note store.
//!
//! # Responsibility
//! - Validate user input before it reaches storage.
//! - Render user-facing reply text.
//! - Keep the command router free of storage and HTTP details.

pub mod note_service;
pub mod summary_service;
