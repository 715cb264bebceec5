//! Core logic for the notebot chat note-taking assistant.
//!
//! Storage, note and summary services, the command router and the restart
//! supervisor live here; the chat transport lives in the `notebot` binary.

pub mod completion;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod router;
pub mod service;
pub mod store;
pub mod supervisor;

pub use completion::{CompletionClient, CompletionConfig, CompletionError, OpenAiCompletionClient};
pub use config::{BotConfig, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::note::{Note, NoteOrigin, NoteValidationError, UserId};
pub use repo::json_repo::JsonFileNoteRepository;
pub use repo::note_repo::{DynNoteRepository, NoteRepository, RepoError, RepoResult};
pub use repo::sqlite_repo::SqliteNoteRepository;
pub use repo::{open_repository, StorageBackend};
pub use router::{CommandRouter, ConversationId, ConversationState, InboundMessage, Reply};
pub use service::note_service::{NoteService, NoteServiceError, NO_NOTES_MESSAGE};
pub use service::summary_service::SummaryService;
pub use store::NoteStore;
pub use supervisor::{supervise, RestartPolicy, SupervisorExit};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
