//! Chat command router and conversation state machine.
//!
//! # Responsibility
//! - Map inbound messages to note and summary use-cases.
//! - Track which conversations wait for follow-up text.
//! - Contain a panic in one message so it costs that conversation only.
//!
//! # Invariants
//! - Every message addressed to this bot yields exactly one reply; commands
//!   mentioning another bot yield none and leave state untouched.
//! - `Idle` conversations have no map entry; entries are inserted when a
//!   command asks for follow-up text and removed when it completes.
//! - `/start`, `/help` and `/log` never change conversation state.
//! - Any other command first clears a pending follow-up, so a user can
//!   always leave an awaiting state by issuing a new command.

pub mod command;
pub mod state;

use crate::model::note::{NoteOrigin, UserId};
use crate::repo::note_repo::NoteRepository;
use crate::service::note_service::{help_message, NoteService, NoteServiceError};
use crate::service::summary_service::SummaryService;
use command::{Command, Input};
use dashmap::DashMap;
use log::{debug, error};
pub use state::{ConversationId, ConversationState};
use std::sync::Arc;

pub const NOTE_SAVED: &str = "✅ Note saved successfully!";
pub const NOTE_FAILED: &str = "❌ Failed to save note. Please try again.";
pub const NOTE_EMPTY: &str = "⚠️ A note cannot be empty. Please enter your note:";
pub const NOTE_PROMPT: &str = "📝 Please enter your note:";
pub const SEARCH_PROMPT: &str = "🤔 What would you like to ask about?";
pub const CANCELED: &str = "Canceled.";
pub const NOTHING_TO_CANCEL: &str = "Nothing to cancel.";
pub const QUESTION_USAGE: &str = "Usage: /question <what you want to know about your notes>";
pub const SUMMARIES_DISABLED: &str = "Summaries are not configured for this bot.";
pub const UNKNOWN_COMMAND: &str = "Unknown command. Send /help to see what I can do.";
pub const IDLE_HINT: &str = "Send /note <text> to save a note, or /help to see all commands.";
/// Longest message Telegram accepts, in UTF-16 code units.
pub const MAX_MESSAGE_LEN: usize = 4096;

pub const GENERIC_ERROR: &str =
    "❌ An error occurred while processing your request. Please try again.";

const WELCOME: &str = "👋 Welcome to NoteTaker Bot!\n\nI can help you take and manage your notes.\n";

/// Message as seen by the router, independent of the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub user_id: UserId,
    pub username: Option<String>,
    pub text: String,
}

impl InboundMessage {
    pub fn new(chat_id: i64, user_id: UserId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            user_id,
            username: None,
            text: text.into(),
        }
    }

    pub fn conversation(&self) -> ConversationId {
        ConversationId::new(self.chat_id, self.user_id)
    }

    fn origin(&self) -> NoteOrigin {
        NoteOrigin {
            chat_id: Some(self.chat_id),
            username: self.username.clone(),
        }
    }
}

/// Reply text plus an optional suggested-command keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Vec<Vec<String>>>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, rows: &[&[&str]]) -> Self {
        self.keyboard = Some(
            rows.iter()
                .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
                .collect(),
        );
        self
    }

    /// Reply sent when handling a message failed unexpectedly.
    pub fn generic_error() -> Self {
        Self::text(GENERIC_ERROR)
    }

    /// Splits into messages of at most `limit` UTF-16 units, breaking on
    /// line boundaries where possible. The keyboard rides on the last part.
    ///
    /// Concatenating the parts yields the original text.
    pub fn split(self, limit: usize) -> Vec<Reply> {
        let mut parts: Vec<Reply> = split_text(&self.text, limit)
            .into_iter()
            .map(Reply::text)
            .collect();
        if let Some(last) = parts.last_mut() {
            last.keyboard = self.keyboard;
        }
        parts
    }
}

fn split_text(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = utf16_len(line);
        if current_len + line_len > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len <= limit {
            current.push_str(line);
            current_len += line_len;
            continue;
        }
        for ch in line.chars() {
            let ch_len = ch.len_utf16();
            if current_len + ch_len > limit && !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push(ch);
            current_len += ch_len;
        }
    }
    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

pub struct CommandRouter<R: NoteRepository> {
    notes: NoteService<R>,
    summaries: Option<SummaryService<R>>,
    bot_username: Option<String>,
    conversations: DashMap<ConversationId, ConversationState>,
}

impl<R: NoteRepository> CommandRouter<R> {
    pub fn new(notes: NoteService<R>, summaries: Option<SummaryService<R>>) -> Self {
        Self {
            notes,
            summaries,
            bot_username: None,
            conversations: DashMap::new(),
        }
    }

    /// Only answer `/cmd@name` mentions of this bot.
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    pub fn notes(&self) -> &NoteService<R> {
        &self.notes
    }

    /// Current state of a conversation (`Idle` when nothing is pending).
    pub fn state(&self, conversation: ConversationId) -> ConversationState {
        self.conversations
            .get(&conversation)
            .map(|entry| *entry.value())
            .unwrap_or_default()
    }

    /// Number of conversations waiting for follow-up text.
    pub fn pending_conversations(&self) -> usize {
        self.conversations.len()
    }

    /// Drops any pending follow-up. Returns whether one existed.
    pub fn reset(&self, conversation: ConversationId) -> bool {
        self.take_state(conversation) != ConversationState::Idle
    }

    /// Handles one inbound message.
    ///
    /// `None` means the message was a command for another bot and must not
    /// be answered.
    pub async fn handle(&self, message: &InboundMessage) -> Option<Reply> {
        match Input::parse(&message.text, self.bot_username.as_deref()) {
            Input::Command { command, argument } => {
                Some(self.handle_command(message, command, argument).await)
            }
            Input::Text(text) => Some(self.handle_text(message, &text)),
            Input::Foreign { mention } => {
                debug!(
                    "event=command_foreign module=router chat_id={} mention={}",
                    message.chat_id, mention
                );
                None
            }
        }
    }

    async fn handle_command(
        &self,
        message: &InboundMessage,
        command: Command,
        argument: Option<String>,
    ) -> Reply {
        let conversation = message.conversation();
        let previous = if command.is_stateless() {
            self.state(conversation)
        } else {
            self.take_state(conversation)
        };

        match command {
            Command::Start => Reply::text(format!("{WELCOME}\n{}", help_message()))
                .with_keyboard(&[&["/note", "/ask"], &["/log", "/help"]]),
            Command::Help => Reply::text(help_message()),
            Command::Log => Reply::text(self.notes.recent(message.user_id)),
            Command::Cancel if previous == ConversationState::Idle => {
                Reply::text(NOTHING_TO_CANCEL)
            }
            Command::Cancel => Reply::text(CANCELED),
            Command::Note => match argument {
                Some(text) => note_reply(self.save_note(message, &text)),
                None => {
                    self.enter(conversation, ConversationState::AwaitingNoteText);
                    Reply::text(NOTE_PROMPT)
                }
            },
            Command::Ask => match argument {
                Some(query) => Reply::text(self.notes.search(message.user_id, &query)),
                None => {
                    self.enter(conversation, ConversationState::AwaitingSearchQuery);
                    Reply::text(SEARCH_PROMPT)
                }
            },
            Command::Summary => match &self.summaries {
                Some(summaries) => Reply::text(summaries.summarize(message.user_id).await),
                None => Reply::text(SUMMARIES_DISABLED),
            },
            Command::Question => match (&self.summaries, argument) {
                (None, _) => Reply::text(SUMMARIES_DISABLED),
                (Some(_), None) => Reply::text(QUESTION_USAGE),
                (Some(summaries), Some(question)) => {
                    Reply::text(summaries.ask(message.user_id, &question).await)
                }
            },
            Command::Unknown(name) => {
                debug!(
                    "event=command_unknown module=router chat_id={} name={}",
                    message.chat_id, name
                );
                Reply::text(UNKNOWN_COMMAND)
            }
        }
    }

    fn handle_text(&self, message: &InboundMessage, text: &str) -> Reply {
        let conversation = message.conversation();
        match self.take_state(conversation) {
            ConversationState::AwaitingNoteText => match self.save_note(message, text) {
                Err(NoteServiceError::EmptyText) => {
                    self.enter(conversation, ConversationState::AwaitingNoteText);
                    Reply::text(NOTE_EMPTY)
                }
                result => note_reply(result),
            },
            ConversationState::AwaitingSearchQuery => {
                Reply::text(self.notes.search(message.user_id, text))
            }
            ConversationState::Idle => Reply::text(IDLE_HINT),
        }
    }

    fn save_note(&self, message: &InboundMessage, text: &str) -> Result<(), NoteServiceError> {
        self.notes
            .add_note(message.user_id, text, message.origin())
    }

    fn enter(&self, conversation: ConversationId, state: ConversationState) {
        debug!(
            "event=conversation_enter module=router chat_id={} user_id={} state={}",
            conversation.chat_id, conversation.user_id, state
        );
        self.conversations.insert(conversation, state);
    }

    fn take_state(&self, conversation: ConversationId) -> ConversationState {
        match self.conversations.remove(&conversation) {
            Some((_, state)) => {
                debug!(
                    "event=conversation_exit module=router chat_id={} user_id={} state={}",
                    conversation.chat_id, conversation.user_id, state
                );
                state
            }
            None => ConversationState::Idle,
        }
    }
}

impl<R: NoteRepository + Send + Sync + 'static> CommandRouter<R> {
    /// [`CommandRouter::handle`] on its own task.
    ///
    /// A panic while handling is logged, the conversation is reset and the
    /// user gets [`Reply::generic_error`].
    pub async fn handle_contained(self: &Arc<Self>, message: InboundMessage) -> Option<Reply> {
        let conversation = message.conversation();
        let router = Arc::clone(self);
        match tokio::spawn(async move { router.handle(&message).await }).await {
            Ok(reply) => reply,
            Err(err) => {
                error!(
                    "event=update_failed module=router status=error chat_id={} user_id={} error={}",
                    conversation.chat_id, conversation.user_id, err
                );
                self.reset(conversation);
                Some(Reply::generic_error())
            }
        }
    }
}

fn note_reply(result: Result<(), NoteServiceError>) -> Reply {
    match result {
        Ok(()) => Reply::text(NOTE_SAVED),
        Err(NoteServiceError::EmptyText) => Reply::text(NOTE_EMPTY),
        Err(NoteServiceError::StorageUnavailable) => Reply::text(NOTE_FAILED),
    }
}
