//! Per-conversation follow-up state.

use crate::model::note::UserId;
use std::fmt::{Display, Formatter};

/// Identifies one user's conversation within one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationId {
    pub chat_id: i64,
    pub user_id: UserId,
}

impl ConversationId {
    pub fn new(chat_id: i64, user_id: UserId) -> Self {
        Self { chat_id, user_id }
    }
}

/// What the next plain-text message means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingNoteText,
    AwaitingSearchQuery,
}

impl ConversationState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingNoteText => "awaiting_note_text",
            Self::AwaitingSearchQuery => "awaiting_search_query",
        }
    }
}

impl Display for ConversationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
