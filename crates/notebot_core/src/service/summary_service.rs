//! Summary and question answering over a user's notes.
//!
//! # Responsibility
//! - Turn stored notes into completion prompts.
//! - Convert every completion failure into a fixed reply string.
//!
//! # Invariants
//! - One completion call per invocation; no retry, no caching.
//! - Users without notes never trigger a completion call.

use crate::completion::CompletionClient;
use crate::model::note::{Note, UserId};
use crate::repo::note_repo::NoteRepository;
use crate::store::NoteStore;
use log::{error, info};
use std::sync::Arc;

pub const SUMMARY_MAX_TOKENS: u32 = 150;
pub const ANSWER_MAX_TOKENS: u32 = 200;

pub const NO_NOTES_TO_SUMMARIZE: &str = "You have no notes to summarize.";
pub const NO_NOTES_TO_REFERENCE: &str = "You have no notes to reference.";
pub const SUMMARY_FAILED: &str = "Failed to summarize notes. Please try again later.";
pub const ANSWER_FAILED: &str = "Failed to process your question. Please try again later.";

const SUMMARY_INSTRUCTION: &str = "Summarize the following notes briefly:";

const QUESTION_INSTRUCTION: &str = "You are analyzing notes about baby/newborn activities like \
feeding, sleeping, diaper changes etc.
Organize these activities into a clear timeline and provide relevant insights.
When answering questions, consider patterns and timing between activities.";

const QUESTION_CHECKLIST: &str = "Remember to:
- Note time gaps between activities
- Group similar activities (feeding, sleeping, etc.)
- Point out any patterns
- Mention if something seems missing or irregular";

pub struct SummaryService<R: NoteRepository> {
    store: Arc<NoteStore<R>>,
    client: Arc<dyn CompletionClient>,
}

impl<R: NoteRepository> SummaryService<R> {
    pub fn new(store: Arc<NoteStore<R>>, client: Arc<dyn CompletionClient>) -> Self {
        Self { store, client }
    }

    /// Short summary of every note the user has saved.
    pub async fn summarize(&self, user_id: UserId) -> String {
        let Some(notes) = bullet_list(&self.store.get_notes(user_id)) else {
            return NO_NOTES_TO_SUMMARIZE.to_string();
        };
        let prompt = summary_prompt(&notes);
        self.complete("summarize", user_id, &prompt, SUMMARY_MAX_TOKENS, SUMMARY_FAILED)
            .await
    }

    /// Answers `question` using the user's notes as context.
    pub async fn ask(&self, user_id: UserId, question: &str) -> String {
        let Some(notes) = bullet_list(&self.store.get_notes(user_id)) else {
            return NO_NOTES_TO_REFERENCE.to_string();
        };
        let prompt = question_prompt(&notes, question.trim());
        self.complete("ask", user_id, &prompt, ANSWER_MAX_TOKENS, ANSWER_FAILED)
            .await
    }

    async fn complete(
        &self,
        action: &'static str,
        user_id: UserId,
        prompt: &str,
        max_tokens: u32,
        fallback: &str,
    ) -> String {
        match self.client.complete(prompt, max_tokens).await {
            Ok(text) => {
                info!(
                    "event=summary_{} module=summary status=ok user_id={} prompt_chars={}",
                    action,
                    user_id,
                    prompt.chars().count()
                );
                text
            }
            Err(err) => {
                error!(
                    "event=summary_{} module=summary status=error user_id={} error={}",
                    action, user_id, err
                );
                fallback.to_string()
            }
        }
    }
}

/// Bullet-joined note texts, timestamps dropped. `None` when there are no notes.
fn bullet_list(notes: &[Note]) -> Option<String> {
    if notes.is_empty() {
        return None;
    }
    Some(
        notes
            .iter()
            .map(|note| format!("- {}", note.text))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

fn summary_prompt(notes: &str) -> String {
    format!("{SUMMARY_INSTRUCTION}\n\n{notes}")
}

fn question_prompt(notes: &str, question: &str) -> String {
    format!("{QUESTION_INSTRUCTION}\n\nNotes:\n{notes}\n\nQuestion: {question}\n\n{QUESTION_CHECKLIST}")
}

#[cfg(test)]
mod tests {
    use super::{bullet_list, question_prompt, summary_prompt};
    use crate::model::note::Note;

    #[test]
    fn bullet_list_drops_timestamps() {
        let notes = vec![Note::new(1, "fed 90ml"), Note::new(1, "nap 40min")];
        assert_eq!(bullet_list(&notes).unwrap(), "- fed 90ml\n- nap 40min");
        assert!(bullet_list(&[]).is_none());
    }

    #[test]
    fn prompts_embed_notes_and_question() {
        assert!(summary_prompt("- a").ends_with("briefly:\n\n- a"));
        let prompt = question_prompt("- a", "when did she last eat?");
        assert!(prompt.contains("Notes:\n- a\n\nQuestion: when did she last eat?"));
        assert!(prompt.contains("time gaps"));
    }
}
