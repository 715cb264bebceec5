use async_trait::async_trait;
use notebot_core::router::{
    CANCELED, GENERIC_ERROR, IDLE_HINT, MAX_MESSAGE_LEN, NOTE_EMPTY, NOTE_PROMPT, NOTE_SAVED,
    NOTHING_TO_CANCEL, QUESTION_USAGE, SEARCH_PROMPT, SUMMARIES_DISABLED, UNKNOWN_COMMAND,
};
use notebot_core::{
    CommandRouter, CompletionClient, CompletionError, ConversationState, InboundMessage, Note,
    NoteRepository, NoteService, NoteStore, RepoResult, SqliteNoteRepository, SummaryService,
    UserId, NO_NOTES_MESSAGE,
};
use std::sync::Arc;

const CHAT: i64 = 100;
const USER: i64 = 42;

struct EchoClient;

#[async_trait]
impl CompletionClient for EchoClient {
    async fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String, CompletionError> {
        Ok(format!("summary of {} chars", prompt.chars().count()))
    }
}

/// Repository whose every call panics, standing in for a handler bug.
struct CrashingRepository;

impl NoteRepository for CrashingRepository {
    fn insert_note(&self, _note: &Note) -> RepoResult<()> {
        panic!("insert crashed");
    }

    fn list_notes(&self, _user_id: UserId, _limit: Option<u32>) -> RepoResult<Vec<Note>> {
        panic!("list crashed");
    }
}

fn router() -> CommandRouter<SqliteNoteRepository> {
    let store = Arc::new(NoteStore::new(SqliteNoteRepository::in_memory().unwrap()));
    CommandRouter::new(NoteService::new(store), None)
}

fn router_with_summaries() -> CommandRouter<SqliteNoteRepository> {
    let store = Arc::new(NoteStore::new(SqliteNoteRepository::in_memory().unwrap()));
    let summaries = SummaryService::new(Arc::clone(&store), Arc::new(EchoClient));
    CommandRouter::new(NoteService::new(store), Some(summaries))
}

async fn send(router: &CommandRouter<SqliteNoteRepository>, text: &str) -> String {
    router
        .handle(&InboundMessage::new(CHAT, USER, text))
        .await
        .expect("reply")
        .text
}

fn state(router: &CommandRouter<SqliteNoteRepository>) -> ConversationState {
    router.state(InboundMessage::new(CHAT, USER, "").conversation())
}

#[tokio::test]
async fn note_with_argument_saves_immediately() {
    let router = router();

    assert_eq!(send(&router, "/note Buy milk").await, NOTE_SAVED);

    let notes = router.notes().store().get_notes(USER);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].text, "Buy milk");
    assert_eq!(notes[0].origin.chat_id, Some(CHAT));
    assert_eq!(state(&router), ConversationState::Idle);
}

#[tokio::test]
async fn note_without_argument_prompts_then_saves_follow_up() {
    let router = router();

    assert_eq!(send(&router, "/note").await, NOTE_PROMPT);
    assert_eq!(state(&router), ConversationState::AwaitingNoteText);

    assert_eq!(send(&router, "Call the doctor").await, NOTE_SAVED);
    assert_eq!(state(&router), ConversationState::Idle);
    assert_eq!(router.notes().store().get_notes(USER)[0].text, "Call the doctor");
}

#[tokio::test]
async fn blank_follow_up_keeps_waiting_for_note_text() {
    let router = router();

    send(&router, "/note").await;
    assert_eq!(send(&router, "   ").await, NOTE_EMPTY);
    assert_eq!(state(&router), ConversationState::AwaitingNoteText);
    assert!(router.notes().store().get_notes(USER).is_empty());
}

#[tokio::test]
async fn ask_with_argument_lists_matches() {
    let router = router();
    send(&router, "/note Buy milk").await;
    send(&router, "/note Walk the dog").await;

    assert_eq!(send(&router, "/ask MILK").await, "📝 Your Notes:\n\n1. Buy milk\n");
}

#[tokio::test]
async fn ask_without_argument_uses_follow_up_as_query() {
    let router = router();
    send(&router, "/note Buy milk").await;

    assert_eq!(send(&router, "/ask").await, SEARCH_PROMPT);
    assert_eq!(state(&router), ConversationState::AwaitingSearchQuery);
    assert_eq!(send(&router, "milk").await, "📝 Your Notes:\n\n1. Buy milk\n");
    assert_eq!(state(&router), ConversationState::Idle);
}

#[tokio::test]
async fn ask_with_no_notes_reports_none_found() {
    let router = router();
    assert_eq!(send(&router, "/ask anything").await, NO_NOTES_MESSAGE);
}

#[tokio::test]
async fn log_shows_ten_newest_notes() {
    let router = router();
    for idx in 1..=12 {
        assert_eq!(send(&router, &format!("/note entry {idx}")).await, NOTE_SAVED);
    }

    let reply = send(&router, "/log").await;
    let lines: Vec<&str> = reply.lines().filter(|line| line.contains("entry")).collect();
    assert!(reply.starts_with("📋 Your Last 10 Notes:"));
    assert_eq!(lines.len(), 10);
    assert!(lines[0].starts_with("1. ["));
    assert!(lines[0].ends_with("] entry 12"));
    assert!(lines[9].ends_with("] entry 3"));
}

#[tokio::test]
async fn log_with_no_notes_reports_none_found() {
    let router = router();
    assert_eq!(send(&router, "/log").await, NO_NOTES_MESSAGE);
}

#[tokio::test]
async fn cancel_clears_pending_prompt() {
    let router = router();

    assert_eq!(send(&router, "/cancel").await, NOTHING_TO_CANCEL);
    send(&router, "/note").await;
    assert_eq!(send(&router, "/cancel").await, CANCELED);
    assert_eq!(state(&router), ConversationState::Idle);
    assert_eq!(send(&router, "stray text").await, IDLE_HINT);
    assert!(router.notes().store().get_notes(USER).is_empty());
}

#[tokio::test]
async fn new_command_replaces_pending_prompt() {
    let router = router();

    send(&router, "/note").await;
    assert_eq!(send(&router, "/ask").await, SEARCH_PROMPT);
    assert_eq!(state(&router), ConversationState::AwaitingSearchQuery);
    assert_eq!(send(&router, "milk").await, NO_NOTES_MESSAGE);
    assert!(router.notes().store().get_notes(USER).is_empty());
}

#[tokio::test]
async fn stateless_commands_keep_pending_prompt() {
    let router = router();

    send(&router, "/note").await;
    assert!(send(&router, "/help").await.contains("/note <text>"));
    assert!(send(&router, "/log").await.contains(NO_NOTES_MESSAGE));
    assert_eq!(state(&router), ConversationState::AwaitingNoteText);
    assert_eq!(send(&router, "still saved").await, NOTE_SAVED);
}

#[tokio::test]
async fn start_offers_command_keyboard() {
    let router = router();

    let reply = router
        .handle(&InboundMessage::new(CHAT, USER, "/start"))
        .await
        .unwrap();

    assert!(reply.text.contains("Welcome"));
    assert_eq!(
        reply.keyboard,
        Some(vec![
            vec!["/note".to_string(), "/ask".to_string()],
            vec!["/log".to_string(), "/help".to_string()],
        ])
    );
}

#[tokio::test]
async fn own_mention_is_accepted_and_foreign_mention_ignored() {
    let router = router().with_bot_username("notebot");

    assert_eq!(send(&router, "/note").await, NOTE_PROMPT);
    let foreign = router
        .handle(&InboundMessage::new(CHAT, USER, "/note@some_other_bot Buy milk"))
        .await;
    assert!(foreign.is_none());
    assert_eq!(state(&router), ConversationState::AwaitingNoteText);
    assert!(router.notes().store().get_notes(USER).is_empty());

    assert_eq!(send(&router, "/note@NoteBot Buy milk").await, NOTE_SAVED);
    assert_eq!(router.notes().store().get_notes(USER).len(), 1);
}

#[tokio::test]
async fn long_log_listing_splits_within_message_limit() {
    let router = router();
    for idx in 0..10 {
        let text = format!("{idx}{}", "x".repeat(599));
        assert_eq!(send(&router, &format!("/note {text}")).await, NOTE_SAVED);
    }

    let reply = router
        .handle(&InboundMessage::new(CHAT, USER, "/log"))
        .await
        .unwrap();
    assert!(reply.text.chars().count() > MAX_MESSAGE_LEN);

    let full = reply.text.clone();
    let parts = reply.split(MAX_MESSAGE_LEN);
    assert!(parts.len() > 1);
    assert!(parts
        .iter()
        .all(|part| part.text.encode_utf16().count() <= MAX_MESSAGE_LEN));
    assert!(parts.iter().all(|part| part.text.ends_with('\n')));
    let joined: String = parts.iter().map(|part| part.text.as_str()).collect();
    assert_eq!(joined, full);
}

#[tokio::test]
async fn panic_while_handling_resets_conversation() {
    let store = Arc::new(NoteStore::new(CrashingRepository));
    let router = Arc::new(CommandRouter::new(NoteService::new(store), None));
    let conversation = InboundMessage::new(CHAT, USER, "").conversation();

    let prompt = router
        .handle_contained(InboundMessage::new(CHAT, USER, "/ask"))
        .await
        .unwrap();
    assert_eq!(prompt.text, SEARCH_PROMPT);
    assert_eq!(router.state(conversation), ConversationState::AwaitingSearchQuery);

    let reply = router
        .handle_contained(InboundMessage::new(CHAT, USER, "milk"))
        .await
        .unwrap();
    assert_eq!(reply.text, GENERIC_ERROR);
    assert_eq!(router.state(conversation), ConversationState::Idle);

    let reply = router
        .handle_contained(InboundMessage::new(CHAT, USER, "/note Buy milk"))
        .await
        .unwrap();
    assert_eq!(reply.text, GENERIC_ERROR);
    assert_eq!(router.pending_conversations(), 0);

    let reply = router
        .handle_contained(InboundMessage::new(CHAT, USER, "/help"))
        .await
        .unwrap();
    assert!(reply.text.contains("/note <text>"));
}

#[tokio::test]
async fn unknown_command_and_idle_text_get_hints() {
    let router = router();
    assert_eq!(send(&router, "/frobnicate").await, UNKNOWN_COMMAND);
    assert_eq!(send(&router, "hello").await, IDLE_HINT);
}

#[tokio::test]
async fn conversations_are_independent() {
    let router = router();

    router
        .handle(&InboundMessage::new(CHAT, 1, "/note"))
        .await;
    let other = router
        .handle(&InboundMessage::new(CHAT, 2, "some text"))
        .await
        .unwrap();

    assert_eq!(other.text, IDLE_HINT);
    assert_eq!(router.pending_conversations(), 1);
    assert!(router.reset(InboundMessage::new(CHAT, 1, "").conversation()));
    assert_eq!(router.pending_conversations(), 0);
}

#[tokio::test]
async fn summary_commands_require_configuration() {
    let router = router();
    assert_eq!(send(&router, "/summary").await, SUMMARIES_DISABLED);
    assert_eq!(send(&router, "/question when?").await, SUMMARIES_DISABLED);
}

#[tokio::test]
async fn summary_commands_use_completion_client() {
    let router = router_with_summaries();
    send(&router, "/note Fed 90ml").await;

    assert!(send(&router, "/summary").await.starts_with("summary of"));
    assert!(send(&router, "/question when did she eat?").await.starts_with("summary of"));
    assert_eq!(send(&router, "/question").await, QUESTION_USAGE);
}
