//! Telegram transport for the command router.
//!
//! # Invariants
//! - Every text message addressed to this bot yields one reply, sent as
//!   several messages when it exceeds the Telegram length limit.
//! - A panic while handling one update is contained by the router.

use log::{debug, info};
use notebot_core::router::MAX_MESSAGE_LEN;
use notebot_core::{
    open_repository, BotConfig, CommandRouter, CompletionError, DynNoteRepository,
    InboundMessage, NoteService, NoteStore, OpenAiCompletionClient, RepoError, Reply,
    SummaryService,
};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{BotCommand, BotCommandScope, ChatId, KeyboardButton, KeyboardMarkup, MenuButton};
use teloxide::RequestError;

type Router = CommandRouter<DynNoteRepository>;

const COMMANDS: &[(&str, &str)] = &[
    ("start", "Start the bot"),
    ("note", "Save a new note"),
    ("ask", "Search for a note"),
    ("log", "Show last 10 notes"),
    ("summary", "Summarize your notes"),
    ("question", "Ask about your notes"),
    ("cancel", "Cancel the current prompt"),
    ("help", "Show help message"),
];

/// Reason a bot session ended abnormally.
#[derive(Debug)]
pub enum SessionError {
    Storage(RepoError),
    Completion(CompletionError),
    Telegram(RequestError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "note storage unavailable: {err}"),
            Self::Completion(err) => write!(f, "completion client setup failed: {err}"),
            Self::Telegram(err) => write!(f, "telegram request failed: {err}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<RepoError> for SessionError {
    fn from(value: RepoError) -> Self {
        Self::Storage(value)
    }
}

impl From<CompletionError> for SessionError {
    fn from(value: CompletionError) -> Self {
        Self::Completion(value)
    }
}

impl From<RequestError> for SessionError {
    fn from(value: RequestError) -> Self {
        Self::Telegram(value)
    }
}

/// Runs one polling session until shutdown (Ctrl-C) or a startup failure.
pub async fn run_session(config: &BotConfig, attempt: u32) -> Result<(), SessionError> {
    let bot = Bot::new(config.telegram_token.as_str());
    let me = bot.get_me().await?;
    let mut router = build_router(config)?;
    if let Some(username) = me.user.username.clone() {
        router = router.with_bot_username(username);
    }
    let router = Arc::new(router);
    register_commands(&bot).await?;

    info!(
        "event=session_start module=telegram status=ok attempt={} bot_id={}",
        attempt, me.user.id.0
    );

    let handler = Update::filter_message().endpoint(handle_message);
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router])
        .default_handler(|_update| async {
            debug!("event=update_ignored module=telegram");
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "event=reply_failed module=telegram status=error",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("event=session_stop module=telegram status=ok attempt={}", attempt);
    Ok(())
}

fn build_router(config: &BotConfig) -> Result<Router, SessionError> {
    let repo = open_repository(config.storage_backend, &config.storage_path)?;
    let store = Arc::new(NoteStore::new(repo));
    let summaries = match &config.completion {
        Some(completion) => {
            let client = OpenAiCompletionClient::new(completion.clone())?;
            Some(SummaryService::new(Arc::clone(&store), Arc::new(client)))
        }
        None => None,
    };
    Ok(CommandRouter::new(NoteService::new(store), summaries))
}

async fn register_commands(bot: &Bot) -> Result<(), RequestError> {
    let commands = COMMANDS
        .iter()
        .map(|(name, description)| BotCommand::new(*name, *description));
    bot.set_my_commands(commands)
        .scope(BotCommandScope::Default)
        .await?;
    bot.set_chat_menu_button()
        .menu_button(MenuButton::Commands)
        .await?;
    Ok(())
}

async fn handle_message(bot: Bot, msg: Message, router: Arc<Router>) -> ResponseResult<()> {
    let (Some(user), Some(text)) = (msg.from(), msg.text()) else {
        return Ok(());
    };
    let inbound = InboundMessage {
        chat_id: msg.chat.id.0,
        user_id: user.id.0 as i64,
        username: user.username.clone(),
        text: text.to_string(),
    };
    match router.handle_contained(inbound).await {
        Some(reply) => send_reply(&bot, msg.chat.id, reply).await,
        None => Ok(()),
    }
}

async fn send_reply(bot: &Bot, chat_id: ChatId, reply: Reply) -> ResponseResult<()> {
    for part in reply.split(MAX_MESSAGE_LEN) {
        if part.text.trim().is_empty() {
            continue;
        }
        let request = bot.send_message(chat_id, part.text);
        match part.keyboard {
            Some(rows) => {
                let keyboard = KeyboardMarkup::new(
                    rows.into_iter()
                        .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>()),
                )
                .resize_keyboard(true);
                request.reply_markup(keyboard).await?;
            }
            None => {
                request.await?;
            }
        }
    }
    Ok(())
}
