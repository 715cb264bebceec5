//! Chat command parsing.
//!
//! Syntax: `/name[@botname] [argument]`. Names are case-insensitive; the
//! argument is the trimmed remainder and is `None` when blank. A command
//! mentioning a different bot is not ours to answer.

use once_cell::sync::Lazy;
use regex::Regex;

static COMMAND_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/([A-Za-z0-9_]+)(?:@([A-Za-z0-9_]+))?(?:\s+([\s\S]*))?$")
        .expect("valid command regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Note,
    Ask,
    Log,
    Cancel,
    Summary,
    Question,
    Unknown(String),
}

impl Command {
    fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "start" => Self::Start,
            "help" => Self::Help,
            "note" => Self::Note,
            "ask" => Self::Ask,
            "log" => Self::Log,
            "cancel" => Self::Cancel,
            "summary" => Self::Summary,
            "question" => Self::Question,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Commands answered from any state without touching it.
    pub fn is_stateless(&self) -> bool {
        matches!(self, Self::Start | Self::Help | Self::Log)
    }
}

/// One inbound chat message, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command {
        command: Command,
        argument: Option<String>,
    },
    Text(String),
    /// Command addressed to another bot via `@mention`.
    Foreign { mention: String },
}

impl Input {
    /// Classifies `text`. With `own_username` set, a command mentioning any
    /// other bot becomes [`Input::Foreign`]; without it every mention is
    /// accepted.
    pub fn parse(text: &str, own_username: Option<&str>) -> Self {
        let trimmed = text.trim();
        let Some(caps) = COMMAND_RE.captures(trimmed) else {
            return Self::Text(trimmed.to_string());
        };
        if let (Some(mention), Some(own)) = (caps.get(2), own_username) {
            let own = own.trim_start_matches('@');
            if !mention.as_str().eq_ignore_ascii_case(own) {
                return Self::Foreign {
                    mention: mention.as_str().to_string(),
                };
            }
        }
        Self::Command {
            command: Command::from_name(&caps[1]),
            argument: caps
                .get(3)
                .map(|arg| arg.as_str().trim())
                .filter(|arg| !arg.is_empty())
                .map(str::to_string),
        }
    }
}
