//! Text-completion collaborators used for summaries and questions.
//!
//! # Responsibility
//! - Define the `CompletionClient` seam so services never see HTTP details.
//! - Provide an OpenAI-compatible chat-completions implementation.

mod openai;

pub use openai::{CompletionConfig, OpenAiCompletionClient};

use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure talking to the completion service.
#[derive(Debug)]
pub enum CompletionError {
    /// Transport failure, including timeouts.
    Http(reqwest::Error),
    /// Service answered with a non-success status.
    Status { status: u16, body: String },
    /// Response decoded but carried no usable text.
    EmptyResponse,
}

impl Display for CompletionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(err) if err.is_timeout() => write!(f, "completion request timed out"),
            Self::Http(err) => write!(f, "completion request failed: {err}"),
            Self::Status { status, body } => write!(f, "completion service returned {status}: {body}"),
            Self::EmptyResponse => write!(f, "completion response had no choices"),
        }
    }
}

impl Error for CompletionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

/// Single-shot text completion.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Completes `prompt`, producing at most `max_tokens` tokens of output.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, CompletionError>;
}
