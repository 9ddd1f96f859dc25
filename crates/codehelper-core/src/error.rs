use thiserror::Error;

use crate::attachment::AttachmentError;

/// Everything that can end up in `ConversationState::error`
///
/// None of these are fatal; the Display text is what the user sees.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Request is too large (about {estimated} tokens). Maximum: {limit} tokens. Shorten the description or pick a smaller file.")]
    TokenBudgetExceeded { estimated: usize, limit: usize },

    #[error("Empty response from API")]
    EmptyResponse,

    #[error("Request failed: {0}")]
    Transport(String),

    #[error(transparent)]
    AttachmentRejected(#[from] AttachmentError),
}

impl ChatError {
    pub fn transport(err: &anyhow::Error) -> Self {
        // Alternate formatting keeps the cause chain on one line
        ChatError::Transport(format!("{:#}", err))
    }
}
