//! UI-agnostic conversation state types
//!
//! Everything a front end needs to render the chat lives here. Snapshots are
//! plain values: the conversation container replaces them wholesale on every
//! transition, so a reader never sees a half-applied change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mode::Mode;

/// A message in the conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }
}

/// The role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    /// UI-only annotation, never sent upstream
    System,
}

/// A source file attached to the next bug-fix request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedFile {
    pub name: String,
    pub content: String,
}

impl AttachedFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// One consistent snapshot of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub mode: Mode,
    pub loading: bool,
    pub error: Option<String>,
    pub attached_file: Option<AttachedFile>,
}

impl ConversationState {
    /// Switch to `mode`, announcing it with a system message.
    ///
    /// Returns `None` when `mode` is already active.
    pub fn with_mode(&self, mode: Mode) -> Option<Self> {
        if self.mode == mode {
            return None;
        }
        let mut next = self.clone();
        next.push_message(Message::system(mode.announcement()));
        next.mode = mode;
        next.attached_file = None;
        Some(next)
    }

    pub fn with_attachment(&self, file: AttachedFile) -> Self {
        Self {
            attached_file: Some(file),
            ..self.clone()
        }
    }

    pub fn with_error(&self, error: Option<String>) -> Self {
        Self {
            error,
            ..self.clone()
        }
    }

    /// Append the user's message and mark a request as in flight.
    pub fn with_pending_user_message(&self, message: Message) -> Self {
        let mut next = self.clone();
        next.push_message(message);
        next.loading = true;
        next.error = None;
        next
    }

    /// Record a reply from the model and finish the request.
    pub fn with_reply(&self, reply: Message) -> Self {
        let mut next = self.clone();
        next.push_message(reply);
        next.loading = false;
        next
    }

    /// Finish the request without a reply, recording why.
    pub fn with_failure(&self, error: String) -> Self {
        Self {
            loading: false,
            error: Some(error),
            ..self.clone()
        }
    }

    /// Finish the request silently; the reply was abandoned.
    pub fn without_loading(&self) -> Self {
        Self {
            loading: false,
            ..self.clone()
        }
    }

    /// Append `message`, never letting its timestamp precede the previous one.
    ///
    /// The wall clock can step backwards; history timestamps must not.
    fn push_message(&mut self, mut message: Message) {
        if let Some(last) = self.messages.last() {
            message.created_at = message.created_at.max(last.created_at);
        }
        self.messages.push(message);
    }

    /// Messages that carry a model reply, newest last
    pub fn assistant_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role == Role::Assistant)
    }
}
