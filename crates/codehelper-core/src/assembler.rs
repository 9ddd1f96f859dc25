//! Builds the message list sent to the completion API from the chat history

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::mode::Mode;
use crate::state::{AttachedFile, Message, Role};

/// Expert-programmer instructions prepended to the first user turn in bug-fix mode
pub const BUG_FIX_PROMPT: &str = "Ты - эксперт-программист. Пользователь присылает тебе исходный код и описание проблемы. \n\
Твоя задача - проанализировать код, найти причину ошибки (бага) и предложить исправление. \n\
Предоставь исправленный код и краткое пояснение к решению. \n\
Отвечай только на вопросы, связанные с программированием. \n\
Если вопрос не о коде, вежливо откажись отвечать.";

/// Role as the completion API spells it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    User,
    Assistant,
}

impl WireRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireRole::User => "user",
            WireRole::Assistant => "assistant",
        }
    }
}

/// A role/text pair in the shape the completion endpoint expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: WireRole,
    pub text: String,
}

impl WireMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: WireRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: WireRole::Assistant,
            text: text.into(),
        }
    }
}

/// Translate the UI history into wire messages.
///
/// System messages are UI annotations and are skipped. In bug-fix mode the
/// first user message of `history` carries the expert prompt and, when a file
/// is attached, its content.
pub fn assemble_request(
    history: &[Message],
    mode: Mode,
    attached_file: Option<&AttachedFile>,
) -> Vec<WireMessage> {
    let mut wire = Vec::with_capacity(history.len());
    let mut prompt_injected = false;

    for message in history {
        match message.role {
            Role::System => continue,
            Role::User => {
                let text = if mode == Mode::BugFix && !prompt_injected {
                    prompt_injected = true;
                    bug_fix_request(&message.text, attached_file)
                } else {
                    message.text.clone()
                };
                wire.push(WireMessage::user(text));
            }
            Role::Assistant => wire.push(WireMessage::assistant(message.text.clone())),
        }
    }

    debug!(
        messages = wire.len(),
        chars = wire.iter().map(|m| m.text.chars().count()).sum::<usize>(),
        mode = mode.as_str(),
        "assembled completion request"
    );
    wire
}

fn bug_fix_request(description: &str, attached_file: Option<&AttachedFile>) -> String {
    match attached_file {
        Some(file) => format!(
            "{}\n\nИсходный код:\n```\n{}\n```\n\nОписание проблемы: {}",
            BUG_FIX_PROMPT, file.content, description
        ),
        None => format!("{}\n\n{}", BUG_FIX_PROMPT, description),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> AttachedFile {
        AttachedFile::new("a.py", "print(1)")
    }

    #[test]
    fn test_bug_fix_with_file() {
        let history = vec![Message::user("fix this")];
        let wire = assemble_request(&history, Mode::BugFix, Some(&file()));

        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0].role, WireRole::User);
        assert!(wire[0].text.starts_with(BUG_FIX_PROMPT));
        assert!(wire[0].text.contains("```\nprint(1)\n```"));
        assert!(wire[0].text.ends_with("Описание проблемы: fix this"));
    }

    #[test]
    fn test_bug_fix_without_file() {
        let history = vec![Message::user("fix this")];
        let wire = assemble_request(&history, Mode::BugFix, None);
        assert_eq!(wire[0].text, format!("{}\n\nfix this", BUG_FIX_PROMPT));
    }

    #[test]
    fn test_free_chat_passes_through() {
        let history = vec![Message::user("fix this")];
        let wire = assemble_request(&history, Mode::FreeChat, Some(&file()));
        assert_eq!(wire, vec![WireMessage::user("fix this")]);
    }

    #[test]
    fn test_system_messages_dropped_and_only_first_user_injected() {
        let history = vec![
            Message::system(Mode::BugFix.announcement()),
            Message::user("first"),
            Message::assistant("answer"),
            Message::user("second"),
        ];
        let wire = assemble_request(&history, Mode::BugFix, Some(&file()));

        assert_eq!(wire.len(), 3);
        assert!(wire[0].text.starts_with(BUG_FIX_PROMPT));
        assert_eq!(wire[1], WireMessage::assistant("answer"));
        assert_eq!(wire[2], WireMessage::user("second"));
    }

    #[test]
    fn test_injection_targets_first_user_of_whole_history() {
        // Earlier free-chat turns still count as "first" once bug-fix is active
        let history = vec![
            Message::user("hello"),
            Message::assistant("hi"),
            Message::system(Mode::BugFix.announcement()),
            Message::user("the bug"),
        ];
        let wire = assemble_request(&history, Mode::BugFix, None);
        assert!(wire[0].text.starts_with(BUG_FIX_PROMPT));
        assert!(wire[0].text.ends_with("hello"));
        assert_eq!(wire[2], WireMessage::user("the bug"));
    }

    #[test]
    fn test_wire_role_serializes_lowercase() {
        let json = serde_json::to_string(&WireMessage::assistant("x")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","text":"x"}"#);
    }
}
