use serde::{Deserialize, Serialize};

/// Chat mode, governs system-prompt injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    FreeChat,
    BugFix,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::FreeChat => "free",
            Mode::BugFix => "bugfix",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "free" | "freechat" => Some(Mode::FreeChat),
            "bugfix" | "bug-fix" => Some(Mode::BugFix),
            _ => None,
        }
    }

    pub fn all() -> Vec<Mode> {
        vec![Mode::FreeChat, Mode::BugFix]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Mode::FreeChat => "Free chat",
            Mode::BugFix => "Bug fix",
        }
    }

    /// System message shown in the history when this mode becomes active
    pub fn announcement(&self) -> &'static str {
        match self {
            Mode::FreeChat => "Режим свободного общения активирован. Вы можете общаться с ассистентом на любые темы.",
            Mode::BugFix => "Активирован режим фикса багов. Прикрепите файл с исходным кодом и опишите в сообщении природу бага.",
        }
    }
}
