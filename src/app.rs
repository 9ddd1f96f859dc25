use std::path::PathBuf;

use codehelper_core::attachment;
use codehelper_core::{
    code_blocks, AttachmentPolicy, ContentSegment, Conversation, ConversationState, Mode,
    PendingReply, SubmitOutcome,
};
use ratatui::layout::Rect;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
    /// Typing the path of a file to attach
    AttachPath,
}

/// One line of feedback shown in the footer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub is_error: bool,
}

impl Status {
    pub fn info(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: false }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: true }
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub conversation: Conversation,
    /// Last snapshot received from the conversation
    pub state: ConversationState,
    pub attachment_policy: AttachmentPolicy,
    pub model_uri: String,

    // Message input
    pub input: String,
    pub input_cursor: usize, // cursor position in chars

    // Attach prompt
    pub path_input: String,
    pub path_cursor: usize,

    pub pending: Option<PendingReply>,

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub chat_total_lines: u16,
    pub follow_bottom: bool,
    pub chat_area: Option<Rect>,

    // Code block selection (index over all blocks in assistant replies)
    pub selected_block: Option<usize>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub status: Option<Status>,
}

impl App {
    pub fn new(conversation: Conversation, attachment_policy: AttachmentPolicy, model_uri: impl Into<String>) -> Self {
        let state = conversation.snapshot();
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            conversation,
            state,
            attachment_policy,
            model_uri: model_uri.into(),

            input: String::new(),
            input_cursor: 0,

            path_input: String::new(),
            path_cursor: 0,

            pending: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_total_lines: 0,
            follow_bottom: true,
            chat_area: None,

            selected_block: None,

            animation_frame: 0,

            status: None,
        }
    }

    /// Adopt a new snapshot from the conversation.
    ///
    /// An error is moved into the footer and then cleared upstream, so each
    /// one is shown once.
    pub fn apply_state(&mut self, state: ConversationState) {
        if let Some(error) = &state.error {
            self.status = Some(Status::error(error.clone()));
            self.conversation.clear_error();
        }

        if !state.loading && self.pending.as_ref().is_some_and(|p| p.is_finished()) {
            self.pending = None;
        }

        let block_count = self.code_blocks().len();
        self.state = state;
        let new_count = self.code_blocks().len();
        if new_count > block_count {
            // Jump to the first block of the newest reply
            self.selected_block = Some(block_count);
        } else if new_count == 0 {
            self.selected_block = None;
        }

        if self.follow_bottom {
            self.scroll_to_bottom();
        }
    }

    pub fn refresh(&mut self) {
        let snapshot = self.conversation.snapshot();
        self.apply_state(snapshot);
    }

    pub fn is_loading(&self) -> bool {
        self.state.loading
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn submit_input(&mut self) {
        match self.conversation.submit(&self.input) {
            SubmitOutcome::Ignored => {}
            SubmitOutcome::Busy => {
                self.status = Some(Status::info("Still waiting for the previous reply (Esc to cancel)"));
            }
            // The error reaches the footer through the state; keep the text so it can be trimmed
            SubmitOutcome::Rejected(e) => debug!(error = %e, "input kept after rejection"),
            SubmitOutcome::Sent(pending) => {
                self.input.clear();
                self.input_cursor = 0;
                self.input_mode = InputMode::Normal;
                self.pending = Some(pending);
                self.status = None;
                self.follow_bottom = true;
            }
        }
        self.refresh();
    }

    pub fn switch_mode(&mut self, mode: Mode) {
        if self.conversation.switch_mode(mode) {
            self.status = Some(Status::info(format!("{} mode", mode.display_name())));
        }
        if self.input_mode == InputMode::AttachPath {
            self.input_mode = InputMode::Normal;
        }
        self.follow_bottom = true;
        self.refresh();
    }

    pub fn toggle_mode(&mut self) {
        let next = match self.mode() {
            Mode::FreeChat => Mode::BugFix,
            Mode::BugFix => Mode::FreeChat,
        };
        self.switch_mode(next);
    }

    /// Attaching is offered only in bug-fix mode and never while a request runs
    pub fn can_attach(&self) -> bool {
        self.mode() == Mode::BugFix && !self.is_loading()
    }

    pub fn begin_attach(&mut self) {
        if !self.can_attach() {
            let hint = if self.is_loading() {
                "Wait for the reply before attaching a file"
            } else {
                "Switch to bug-fix mode (2) to attach a file"
            };
            self.status = Some(Status::info(hint));
            return;
        }
        self.path_input.clear();
        self.path_cursor = 0;
        self.input_mode = InputMode::AttachPath;
    }

    pub fn cancel_attach(&mut self) {
        self.path_input.clear();
        self.path_cursor = 0;
        self.input_mode = InputMode::Normal;
    }

    pub fn confirm_attach(&mut self) {
        let raw = self.path_input.trim().to_string();
        self.cancel_attach();
        if raw.is_empty() || !self.can_attach() {
            return;
        }

        let path = expand_home(&raw);
        let result = attachment::load(&path, &self.attachment_policy);
        let name = result.as_ref().ok().map(|f| f.name.clone());
        if self.conversation.attach_checked(result) {
            if let Some(name) = name {
                self.status = Some(Status::info(format!("Attached file: {}", name)));
            }
        }
        self.refresh();
    }

    pub fn cancel_request(&mut self) {
        if !self.is_loading() {
            return;
        }
        if let Some(pending) = self.pending.take() {
            pending.cancel();
            info!("request cancelled by user");
            self.status = Some(Status::info("Request cancelled"));
        }
    }

    /// All code blocks in assistant replies, oldest first
    pub fn code_blocks(&self) -> Vec<ContentSegment> {
        self.state
            .assistant_messages()
            .flat_map(|m| code_blocks(&m.text))
            .collect()
    }

    pub fn select_next_block(&mut self) {
        let len = self.code_blocks().len();
        if len > 0 {
            let i = self.selected_block.map(|i| (i + 1) % len).unwrap_or(0);
            self.selected_block = Some(i);
        }
    }

    pub fn select_prev_block(&mut self) {
        let len = self.code_blocks().len();
        if len > 0 {
            let i = self.selected_block.map(|i| (i + len - 1) % len).unwrap_or(len - 1);
            self.selected_block = Some(i);
        }
    }

    /// Body of the selected code block, ready for the clipboard
    pub fn selected_block_text(&self) -> Option<String> {
        let i = self.selected_block?;
        self.code_blocks().get(i).map(|b| b.copy_text().to_string())
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        } else if self.pending.as_ref().is_some_and(|p| p.is_finished()) {
            self.pending = None;
        }
    }

    // Chat scrolling
    fn max_scroll(&self) -> u16 {
        self.chat_total_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = (self.chat_scroll.saturating_add(lines)).min(self.max_scroll());
        self.follow_bottom = self.chat_scroll >= self.max_scroll();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_bottom = false;
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }

    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
        self.follow_bottom = true;
    }
}

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}
