//! Helpers shared by the front end's unit tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use codehelper_core::{AttachmentPolicy, CompletionClient, Conversation, WireMessage};

use crate::app::App;

/// Replies from a fixed queue, then "ok"
pub struct ScriptedClient {
    replies: Mutex<VecDeque<anyhow::Result<String>>>,
}

impl ScriptedClient {
    pub fn new(replies: Vec<anyhow::Result<String>>) -> Arc<Self> {
        Arc::new(Self { replies: Mutex::new(replies.into()) })
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn send(&self, _messages: &[WireMessage]) -> anyhow::Result<String> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("ok".to_string()))
    }
}

pub fn app_with(replies: Vec<anyhow::Result<String>>) -> App {
    let conversation = Conversation::new(ScriptedClient::new(replies));
    App::new(conversation, AttachmentPolicy::default(), "gpt://folder/yandexgpt-lite")
}
