//! The conversation container: sole writer of `ConversationState`
//!
//! State lives in a `watch` channel. Every operation computes the next
//! snapshot from the latest one and swaps it in under the channel's lock, so
//! readers always see a whole snapshot and a reply landing after a mode switch
//! is merged into the switched state rather than overwriting it.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::ai::CompletionClient;
use crate::assembler::{assemble_request, WireMessage};
use crate::attachment::AttachmentError;
use crate::error::ChatError;
use crate::mode::Mode;
use crate::state::{AttachedFile, ConversationState, Message};
use crate::tokens::TokenBudget;

struct Inner {
    state: watch::Sender<ConversationState>,
    client: Arc<dyn CompletionClient>,
    budget: TokenBudget,
}

/// Cheap to clone; all clones share one conversation
#[derive(Clone)]
pub struct Conversation {
    inner: Arc<Inner>,
}

/// What happened to a `submit` call
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Blank input, nothing changed
    Ignored,
    /// Another request is still in flight, nothing changed
    Busy,
    /// Rejected before any network call; the error is also in the state
    Rejected(ChatError),
    /// The user message was recorded and the request is running
    Sent(PendingReply),
}

/// Handle to an in-flight request
///
/// Dropping the handle detaches the request; it still completes and records
/// its result. Call [`PendingReply::cancel`] to abandon the reply instead.
#[derive(Debug)]
pub struct PendingReply {
    task: JoinHandle<()>,
    cancel: CancellationToken,
}

impl PendingReply {
    /// Abandon the reply. Loading ends without an error or assistant message.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the result (or cancellation) has been applied to the state
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            warn!(error = %e, "completion task did not finish cleanly");
        }
    }
}

impl Conversation {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self::with_budget(client, TokenBudget::default())
    }

    pub fn with_budget(client: Arc<dyn CompletionClient>, budget: TokenBudget) -> Self {
        let (state, _) = watch::channel(ConversationState::default());
        Self {
            inner: Arc::new(Inner {
                state,
                client,
                budget,
            }),
        }
    }

    /// A copy of the current state
    pub fn snapshot(&self) -> ConversationState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.inner.state.subscribe()
    }

    pub fn budget(&self) -> TokenBudget {
        self.inner.budget
    }

    /// Returns `true` if the mode actually changed.
    pub fn switch_mode(&self, mode: Mode) -> bool {
        let changed = self.update(|state| state.with_mode(mode));
        if changed {
            info!(mode = mode.as_str(), "switched mode");
        }
        changed
    }

    /// Replace the attachment slot. Does no validation.
    pub fn attach_file(&self, file: AttachedFile) {
        info!(name = %file.name, chars = file.content.chars().count(), "attached file");
        self.update(|state| Some(state.with_attachment(file)));
    }

    /// Attach a validated file, or surface why validation failed.
    ///
    /// Returns `true` if the file was attached.
    pub fn attach_checked(&self, result: Result<AttachedFile, AttachmentError>) -> bool {
        match result {
            Ok(file) => {
                self.attach_file(file);
                true
            }
            Err(e) => {
                warn!(error = %e, "attachment rejected");
                self.set_error(ChatError::from(e).to_string());
                false
            }
        }
    }

    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.update(|state| Some(state.with_error(Some(message))));
    }

    pub fn clear_error(&self) {
        self.update(|state| state.error.is_some().then(|| state.with_error(None)));
    }

    /// Record `text` as a user message and ask the model for a reply.
    ///
    /// Must be called from within a Tokio runtime; the request runs on a
    /// spawned task.
    pub fn submit(&self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }

        let mut busy = false;
        let mut rejection = None;
        let mut request: Option<Vec<WireMessage>> = None;

        // Gate, append and assemble in one step so nothing can slip in between
        self.update(|state| {
            if state.loading {
                busy = true;
                return None;
            }

            let file = state.attached_file.as_ref().map(|f| f.content.as_str());
            match self.inner.budget.check(text, file) {
                Err(e) => {
                    let next = state.with_error(Some(e.to_string()));
                    rejection = Some(e);
                    Some(next)
                }
                Ok(_) => {
                    let next = state.with_pending_user_message(Message::user(text));
                    request = Some(assemble_request(
                        &next.messages,
                        next.mode,
                        next.attached_file.as_ref(),
                    ));
                    Some(next)
                }
            }
        });

        if busy {
            return SubmitOutcome::Busy;
        }
        if let Some(e) = rejection {
            warn!(error = %e, "submission rejected");
            return SubmitOutcome::Rejected(e);
        }
        match request {
            Some(wire) => SubmitOutcome::Sent(self.spawn_request(wire)),
            None => SubmitOutcome::Ignored,
        }
    }

    fn spawn_request(&self, wire: Vec<WireMessage>) -> PendingReply {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let this = self.clone();

        let task = tokio::spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => {
                    info!("completion request cancelled");
                    this.update(|state| state.loading.then(|| state.without_loading()));
                    return;
                }
                result = this.inner.client.send(&wire) => result,
            };
            this.finish(result);
        });

        PendingReply { task, cancel }
    }

    /// Apply the client's result. Any non-empty text, even whitespace, is a reply.
    fn finish(&self, result: anyhow::Result<String>) {
        let error = match result {
            Ok(reply) if !reply.is_empty() => {
                info!(chars = reply.chars().count(), "received reply");
                self.update(|state| Some(state.with_reply(Message::assistant(reply))));
                return;
            }
            Ok(_) => ChatError::EmptyResponse,
            Err(e) => ChatError::transport(&e),
        };

        warn!(error = %error, "completion failed");
        let message = error.to_string();
        self.update(|state| Some(state.with_failure(message)));
    }

    /// Replace the current snapshot with `transition(current)`, atomically.
    ///
    /// `None` leaves the state untouched and wakes no one.
    fn update<F>(&self, transition: F) -> bool
    where
        F: FnOnce(&ConversationState) -> Option<ConversationState>,
    {
        self.inner.state.send_if_modified(|current| match transition(current) {
            Some(next) => {
                *current = next;
                true
            }
            None => false,
        })
    }
}
