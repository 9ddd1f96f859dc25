pub mod ai;
pub mod assembler;
pub mod attachment;
pub mod codeblock;
pub mod config;
pub mod conversation;
pub mod error;
pub mod mode;
pub mod state;
pub mod tokens;

// Re-export main types for convenience
pub use ai::{CompletionClient, YandexGptClient};
pub use assembler::{assemble_request, WireMessage, WireRole};
pub use attachment::{AttachmentError, AttachmentPolicy};
pub use codeblock::{code_blocks, parse_segments, ContentSegment};
pub use config::Config;
pub use conversation::{Conversation, PendingReply, SubmitOutcome};
pub use error::ChatError;
pub use mode::Mode;
pub use state::{AttachedFile, ConversationState, Message, Role};
pub use tokens::{estimate_tokens, TokenBudget};
