pub mod yandex;

pub use yandex::YandexGptClient;

use anyhow::Result;
use async_trait::async_trait;

use crate::assembler::WireMessage;

/// Something that can turn a message list into the model's reply
///
/// Implementations own authentication, model selection and transport
/// timeouts. An empty string means the model produced no usable answer.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn send(&self, messages: &[WireMessage]) -> Result<String>;
}
