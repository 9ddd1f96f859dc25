use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::CompletionClient;
use crate::assembler::WireMessage;

pub const DEFAULT_ENDPOINT: &str = "https://llm.api.cloud.yandex.net/foundationModels/v1/completion";
pub const DEFAULT_MODEL: &str = "yandexgpt-lite";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionRequest<'a> {
    model_uri: &'a str,
    messages: &'a [WireMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    result: CompletionResult,
}

#[derive(Deserialize)]
struct CompletionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
    #[serde(default)]
    usage: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct Alternative {
    message: AlternativeMessage,
}

#[derive(Deserialize)]
struct AlternativeMessage {
    #[serde(default)]
    text: String,
}

/// Default model URI for a folder
pub fn model_uri_for(folder_id: &str) -> String {
    format!("gpt://{}/{}", folder_id, DEFAULT_MODEL)
}

#[derive(Clone)]
pub struct YandexGptClient {
    client: Client,
    api_key: String,
    folder_id: String,
    model_uri: String,
    endpoint: String,
}

impl YandexGptClient {
    pub fn new(api_key: &str, folder_id: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            folder_id: folder_id.to_string(),
            model_uri: model_uri_for(folder_id),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_model_uri(mut self, model_uri: &str) -> Self {
        self.model_uri = model_uri.to_string();
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(self)
    }

    pub fn model_uri(&self) -> &str {
        &self.model_uri
    }

    pub async fn query(&self, messages: &[WireMessage]) -> Result<String> {
        let request = CompletionRequest {
            model_uri: &self.model_uri,
            messages,
        };

        let response = self.client
            .post(&self.endpoint)
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .header("x-folder-id", &self.folder_id)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("YandexGPT API error {}: {}", status, text));
        }

        let completion: CompletionResponse = response.json().await?;
        if let Some(usage) = &completion.result.usage {
            debug!(%usage, "completion usage");
        }

        Ok(completion.result.alternatives.into_iter().next()
            .map(|a| a.message.text)
            .unwrap_or_default())
    }
}

#[async_trait]
impl CompletionClient for YandexGptClient {
    async fn send(&self, messages: &[WireMessage]) -> Result<String> {
        self.query(messages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> YandexGptClient {
        YandexGptClient::new("secret", "folder1")
            .with_endpoint(&format!("{}/foundationModels/v1/completion", server.uri()))
    }

    #[tokio::test]
    async fn test_sends_auth_headers_and_returns_first_alternative() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/foundationModels/v1/completion"))
            .and(header("Authorization", "Api-Key secret"))
            .and(header("x-folder-id", "folder1"))
            .and(body_json(json!({
                "modelUri": "gpt://folder1/yandexgpt-lite",
                "messages": [
                    {"role": "user", "text": "hi"},
                    {"role": "assistant", "text": "hello"},
                    {"role": "user", "text": "bye"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "alternatives": [
                        {"message": {"role": "assistant", "text": "first"}, "status": "ALTERNATIVE_STATUS_FINAL"},
                        {"message": {"role": "assistant", "text": "second"}, "status": "ALTERNATIVE_STATUS_FINAL"}
                    ],
                    "usage": {"inputTextTokens": "10", "completionTokens": "2", "totalTokens": "12"},
                    "modelVersion": "23.10.2024"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let messages = vec![
            WireMessage::user("hi"),
            WireMessage::assistant("hello"),
            WireMessage::user("bye"),
        ];
        let reply = client_for(&server).send(&messages).await.unwrap();
        assert_eq!(reply, "first");
    }

    #[tokio::test]
    async fn test_no_alternatives_is_empty_reply() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {"alternatives": []}
            })))
            .mount(&server)
            .await;

        let reply = client_for(&server).send(&[WireMessage::user("x")]).await.unwrap();
        assert!(reply.is_empty());
    }

    #[tokio::test]
    async fn test_error_status_carries_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unknown api key"))
            .mount(&server)
            .await;

        let err = client_for(&server).send(&[WireMessage::user("x")]).await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("401"), "{}", text);
        assert!(text.contains("unknown api key"), "{}", text);
    }

    #[tokio::test]
    async fn test_malformed_body_is_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        assert!(client_for(&server).send(&[WireMessage::user("x")]).await.is_err());
    }

    #[test]
    fn test_custom_model_uri() {
        let client = YandexGptClient::new("k", "f").with_model_uri("gpt://f/yandexgpt/latest");
        assert_eq!(client.model_uri(), "gpt://f/yandexgpt/latest");
    }
}
