//! Streaming chat-completion client.

use std::time::Duration;

use log::debug;
use tokio::sync::mpsc;

use crate::ai::stream_handler::handle_completion_stream;
use crate::ai::types::CompletionEvent;
use crate::chat::message::ChatMessage;
use crate::config::BotConfig;
use crate::util::errors::{MathMateError, MathMateResult};

pub struct CompletionClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    temperature: f32,
    idle_timeout: Duration,
}

impl CompletionClient {
    pub fn new(config: &BotConfig) -> MathMateResult<Self> {
        if config.api_key.is_empty() {
            return Err(MathMateError::Config("completion API key is empty".into()));
        }
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            idle_timeout: config.idle_timeout,
        })
    }

    /// Issue one streaming request. Decoded events arrive on the returned
    /// channel; decoding runs in a background task until the stream ends.
    pub async fn stream_chat(
        &self,
        messages: &[ChatMessage],
    ) -> MathMateResult<mpsc::UnboundedReceiver<MathMateResult<CompletionEvent>>> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": messages,
            "stream": true,
        });

        debug!(
            "completion request: model={} messages={}",
            self.model,
            messages.len()
        );

        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MathMateError::Api(format!(
                "completion request failed: {} {}",
                status, body
            )));
        }

        let (tx_event, rx_event) = mpsc::unbounded_channel();
        let idle_timeout = self.idle_timeout;
        tokio::spawn(handle_completion_stream(response, tx_event, idle_timeout));
        Ok(rx_event)
    }
}
