//! SSE decode loop for the streaming completion response.

use eventsource_stream::Eventsource;
use futures::StreamExt;
use log::{error, trace, warn};
use reqwest::Response;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::ai::types::{ChatCompletionChunk, CompletionEvent};
use crate::util::errors::{MathMateError, MathMateResult};

const CHAT_COMPLETION_CHUNK_OBJECT: &str = "chat.completion.chunk";
const DONE_SENTINEL: &str = "[DONE]";

fn is_chat_completion_chunk(event_json: &Value) -> bool {
    matches!(
        event_json.get("object").and_then(|value| value.as_str()),
        Some(CHAT_COMPLETION_CHUNK_OBJECT)
    )
}

fn extract_api_error_message(event_json: &Value) -> Option<String> {
    let error = event_json.get("error")?;
    if let Some(message) = error.get("message").and_then(|value| value.as_str()) {
        return Some(message.to_string());
    }
    if let Some(message) = error.as_str() {
        return Some(message.to_string());
    }
    Some("An error occurred during streaming".to_string())
}

/// Convert a byte stream into completion events.
///
/// Sends decoded events over `tx_event` until the `[DONE]` sentinel, a
/// stream/API error, or `idle_timeout` of silence between events. The
/// receiver side treats a closed channel without a terminal finish reason
/// as an aborted stream.
pub async fn handle_completion_stream(
    response: Response,
    tx_event: mpsc::UnboundedSender<MathMateResult<CompletionEvent>>,
    idle_timeout: Duration,
) {
    let mut stream = response.bytes_stream().eventsource();

    loop {
        let sse_event = timeout(idle_timeout, stream.next()).await;
        let sse = match sse_event {
            Ok(Some(Ok(sse))) => sse,
            Ok(None) => {
                let error_msg = "SSE stream closed before response completed";
                error!("{}", error_msg);
                let _ = tx_event.send(Err(MathMateError::Stream(error_msg.to_string())));
                return;
            }
            Ok(Some(Err(e))) => {
                let error_msg = format!("SSE stream error: {}", e);
                error!("{}", error_msg);
                let _ = tx_event.send(Err(MathMateError::Stream(error_msg)));
                return;
            }
            Err(_) => {
                let error_msg = format!("SSE stream timeout after {}s", idle_timeout.as_secs());
                error!("{}", error_msg);
                let _ = tx_event.send(Err(MathMateError::Stream(error_msg)));
                return;
            }
        };

        let raw = sse.data;
        trace!("completion SSE: {:?}", raw);
        if raw == DONE_SENTINEL {
            return;
        }

        let event_json: Value = match serde_json::from_str(&raw) {
            Ok(json) => json,
            Err(e) => {
                let error_msg = format!("SSE parsing error: {}, data: {}", e, &raw);
                error!("{}", error_msg);
                let _ = tx_event.send(Err(MathMateError::Stream(error_msg)));
                return;
            }
        };

        if let Some(api_error_message) = extract_api_error_message(&event_json) {
            let error_msg = format!("SSE API error: {}, data: {}", api_error_message, raw);
            error!("{}", error_msg);
            let _ = tx_event.send(Err(MathMateError::Api(error_msg)));
            return;
        }

        if !is_chat_completion_chunk(&event_json) {
            warn!(
                "Skipping non-standard SSE event; object={}",
                event_json
                    .get("object")
                    .and_then(|value| value.as_str())
                    .unwrap_or("<missing>")
            );
            continue;
        }

        let chunk: ChatCompletionChunk = match serde_json::from_value(event_json) {
            Ok(chunk) => chunk,
            Err(e) => {
                let error_msg = format!("SSE data schema error: {}, data: {}", e, &raw);
                error!("{}", error_msg);
                let _ = tx_event.send(Err(MathMateError::Stream(error_msg)));
                return;
            }
        };

        let Some(event) = chunk.into_event() else {
            // Keepalive chunk with empty choices.
            trace!("Ignoring SSE chunk with empty choices: {}", raw);
            continue;
        };

        let _ = tx_event.send(Ok(event));
    }
}
