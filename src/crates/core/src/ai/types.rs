//! Wire types for the streaming chat-completion API.

use serde::Deserialize;

/// Why the model stopped emitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    /// Natural end of the reply.
    Stop,
    /// Token budget reached; the reply is truncated.
    Length,
    Other(String),
}

impl FinishReason {
    fn parse(raw: &str) -> Self {
        match raw {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

/// One decoded stream event: a content fragment, a terminal signal, or both.
/// This is the entire shape the reconciler depends on; any provider that
/// emits it can substitute for the default one.
#[derive(Debug, Clone, Default)]
pub struct CompletionEvent {
    pub text: Option<String>,
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

impl ChatCompletionChunk {
    /// Collapse a chunk into a single event. `None` for keepalive chunks
    /// with empty choices.
    pub fn into_event(self) -> Option<CompletionEvent> {
        let choice = self.choices.into_iter().next()?;
        Some(CompletionEvent {
            text: choice.delta.content,
            finish_reason: choice.finish_reason.as_deref().map(FinishReason::parse),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_chunk_becomes_text_event() {
        let raw = r#"{
            "id": "chatcmpl_test",
            "object": "chat.completion.chunk",
            "created": 123,
            "model": "gpt-test",
            "choices": [{
                "index": 0,
                "delta": {"content": "Hello"},
                "finish_reason": null
            }]
        }"#;

        let chunk: ChatCompletionChunk = serde_json::from_str(raw).expect("valid chunk");
        let event = chunk.into_event().expect("one event");
        assert_eq!(event.text.as_deref(), Some("Hello"));
        assert!(event.finish_reason.is_none());
    }

    #[test]
    fn finish_chunk_carries_the_reason() {
        let raw = r#"{
            "id": "chatcmpl_test",
            "object": "chat.completion.chunk",
            "created": 123,
            "model": "gpt-test",
            "choices": [{
                "index": 0,
                "delta": {},
                "finish_reason": "length"
            }]
        }"#;

        let chunk: ChatCompletionChunk = serde_json::from_str(raw).expect("valid chunk");
        let event = chunk.into_event().expect("one event");
        assert!(event.text.is_none());
        assert_eq!(event.finish_reason, Some(FinishReason::Length));
    }

    #[test]
    fn empty_choices_chunk_is_dropped() {
        let raw = r#"{
            "id": "chatcmpl_test",
            "object": "chat.completion.chunk",
            "created": 123,
            "model": "gpt-test",
            "choices": []
        }"#;

        let chunk: ChatCompletionChunk = serde_json::from_str(raw).expect("valid chunk");
        assert!(chunk.into_event().is_none());
    }

    #[test]
    fn unknown_finish_reason_is_preserved() {
        assert_eq!(
            FinishReason::parse("content_filter"),
            FinishReason::Other("content_filter".to_string())
        );
    }
}
