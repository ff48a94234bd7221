//! Completion API access: request building and SSE stream decoding.

pub mod client;
pub mod stream_handler;
pub mod types;

pub use client::CompletionClient;
pub use types::{CompletionEvent, FinishReason};
