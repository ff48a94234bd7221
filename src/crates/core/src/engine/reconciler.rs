//! Streaming reconciliation: turns the completion event stream into
//! outward message edits.

use async_trait::async_trait;
use log::{trace, warn};
use tokio::sync::mpsc;

use crate::ai::types::{CompletionEvent, FinishReason};
use crate::chat::message::ReplyId;
use crate::config::BotConfig;
use crate::engine::extractor::SegmentExtractor;
use crate::util::errors::MathMateResult;

/// Outward message surface. One operation: replace the reply's full text.
/// Set-semantics make every flush idempotent — a failed flush is healed by
/// the next one, which carries a superset of the text.
#[async_trait]
pub trait FlushSink: Send + Sync {
    async fn set_outward_text(&self, reply_id: &ReplyId, text: &str) -> MathMateResult<()>;
}

/// How a streaming pass ended.
#[derive(Debug, PartialEq, Eq)]
pub enum PassOutcome {
    /// Normal completion. `hidden` is the last hidden segment the model
    /// closed during the pass, if any.
    Completed {
        visible: String,
        hidden: Option<String>,
    },
    /// The token budget cut the reply short. No hidden segment survives a
    /// truncated pass.
    Truncated { visible: String },
}

pub struct Reconciler<'a> {
    config: &'a BotConfig,
    sink: &'a dyn FlushSink,
}

impl<'a> Reconciler<'a> {
    pub fn new(config: &'a BotConfig, sink: &'a dyn FlushSink) -> Self {
        Self { config, sink }
    }

    /// Drive one streaming pass to completion.
    ///
    /// Visible text is flushed every `flush_every` new fragments and once
    /// more at the end, so flushed texts grow monotonically. A stream that
    /// dies without a finish reason still gets its accumulated text flushed;
    /// its partial hidden state is discarded.
    pub async fn run_pass(
        &self,
        reply_id: &ReplyId,
        mut events: mpsc::UnboundedReceiver<MathMateResult<CompletionEvent>>,
    ) -> MathMateResult<PassOutcome> {
        let mut extractor = SegmentExtractor::new(self.config.delimiters);
        let mut last_hidden: Option<String> = None;
        let mut pending_fragments = 0usize;

        while let Some(event) = events.recv().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    warn!("stream aborted for reply {}: {}", reply_id, e);
                    break;
                }
            };

            if let Some(text) = event.text.as_deref() {
                let outcome = extractor.push(text);
                if let Some(hidden) = outcome.hidden_segment {
                    trace!("hidden segment closed for reply {}: {:?}", reply_id, hidden);
                    last_hidden = Some(hidden);
                }
                if outcome.visible_grew {
                    pending_fragments += 1;
                    if pending_fragments > self.config.flush_every {
                        self.flush(reply_id, extractor.visible()).await?;
                        pending_fragments = 0;
                    }
                }
            }

            match event.finish_reason {
                Some(FinishReason::Stop) => {
                    self.flush(reply_id, extractor.visible()).await?;
                    return Ok(PassOutcome::Completed {
                        visible: extractor.visible().to_string(),
                        hidden: last_hidden,
                    });
                }
                Some(FinishReason::Length) => {
                    let notice = format!(
                        "{}...\n\n{}",
                        extractor.visible(),
                        self.config.max_token_notice()
                    );
                    self.sink.set_outward_text(reply_id, &notice).await?;
                    return Ok(PassOutcome::Truncated {
                        visible: extractor.visible().to_string(),
                    });
                }
                Some(FinishReason::Other(reason)) => {
                    warn!("unexpected finish reason for reply {}: {}", reply_id, reason);
                }
                None => {}
            }
        }

        // Aborted stream: keep what the user can already see, drop the rest.
        self.flush(reply_id, extractor.visible()).await?;
        Ok(PassOutcome::Completed {
            visible: extractor.visible().to_string(),
            hidden: None,
        })
    }

    async fn flush(&self, reply_id: &ReplyId, text: &str) -> MathMateResult<()> {
        if text.is_empty() {
            return Ok(());
        }
        trace!("flush for reply {}: {} chars", reply_id, text.len());
        self.sink.set_outward_text(reply_id, text).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Records every flushed text.
    #[derive(Default)]
    struct RecordingSink {
        flushes: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl FlushSink for RecordingSink {
        async fn set_outward_text(&self, _reply_id: &ReplyId, text: &str) -> MathMateResult<()> {
            self.flushes.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn config(flush_every: usize) -> BotConfig {
        let mut config = BotConfig::new("test-key");
        config.flush_every = flush_every;
        config
    }

    fn text_event(text: &str) -> MathMateResult<CompletionEvent> {
        Ok(CompletionEvent {
            text: Some(text.to_string()),
            finish_reason: None,
        })
    }

    fn finish_event(reason: FinishReason) -> MathMateResult<CompletionEvent> {
        Ok(CompletionEvent {
            text: None,
            finish_reason: Some(reason),
        })
    }

    async fn run(
        config: &BotConfig,
        sink: &RecordingSink,
        events: Vec<MathMateResult<CompletionEvent>>,
    ) -> PassOutcome {
        let (tx, rx) = mpsc::unbounded_channel();
        for event in events {
            tx.send(event).unwrap();
        }
        drop(tx);
        Reconciler::new(config, sink)
            .run_pass(&ReplyId("1.0001".to_string()), rx)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn completed_pass_flushes_all_visible_text() {
        let config = config(10);
        let sink = RecordingSink::default();
        let outcome = run(
            &config,
            &sink,
            vec![
                text_event("Hello "),
                text_event("world"),
                finish_event(FinishReason::Stop),
            ],
        )
        .await;

        assert_eq!(
            outcome,
            PassOutcome::Completed {
                visible: "Hello world".to_string(),
                hidden: None,
            }
        );
        assert_eq!(sink.flushes.lock().unwrap().last().unwrap(), "Hello world");
    }

    #[tokio::test]
    async fn cadence_flushes_then_final_flush() {
        let config = config(2);
        let sink = RecordingSink::default();
        let events = vec![
            text_event("a"),
            text_event("b"),
            text_event("c"), // counter exceeds 2 here
            text_event("d"),
            finish_event(FinishReason::Stop),
        ];
        run(&config, &sink, events).await;

        let flushes = sink.flushes.lock().unwrap();
        assert_eq!(flushes.as_slice(), ["abc", "abcd"]);
    }

    #[tokio::test]
    async fn flushed_texts_grow_monotonically() {
        let config = config(1);
        let sink = RecordingSink::default();
        let events = (0..8)
            .map(|i| text_event(&format!("w{} ", i)))
            .chain(std::iter::once(finish_event(FinishReason::Stop)))
            .collect();
        run(&config, &sink, events).await;

        let flushes = sink.flushes.lock().unwrap();
        assert!(!flushes.is_empty());
        for pair in flushes.windows(2) {
            assert!(pair[1].starts_with(&pair[0]));
            assert!(pair[1].len() >= pair[0].len());
        }
    }

    #[tokio::test]
    async fn hidden_segment_is_returned_not_flushed() {
        let config = config(10);
        let sink = RecordingSink::default();
        let outcome = run(
            &config,
            &sink,
            vec![
                text_event("abc<<"),
                text_event("1+1"),
                text_event(">>"),
                text_event("def"),
                finish_event(FinishReason::Stop),
            ],
        )
        .await;

        assert_eq!(
            outcome,
            PassOutcome::Completed {
                visible: "abcdef".to_string(),
                hidden: Some("1+1".to_string()),
            }
        );
        for flush in sink.flushes.lock().unwrap().iter() {
            assert!(!flush.contains("1+1"));
            assert!(!flush.contains("<<"));
        }
    }

    #[tokio::test]
    async fn truncation_appends_the_notice_and_drops_hidden() {
        let config = config(10);
        let sink = RecordingSink::default();
        let outcome = run(
            &config,
            &sink,
            vec![
                text_event("partial answer"),
                text_event("<<"),
                text_event("1+1"),
                finish_event(FinishReason::Length),
            ],
        )
        .await;

        assert_eq!(
            outcome,
            PassOutcome::Truncated {
                visible: "partial answer".to_string(),
            }
        );
        let flushes = sink.flushes.lock().unwrap();
        let last = flushes.last().unwrap();
        assert!(last.starts_with("partial answer...\n\n"));
        assert!(last.contains("maximum number of tokens"));
    }

    #[tokio::test]
    async fn aborted_stream_flushes_what_accumulated() {
        let config = config(10);
        let sink = RecordingSink::default();
        let outcome = run(
            &config,
            &sink,
            vec![
                text_event("so far"),
                Err(crate::util::errors::MathMateError::Stream(
                    "timed out".to_string(),
                )),
            ],
        )
        .await;

        assert_eq!(
            outcome,
            PassOutcome::Completed {
                visible: "so far".to_string(),
                hidden: None,
            }
        );
        assert_eq!(sink.flushes.lock().unwrap().as_slice(), ["so far"]);
    }

    #[tokio::test]
    async fn empty_pass_never_flushes() {
        let config = config(10);
        let sink = RecordingSink::default();
        run(&config, &sink, vec![finish_event(FinishReason::Stop)]).await;
        assert!(sink.flushes.lock().unwrap().is_empty());
    }
}
