//! Reply runs: single-pass tutoring and the two-phase offload protocol.
//!
//! The offload protocol is an explicit state machine. Discover asks the
//! model what must be calculated; the evaluated results then ride into an
//! Answer pass as hidden context. Re-requests are counted and capped so a
//! model that keeps asking for more arithmetic cannot loop forever.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::ai::client::CompletionClient;
use crate::chat::builder::{ConversationBuilder, ThreadReply};
use crate::chat::cache::EquationCache;
use crate::chat::message::{ChatMessage, ReplyId};
use crate::chat::tokens::count_message_tokens;
use crate::config::{BotConfig, EngineMode};
use crate::engine::reconciler::{FlushSink, PassOutcome, Reconciler};
use crate::prompts::PromptTemplate;
use crate::util::errors::MathMateResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Discover,
    Answer,
    Failed,
}

pub struct TutorEngine {
    config: BotConfig,
    client: CompletionClient,
    cache: Arc<EquationCache>,
}

impl TutorEngine {
    pub fn new(config: BotConfig) -> MathMateResult<Self> {
        let client = CompletionClient::new(&config)?;
        let cache = Arc::new(EquationCache::new(config.cache_capacity));
        Ok(Self {
            config,
            client,
            cache,
        })
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<EquationCache> {
        &self.cache
    }

    /// Generate one reply into `reply_id`. The caller must already hold the
    /// thread's gate.
    pub async fn respond(
        &self,
        bot_user_id: &str,
        reply_id: &ReplyId,
        replies: &[ThreadReply],
        sink: &dyn FlushSink,
    ) -> MathMateResult<()> {
        match self.config.mode {
            EngineMode::SinglePass => self.run_single(bot_user_id, reply_id, replies, sink).await,
            EngineMode::TwoPhase => {
                self.run_two_phase(bot_user_id, reply_id, replies, sink).await
            }
        }
    }

    async fn run_single(
        &self,
        bot_user_id: &str,
        reply_id: &ReplyId,
        replies: &[ThreadReply],
        sink: &dyn FlushSink,
    ) -> MathMateResult<()> {
        let messages = self.build_messages(bot_user_id, self.config.template, replies);
        let events = self.client.stream_chat(&messages).await?;
        let outcome = Reconciler::new(&self.config, sink)
            .run_pass(reply_id, events)
            .await?;

        if let PassOutcome::Completed {
            hidden: Some(hidden),
            ..
        } = outcome
        {
            let equation = mathmate_calc::process_equation(&hidden);
            debug!("processed equation for reply {}: {}", reply_id, equation);
            self.cache.put(reply_id.clone(), equation);
        }
        Ok(())
    }

    async fn run_two_phase(
        &self,
        bot_user_id: &str,
        reply_id: &ReplyId,
        replies: &[ThreadReply],
        sink: &dyn FlushSink,
    ) -> MathMateResult<()> {
        let mut phase = Phase::Discover;
        let mut transitions = 0u32;
        let mut equations: Option<String> = None;

        loop {
            match phase {
                Phase::Discover | Phase::Answer => {
                    let template = if phase == Phase::Discover {
                        PromptTemplate::Discover
                    } else {
                        PromptTemplate::Answer
                    };
                    let mut messages = self.build_messages(bot_user_id, template, replies);
                    if phase == Phase::Answer {
                        if let Some(equations) = equations.as_deref() {
                            messages.push(ChatMessage::assistant(
                                format!(
                                    "{}{}{}",
                                    self.config.delimiters.open,
                                    equations,
                                    self.config.delimiters.close
                                ),
                                None,
                            ));
                        }
                    }

                    let events = self.client.stream_chat(&messages).await?;
                    let outcome = Reconciler::new(&self.config, sink)
                        .run_pass(reply_id, events)
                        .await?;

                    match outcome {
                        PassOutcome::Completed {
                            hidden: Some(hidden),
                            ..
                        } => {
                            // Calculate: evaluate what the model asked for,
                            // then answer with the results in context.
                            transitions += 1;
                            if transitions > self.config.max_phase_transitions {
                                phase = Phase::Failed;
                                continue;
                            }
                            let lines = mathmate_calc::evaluate_list(&hidden);
                            if lines.is_empty() {
                                debug!(
                                    "no evaluable expressions in segment for reply {}",
                                    reply_id
                                );
                                equations = None;
                            } else {
                                let joined = lines.join("\n");
                                self.cache.put(reply_id.clone(), joined.clone());
                                equations = Some(joined);
                            }
                            phase = Phase::Answer;
                        }
                        PassOutcome::Completed { hidden: None, .. } => return Ok(()),
                        PassOutcome::Truncated { .. } => return Ok(()),
                    }
                }
                Phase::Failed => {
                    warn!(
                        "phase transitions exhausted for reply {} after {} re-requests",
                        reply_id, self.config.max_phase_transitions
                    );
                    sink.set_outward_text(reply_id, &self.config.exhausted_notice())
                        .await?;
                    return Ok(());
                }
            }
        }
    }

    fn build_messages(
        &self,
        bot_user_id: &str,
        template: PromptTemplate,
        replies: &[ThreadReply],
    ) -> Vec<ChatMessage> {
        let builder = ConversationBuilder::new(bot_user_id, template.text());
        let messages = builder.build(replies, &self.cache, self.config.delimiters);
        let tokens = count_message_tokens(&messages);
        info!(
            "conversation built: template={} messages={} tokens={}",
            template.id(),
            messages.len(),
            tokens
        );
        if tokens as u32 > self.config.max_tokens {
            warn!(
                "prompt already exceeds the token budget: {} > {}",
                tokens, self.config.max_tokens
            );
        }
        messages
    }
}
