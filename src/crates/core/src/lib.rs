// MathMate Core Library - platform-agnostic bot logic
// Layers: Util -> Chat/AI -> Engine

pub mod ai; // Completion API client and SSE stream decoding
pub mod chat; // Conversation model, cache, gates, token accounting
pub mod config;
pub mod engine; // Extraction, reconciliation, phased reply protocol
pub mod prompts;
pub mod util; // Error types

// Export main types
pub use util::errors::{MathMateError, MathMateResult};

pub use config::{BotConfig, DelimiterPair, EngineMode, WAIT_MESSAGE};
pub use prompts::PromptTemplate;

pub use chat::{
    count_message_tokens, ChatMessage, ChatRole, ConversationBuilder, EquationCache, ReplyId,
    ThreadGates, ThreadReply,
};

pub use ai::{CompletionClient, CompletionEvent, FinishReason};

pub use engine::{FlushSink, PassOutcome, Reconciler, SegmentExtractor, TutorEngine};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
