//! Conversation state: message model, history building, equation cache,
//! and per-thread exclusion.

pub mod builder;
pub mod cache;
pub mod gate;
pub mod message;
pub mod tokens;

pub use builder::{ConversationBuilder, ThreadReply};
pub use cache::EquationCache;
pub use gate::ThreadGates;
pub use message::{ChatMessage, ChatRole, ReplyId};
pub use tokens::count_message_tokens;
