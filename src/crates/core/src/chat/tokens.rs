//! Prompt size accounting with the cl100k tokenizer.

use std::sync::OnceLock;

use tiktoken_rs::CoreBPE;

use crate::chat::message::ChatMessage;

// Per-message framing and reply priming for the chat format:
// <|start|>{role}\n{content}<|end|> plus <|start|>assistant<|message|>.
const TOKENS_PER_MESSAGE: usize = 3;
const REPLY_PRIMING: usize = 3;

fn bpe() -> &'static CoreBPE {
    static BPE: OnceLock<CoreBPE> = OnceLock::new();
    BPE.get_or_init(|| tiktoken_rs::cl100k_base().expect("embedded cl100k vocabulary"))
}

/// Number of prompt tokens a message list will occupy.
pub fn count_message_tokens(messages: &[ChatMessage]) -> usize {
    let bpe = bpe();
    messages
        .iter()
        .map(|message| {
            TOKENS_PER_MESSAGE
                + bpe.encode_ordinary(message.role.as_str()).len()
                + bpe.encode_ordinary(&message.content).len()
        })
        .sum::<usize>()
        + REPLY_PRIMING
}
