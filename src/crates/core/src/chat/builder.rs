//! Conversation builder.
//!
//! Turns a Slack thread's replies into the ordered message list sent to the
//! completion API, splicing previously cached equations back into the
//! assistant turns that produced them.

use crate::chat::cache::EquationCache;
use crate::chat::message::{ChatMessage, ChatRole, ReplyId};
use crate::config::DelimiterPair;

/// One reply of a Slack thread, as fetched from `conversations.replies`.
#[derive(Debug, Clone)]
pub struct ThreadReply {
    pub user_id: String,
    pub text: String,
    pub ts: String,
}

pub struct ConversationBuilder {
    bot_user_id: String,
    system_prompt: &'static str,
}

impl ConversationBuilder {
    pub fn new(bot_user_id: impl Into<String>, system_prompt: &'static str) -> Self {
        Self {
            bot_user_id: bot_user_id.into(),
            system_prompt,
        }
    }

    /// Build the dialogue for a request. The final reply is excluded: it is
    /// the placeholder the bot just posted for the answer being generated.
    ///
    /// User replies that never mention the bot are dropped — they were not
    /// addressed to it. Assistant turns whose reply id has a cached equation
    /// get the equation appended inside the hidden delimiters.
    pub fn build(
        &self,
        replies: &[ThreadReply],
        cache: &EquationCache,
        delimiters: DelimiterPair,
    ) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(self.system_prompt)];

        let history = &replies[..replies.len().saturating_sub(1)];
        for reply in history {
            let is_assistant = reply.user_id == self.bot_user_id;
            let Some(text) = self.clean_text(&reply.text, is_assistant) else {
                continue;
            };

            if is_assistant {
                let reply_id = ReplyId(reply.ts.clone());
                let mut content = text;
                if let Some(equation) = cache.get(&reply_id) {
                    content.push_str(&format!(
                        " {}{}{}",
                        delimiters.open, equation, delimiters.close
                    ));
                }
                messages.push(ChatMessage::assistant(content, Some(reply_id)));
            } else {
                messages.push(ChatMessage::user(text));
            }
        }

        messages
    }

    /// Strip the bot mention tag. A user message without the tag was not
    /// addressed to the bot and yields `None`.
    fn clean_text(&self, text: &str, is_assistant: bool) -> Option<String> {
        let tag = format!("<@{}>", self.bot_user_id);
        if is_assistant || text.contains(&tag) {
            let cleaned = text.replace(&tag, "").trim().to_string();
            (!cleaned.is_empty()).then_some(cleaned)
        } else {
            None
        }
    }
}
