//! Slack wiring: Socket Mode event handling and the `chat.update` flush sink.
//!
//! The bot reacts to `app_mention` events. Each mention posts a placeholder
//! reply into the thread, then streams the model's answer into it by editing
//! the placeholder in place. Passes for the same thread are serialized
//! through the per-thread gate; distinct threads run concurrently.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, info};
use slack_morphism::prelude::*;

use mathmate_core::{
    FlushSink, MathMateError, MathMateResult, ReplyId, ThreadGates, ThreadReply, TutorEngine,
    WAIT_MESSAGE,
};

/// State shared with socket mode callbacks via `SlackClientEventsUserState`.
pub struct BotState {
    pub engine: Arc<TutorEngine>,
    pub gates: Arc<ThreadGates>,
    /// Shared REST client; the socket mode listener owns its own.
    pub client: Arc<SlackHyperClient>,
    pub token: SlackApiToken,
    pub bot_user_id: String,
}

impl BotState {
    fn session(&self) -> SlackClientSession<'_, SlackClientHyperHttpsConnector> {
        self.client.open_session(&self.token)
    }
}

/// Flush sink that edits the outward reply in place. `chat.update` replaces
/// the message's full text, so every flush is an idempotent set.
struct SlackFlushSink {
    client: Arc<SlackHyperClient>,
    token: SlackApiToken,
    channel: SlackChannelId,
}

#[async_trait]
impl FlushSink for SlackFlushSink {
    async fn set_outward_text(&self, reply_id: &ReplyId, text: &str) -> MathMateResult<()> {
        let session = self.client.open_session(&self.token);
        let request = SlackApiChatUpdateRequest::new(
            self.channel.clone(),
            SlackMessageContent::new().with_text(text.to_string()),
            SlackTs(reply_id.0.clone()),
        );
        session
            .chat_update(&request)
            .await
            .map_err(|e| MathMateError::Flush(e.to_string()))?;
        Ok(())
    }
}

pub async fn on_push_event(
    event: SlackPushEventCallback,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> UserCallbackResult<()> {
    match event.event {
        SlackEventCallbackBody::AppMention(mention) => handle_app_mention(mention, states).await,
        _ => Ok(()),
    }
}

pub fn error_handler(
    err: Box<dyn std::error::Error + Send + Sync>,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> HttpStatusCode {
    error!("slack socket mode error: {}", err);
    HttpStatusCode::OK
}

async fn handle_app_mention(
    mention: SlackAppMentionEvent,
    states: SlackClientEventsUserState,
) -> UserCallbackResult<()> {
    let state = {
        let state_guard = states.read().await;
        state_guard.get_user_state::<Arc<BotState>>().cloned()
    };
    let Some(state) = state else {
        error!("BotState missing from socket mode user state");
        return Ok(());
    };

    if mention.user.0 == state.bot_user_id {
        return Ok(());
    }

    let channel = mention.channel.clone();
    let thread_ts = mention
        .origin
        .thread_ts
        .clone()
        .unwrap_or_else(|| mention.origin.ts.clone());
    debug!(
        "app_mention from {} in {}:{}",
        mention.user.0, channel.0, thread_ts.0
    );

    // The pass can take the length of a whole model response; run it off the
    // event callback so mentions in other threads keep flowing.
    tokio::spawn(process_mention(state, channel, thread_ts));

    Ok(())
}

async fn process_mention(state: Arc<BotState>, channel: SlackChannelId, thread_ts: SlackTs) {
    let session = state.session();

    // The placeholder's ts names the outward reply for the rest of the pass.
    let post_request = SlackApiChatPostMessageRequest::new(
        channel.clone(),
        SlackMessageContent::new().with_text(WAIT_MESSAGE.to_string()),
    )
    .with_thread_ts(thread_ts.clone());

    let posted = match session.chat_post_message(&post_request).await {
        Ok(response) => response,
        Err(e) => {
            error!("failed to post placeholder in {}: {}", channel.0, e);
            return;
        }
    };
    let reply_id = ReplyId(posted.ts.0.clone());

    // Gate acquired before the conversation is read; the guard releases on
    // every path out of this function.
    let _gate = state.gates.acquire(&thread_ts.0).await;

    if let Err(e) = run_reply(&state, &channel, &thread_ts, &reply_id).await {
        error!("reply run failed in thread {}: {}", thread_ts.0, e);
        let error_request = SlackApiChatPostMessageRequest::new(
            channel.clone(),
            SlackMessageContent::new().with_text(format!(
                "I can't provide a response. Encountered an error:\n`\n{}\n`",
                e
            )),
        )
        .with_thread_ts(thread_ts.clone());
        if let Err(post_err) = session.chat_post_message(&error_request).await {
            error!("failed to post error reply: {}", post_err);
        }
    }
}

async fn run_reply(
    state: &BotState,
    channel: &SlackChannelId,
    thread_ts: &SlackTs,
    reply_id: &ReplyId,
) -> anyhow::Result<()> {
    let session = state.session();

    let replies_request =
        SlackApiConversationsRepliesRequest::new(channel.clone(), thread_ts.clone())
            .with_inclusive(true)
            .with_limit(200);
    let history = session.conversations_replies(&replies_request).await?;

    let replies: Vec<ThreadReply> = history
        .messages
        .iter()
        .map(|message| ThreadReply {
            user_id: message
                .sender
                .user
                .as_ref()
                .map(|user| user.0.clone())
                .unwrap_or_default(),
            text: message.content.text.clone().unwrap_or_default(),
            ts: message.origin.ts.0.clone(),
        })
        .collect();
    info!(
        "thread {} has {} replies, streaming into {}",
        thread_ts.0,
        replies.len(),
        reply_id
    );

    let sink = SlackFlushSink {
        client: state.client.clone(),
        token: state.token.clone(),
        channel: channel.clone(),
    };
    state
        .engine
        .respond(&state.bot_user_id, reply_id, &replies, &sink)
        .await?;
    Ok(())
}
