mod logging;
mod slack;

use std::env;
use std::sync::Arc;

use anyhow::Context;
use log::{info, warn};
use slack_morphism::prelude::*;

use mathmate_core::{BotConfig, DelimiterPair, EngineMode, ThreadGates, TutorEngine};

use crate::slack::BotState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init()?;

    info!("MathMate {} starting", mathmate_core::VERSION);

    let slack_bot_token = env::var("SLACK_BOT_TOKEN").context("SLACK_BOT_TOKEN is not set")?;
    let slack_app_token = env::var("SLACK_APP_TOKEN").context("SLACK_APP_TOKEN is not set")?;
    let openai_api_key = env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;

    let config = build_config(openai_api_key);
    let engine = Arc::new(TutorEngine::new(config)?);
    let gates = Arc::new(ThreadGates::new());

    // Shared REST client; the socket mode listener below owns its own
    // because it keeps a persistent WebSocket connection.
    let rest_client = Arc::new(SlackClient::new(
        SlackClientHyperConnector::new().context("failed to create slack HTTP connector")?,
    ));
    let token = SlackApiToken::new(SlackApiTokenValue(slack_bot_token));

    let auth = rest_client
        .open_session(&token)
        .auth_test()
        .await
        .context("failed to call auth.test for bot user ID")?;
    let bot_user_id = auth.user_id.0.clone();
    info!("slack bot user ID resolved: {}", bot_user_id);

    let state = Arc::new(BotState {
        engine,
        gates,
        client: rest_client,
        token,
        bot_user_id,
    });

    let callbacks = SlackSocketModeListenerCallbacks::new().with_push_events(slack::on_push_event);

    let listener_client = Arc::new(SlackClient::new(
        SlackClientHyperConnector::new().context("failed to create slack socket mode connector")?,
    ));
    let listener_environment = Arc::new(
        SlackClientEventsListenerEnvironment::new(listener_client)
            .with_error_handler(slack::error_handler)
            .with_user_state(state),
    );
    let listener = SlackClientSocketModeListener::new(
        &SlackClientSocketModeConfig::new(),
        listener_environment,
        callbacks,
    );

    let app_token = SlackApiToken::new(SlackApiTokenValue(slack_app_token));
    listener
        .listen_for(&app_token)
        .await
        .context("failed to start slack socket mode listener")?;
    info!("slack socket mode connected");

    listener.serve().await;
    Ok(())
}

fn build_config(openai_api_key: String) -> BotConfig {
    let mut config = BotConfig::new(openai_api_key);
    if let Ok(base) = env::var("OPENAI_API_BASE") {
        config.api_base = base;
    }
    if let Ok(model) = env::var("MATHMATE_MODEL") {
        config.model = model;
    }
    match env::var("MATHMATE_MODE").as_deref() {
        // The offload variant discovers expression lists first, so hidden
        // segments switch to the bracket delimiters.
        Ok("offload") => {
            config.mode = EngineMode::TwoPhase;
            config.delimiters = DelimiterPair::SQUARE;
        }
        Ok("tutor") | Err(_) => {}
        Ok(other) => {
            warn!("unknown MATHMATE_MODE '{}', using tutor", other);
        }
    }
    config
}
