use std::sync::Arc;

use relay_backend::SocketBackend;
use relay_broadcast::HttpBroadcaster;
use relay_core::{
    config::Config,
    messaging::{
        port::ChatPort,
        throttled::{ThrottleConfig, ThrottledChat},
    },
    RelayEngine,
};
use relay_telegram::TelegramChat;
use teloxide::Bot;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), relay_core::Error> {
    relay_core::logging::init("chat-relay")?;

    let cfg = Arc::new(Config::load()?);

    let backend = SocketBackend::from_config(&cfg.backend_socket)?.with_timeout(cfg.backend_timeout);
    info!(backend = %backend.addr(), "using automation backend");

    let broadcaster = HttpBroadcaster::new(
        cfg.broadcast_api_url.clone(),
        cfg.broadcast_auth_token.clone(),
        cfg.broadcast_room_id.clone(),
        cfg.broadcast_timeout,
    )?;

    let bot = Bot::new(cfg.telegram_bot_token.clone());

    // Backend output can fan out into many sends at once; keep a 429 RetryAfter
    // retry at the Telegram adapter layer as well.
    let raw_chat: Arc<dyn ChatPort> = Arc::new(TelegramChat::new(
        bot.clone(),
        cfg.room_chat_id,
        cfg.telegram_safe_limit,
    ));
    let chat: Arc<dyn ChatPort> = if cfg.chat_throttle_enabled {
        Arc::new(ThrottledChat::new(raw_chat, ThrottleConfig::default()))
    } else {
        raw_chat
    };

    let engine = Arc::new(RelayEngine::new(
        cfg.clone(),
        chat,
        Arc::new(broadcaster),
        Arc::new(backend),
    ));

    relay_telegram::router::run_polling(bot, cfg, engine)
        .await
        .map_err(|e| relay_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
