use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tracing::{info, warn};

use relay_core::{config::Config, RelayEngine};

use crate::handlers;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub engine: Arc<RelayEngine>,
}

/// Long-poll Telegram and feed text messages to the engine until shutdown.
///
/// Updates from the same chat are handled one at a time; different chats
/// run concurrently.
pub async fn run_polling(
    bot: Bot,
    cfg: Arc<Config>,
    engine: Arc<RelayEngine>,
) -> anyhow::Result<()> {
    match bot.get_me().await {
        Ok(me) => info!(
            bot = %me.username(),
            room = %cfg.room_name,
            room_chat_id = cfg.room_chat_id,
            "chat relay started"
        ),
        Err(e) => warn!("could not fetch bot identity: {e}"),
    }

    let state = Arc::new(AppState { cfg, engine });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    info!("chat relay stopped");
    Ok(())
}
