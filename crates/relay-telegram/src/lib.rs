//! Telegram adapter (teloxide).
//!
//! The configured group chat is the relay's room; private chats with the bot
//! carry commands and script submissions.

use async_trait::async_trait;

use teloxide::prelude::*;

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use relay_core::{
    domain::UserId, errors::Error, messaging::port::ChatPort, utils::split_message, Result,
};

/// Telegram rejects messages over 4096 characters.
const TELEGRAM_MAX_MESSAGE_CHARS: usize = 4096;

#[derive(Clone)]
pub struct TelegramChat {
    bot: Bot,
    room: teloxide::types::ChatId,
    safe_limit: usize,
}

impl TelegramChat {
    pub fn new(bot: Bot, room_chat_id: i64, safe_limit: usize) -> Self {
        Self {
            bot,
            room: teloxide::types::ChatId(room_chat_id),
            safe_limit: safe_limit.clamp(200, TELEGRAM_MAX_MESSAGE_CHARS),
        }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn private_chat(user: &UserId) -> Result<teloxide::types::ChatId> {
        user.as_str()
            .parse::<i64>()
            .map(teloxide::types::ChatId)
            .map_err(|_| Error::Validation(format!("not a telegram user id: {user}")))
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }

    async fn send_text(&self, chat: teloxide::types::ChatId, text: &str) -> Result<()> {
        // Telegram refuses empty messages.
        if text.is_empty() {
            return Ok(());
        }
        for chunk in split_message(text, self.safe_limit) {
            self.with_retry(|| self.bot.send_message(chat, chunk.clone()))
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ChatPort for TelegramChat {
    async fn send_room(&self, text: &str) -> Result<()> {
        self.send_text(self.room, text).await
    }

    async fn send_private(&self, user: &UserId, text: &str) -> Result<()> {
        let chat = Self::private_chat(user)?;
        self.send_text(chat, text).await
    }
}
