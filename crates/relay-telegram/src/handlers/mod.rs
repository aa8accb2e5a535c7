//! Telegram update handlers.
//!
//! Every text message is classified by where it came from: the configured
//! room chat, a private chat with the bot, or somewhere we ignore. Handler
//! failures are logged and never stop the dispatcher.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};
use tracing::debug;

use relay_core::domain::{PrivateMessage, RoomMessage, UserId};

use crate::router::AppState;

mod private;
mod room;

/// Who sent a message, as far as routing cares.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sender {
    pub id: u64,
    pub full_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    Room(RoomMessage),
    Private(PrivateMessage),
    Ignored(&'static str),
}

/// Route one message. Room messages are keyed by display name, private
/// messages by user id.
pub fn classify(
    room_chat_id: i64,
    chat_id: i64,
    is_private: bool,
    sender: Option<Sender>,
    text: Option<&str>,
) -> Inbound {
    let Some(text) = text else {
        return Inbound::Ignored("no text");
    };
    let Some(sender) = sender else {
        return Inbound::Ignored("no sender");
    };

    if chat_id == room_chat_id {
        return Inbound::Room(RoomMessage {
            sender_name: sender.full_name,
            text: text.to_string(),
        });
    }
    if is_private {
        return Inbound::Private(PrivateMessage {
            sender: UserId(sender.id.to_string()),
            text: text.to_string(),
        });
    }
    Inbound::Ignored("foreign chat")
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let sender = msg.from().map(|u| Sender {
        id: u.id.0,
        full_name: u.full_name(),
    });
    let inbound = classify(
        state.cfg.room_chat_id,
        msg.chat.id.0,
        msg.chat.is_private(),
        sender,
        msg.text(),
    );

    match inbound {
        Inbound::Room(m) => room::handle_room(m, state).await,
        Inbound::Private(m) => private::handle_private(m, state).await,
        Inbound::Ignored(why) => {
            debug!(chat = msg.chat.id.0, why, "ignoring update");
        }
    }
    Ok(())
}
