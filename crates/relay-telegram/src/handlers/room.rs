use std::sync::Arc;

use tracing::{error, warn};

use relay_core::{domain::RoomMessage, errors::Error};

use crate::router::AppState;

pub async fn handle_room(msg: RoomMessage, state: Arc<AppState>) {
    let sender = msg.sender_name.clone();
    match state.engine.handle_room_message(msg).await {
        Ok(()) => {}
        Err(e @ Error::Backend { .. }) => warn!(sender = %sender, "backend error on room message: {e}"),
        Err(e) => error!(sender = %sender, "room message failed: {e}"),
    }
}
