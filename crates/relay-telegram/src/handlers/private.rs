use std::sync::Arc;

use tracing::error;

use relay_core::domain::PrivateMessage;

use crate::router::AppState;

pub async fn handle_private(msg: PrivateMessage, state: Arc<AppState>) {
    let user = msg.sender.clone();
    if let Err(e) = state.engine.handle_private_message(msg).await {
        error!(user = %user, "private message failed: {e}");
    }
}
