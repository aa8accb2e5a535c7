use async_trait::async_trait;

use crate::{
    domain::UserId,
    messaging::types::{BroadcastReceipt, BroadcastRequest},
    Result,
};

/// Chat transport port.
///
/// The relay only ever talks to one room, so the room is implied by the adapter.
#[async_trait]
pub trait ChatPort: Send + Sync {
    async fn send_room(&self, text: &str) -> Result<()>;
    async fn send_private(&self, user: &UserId, text: &str) -> Result<()>;
}

/// Port for posting a message to the room under an arbitrary display name.
///
/// `Ok(Rejected)` carries an error reported by the API itself; transport
/// failures and unexpected responses surface as `Err`.
#[async_trait]
pub trait BroadcastPort: Send + Sync {
    async fn post(&self, req: &BroadcastRequest) -> Result<BroadcastReceipt>;
}
