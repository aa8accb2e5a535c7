//! HTTP adapter for the room broadcast API.
//!
//! One `POST` per broadcast with everything in the query string
//! (`auth_token`, `room_id`, `from`, `message`, `color`).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error};

use relay_core::{
    errors::Error,
    messaging::{
        port::BroadcastPort,
        types::{BroadcastReceipt, BroadcastRequest},
    },
    utils::truncate_text,
    Result,
};

#[derive(Clone, Debug)]
pub struct HttpBroadcaster {
    api_url: String,
    auth_token: String,
    room_id: String,
    http: reqwest::Client,
}

impl HttpBroadcaster {
    pub fn new(
        api_url: impl Into<String>,
        auth_token: impl Into<String>,
        room_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("broadcast http client: {e}")))?;
        Ok(Self {
            api_url: api_url.into(),
            auth_token: auth_token.into(),
            room_id: room_id.into(),
            http,
        })
    }
}

#[async_trait]
impl BroadcastPort for HttpBroadcaster {
    async fn post(&self, req: &BroadcastRequest) -> Result<BroadcastReceipt> {
        let resp = self
            .http
            .post(&self.api_url)
            .query(&[
                ("auth_token", self.auth_token.as_str()),
                ("room_id", self.room_id.as_str()),
                ("from", req.from.as_str()),
                ("message", req.message.as_str()),
                ("color", req.color.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Transport(format!("broadcast request error: {e}")))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Transport(format!("broadcast response read error: {e}")))?;

        debug!(status, from = %req.from, "broadcast API responded");
        interpret_response(status, &body)
    }
}

/// Map the API's answer to a receipt.
///
/// `200` is delivery. Any other status with an `{"error": {"message": ..}}`
/// body is a rejection; anything else is unexpected.
pub fn interpret_response(status: u16, body: &str) -> Result<BroadcastReceipt> {
    if status == 200 {
        return Ok(BroadcastReceipt::Delivered);
    }

    let reason = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
    });

    match reason {
        Some(message) => Ok(BroadcastReceipt::Rejected(message)),
        None => {
            error!(status, body = %truncate_text(body, 200), "unexpected broadcast API response");
            Err(Error::Protocol(format!(
                "broadcast API answered {status} without an error message"
            )))
        }
    }
}
