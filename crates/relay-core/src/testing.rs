//! In-memory fakes for the engine's ports.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    backend::{client::BackendClient, types::BackendRequest},
    config::Config,
    domain::{PrivateMessage, UserId},
    engine::RelayEngine,
    errors::Error,
    messaging::{
        port::{BroadcastPort, ChatPort},
        types::{BroadcastReceipt, BroadcastRequest},
    },
    Result,
};

pub(crate) fn test_config() -> Config {
    Config {
        telegram_bot_token: "token".to_string(),
        room_chat_id: -100,
        room_name: "lobby".to_string(),
        chat_throttle_enabled: false,
        telegram_safe_limit: 4000,
        backend_socket: "/tmp/backend.sock".to_string(),
        backend_timeout: None,
        broadcast_api_url: "http://localhost/broadcast".to_string(),
        broadcast_auth_token: "auth".to_string(),
        broadcast_room_id: "1".to_string(),
        broadcast_timeout: Duration::from_secs(1),
        broadcast_limit: 30,
        broadcast_window: Duration::from_secs(300),
        echo_capacity: 256,
        echo_ttl: Duration::from_secs(600),
        max_cascade_depth: 3,
    }
}

pub(crate) fn private(user: &str, text: &str) -> PrivateMessage {
    PrivateMessage {
        sender: UserId::from(user),
        text: text.to_string(),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Sent {
    Room(String),
    Private(UserId, String),
}

#[derive(Default)]
pub(crate) struct RecordingChat {
    sent: Mutex<Vec<Sent>>,
    max_len: Mutex<Option<usize>>,
}

impl RecordingChat {
    /// Refuse any private message longer than `chars`, like a chat network
    /// with a message size cap.
    pub(crate) fn refuse_longer_than(&self, chars: usize) {
        *self.max_len.lock().unwrap() = Some(chars);
    }

    pub(crate) fn room(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| match s {
                Sent::Room(t) => Some(t.clone()),
                Sent::Private(..) => None,
            })
            .collect()
    }

    pub(crate) fn private_to(&self, user: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| match s {
                Sent::Private(u, t) if u.as_str() == user => Some(t.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChatPort for RecordingChat {
    async fn send_room(&self, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Room(text.to_string()));
        Ok(())
    }

    async fn send_private(&self, user: &UserId, text: &str) -> Result<()> {
        if let Some(max) = *self.max_len.lock().unwrap() {
            if text.chars().count() > max {
                return Err(Error::External("message is too long".to_string()));
            }
        }
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Private(user.clone(), text.to_string()));
        Ok(())
    }
}

pub(crate) struct FakeBroadcaster {
    requests: Mutex<Vec<BroadcastRequest>>,
    receipt: Mutex<BroadcastReceipt>,
    failure: Mutex<Option<String>>,
}

impl Default for FakeBroadcaster {
    fn default() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            receipt: Mutex::new(BroadcastReceipt::Delivered),
            failure: Mutex::new(None),
        }
    }
}

impl FakeBroadcaster {
    pub(crate) fn set_receipt(&self, receipt: BroadcastReceipt) {
        *self.receipt.lock().unwrap() = receipt;
    }

    pub(crate) fn fail_with(&self, err: Error) {
        *self.failure.lock().unwrap() = Some(err.to_string());
    }

    pub(crate) fn requests(&self) -> Vec<BroadcastRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl BroadcastPort for FakeBroadcaster {
    async fn post(&self, req: &BroadcastRequest) -> Result<BroadcastReceipt> {
        self.requests.lock().unwrap().push(req.clone());
        if let Some(msg) = self.failure.lock().unwrap().clone() {
            return Err(Error::Transport(msg));
        }
        Ok(self.receipt.lock().unwrap().clone())
    }
}

type Responder = dyn Fn(&BackendRequest) -> Result<Value> + Send + Sync;

pub(crate) struct ScriptedBackend {
    calls: Mutex<Vec<BackendRequest>>,
    respond: Box<Responder>,
}

impl ScriptedBackend {
    pub(crate) fn calls(&self) -> Vec<BackendRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackendClient for ScriptedBackend {
    async fn call(&self, req: BackendRequest) -> Result<Value> {
        self.calls.lock().unwrap().push(req.clone());
        (self.respond)(&req)
    }
}

/// An engine wired to recording fakes.
pub(crate) struct Harness {
    pub engine: RelayEngine,
    pub chat: Arc<RecordingChat>,
    pub broadcaster: Arc<FakeBroadcaster>,
    pub backend: Arc<ScriptedBackend>,
}

impl Harness {
    pub(crate) fn new<F>(respond: F) -> Self
    where
        F: Fn(&BackendRequest) -> Result<Value> + Send + Sync + 'static,
    {
        Self::with_config(test_config(), respond)
    }

    pub(crate) fn with_config<F>(cfg: Config, respond: F) -> Self
    where
        F: Fn(&BackendRequest) -> Result<Value> + Send + Sync + 'static,
    {
        let chat = Arc::new(RecordingChat::default());
        let broadcaster = Arc::new(FakeBroadcaster::default());
        let backend = Arc::new(ScriptedBackend {
            calls: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        });
        let engine = RelayEngine::new(
            Arc::new(cfg),
            chat.clone(),
            broadcaster.clone(),
            backend.clone(),
        );
        Self {
            engine,
            chat,
            broadcaster,
            backend,
        }
    }
}
