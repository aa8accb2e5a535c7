use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One request to the automation backend.
///
/// Serialized as a flat JSON object: the payload fields plus a `type` tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendRequest {
    /// A room message every bot gets to react to.
    Message { name: String, message: String },
    MakeBot {
        user: String,
        name: String,
        code: String,
    },
    EditBot {
        user: String,
        name: String,
        code: String,
    },
    BotData { name: String },
    BotExists { name: String },
    KillBot { name: String },
    ListBots,
    Man {
        #[serde(skip_serializing_if = "Option::is_none")]
        func: Option<String>,
    },
    RemoveBot { name: String },
}

impl BackendRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            BackendRequest::Message { .. } => "message",
            BackendRequest::MakeBot { .. } => "makebot",
            BackendRequest::EditBot { .. } => "editbot",
            BackendRequest::BotData { .. } => "botdata",
            BackendRequest::BotExists { .. } => "botexists",
            BackendRequest::KillBot { .. } => "killbot",
            BackendRequest::ListBots => "listbots",
            BackendRequest::Man { .. } => "man",
            BackendRequest::RemoveBot { .. } => "removebot",
        }
    }
}

/// A broadcast a bot script asked for.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct BroadcastEntry {
    /// User who owns the bot; rate-limit notices go to them.
    pub botowner: String,
    pub botname: String,
    /// Display name to broadcast under.
    pub name: String,
    pub msg: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// Side effects produced by the backend for `message` and `removebot`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RelayOutput {
    #[serde(default)]
    pub broadcasts: Vec<BroadcastEntry>,
    #[serde(default)]
    pub messages: Vec<String>,
    /// Private messages keyed by user id.
    #[serde(default)]
    pub pms: BTreeMap<String, Vec<String>>,
    /// Deferred messages. Not delivered by this relay.
    #[serde(default)]
    pub timers: serde_json::Value,
    #[serde(default)]
    pub lastsaid: Option<String>,
}

impl RelayOutput {
    pub fn is_empty(&self) -> bool {
        self.broadcasts.is_empty() && self.messages.is_empty() && self.pms.is_empty()
    }

    pub fn has_timers(&self) -> bool {
        match &self.timers {
            serde_json::Value::Null => false,
            serde_json::Value::Object(m) => !m.is_empty(),
            serde_json::Value::Array(a) => !a.is_empty(),
            _ => true,
        }
    }
}

/// Stored bot record returned by `botdata`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct BotData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    pub code: String,
    #[serde(default)]
    pub lastsaid: Option<String>,
}
