use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    backend::{
        types::{BackendRequest, BotData, RelayOutput},
        wire::value_to_text,
    },
    errors::Error,
    Result,
};

/// Transport to the automation backend.
///
/// One call is one request/response exchange. Returns the response's `data`
/// value, or `Error::Backend` when the backend reported an error.
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn call(&self, req: BackendRequest) -> Result<Value>;
}

/// Typed helpers over a [`BackendClient`].
#[derive(Clone)]
pub struct Backend {
    client: Arc<dyn BackendClient>,
}

impl Backend {
    pub fn new(client: Arc<dyn BackendClient>) -> Self {
        Self { client }
    }

    /// Let every bot react to a room message.
    pub async fn message(&self, name: &str, message: &str) -> Result<RelayOutput> {
        self.typed(BackendRequest::Message {
            name: name.to_string(),
            message: message.to_string(),
        })
        .await
    }

    /// Remove a misbehaving bot; the output tells its owner what happened.
    pub async fn remove_bot(&self, name: &str) -> Result<RelayOutput> {
        self.typed(BackendRequest::RemoveBot {
            name: name.to_string(),
        })
        .await
    }

    pub async fn bot_exists(&self, name: &str) -> Result<bool> {
        self.typed(BackendRequest::BotExists {
            name: name.to_string(),
        })
        .await
    }

    pub async fn bot_data(&self, name: &str) -> Result<BotData> {
        self.typed(BackendRequest::BotData {
            name: name.to_string(),
        })
        .await
    }

    pub async fn make_bot(&self, user: &str, name: &str, code: &str) -> Result<String> {
        self.text(BackendRequest::MakeBot {
            user: user.to_string(),
            name: name.to_string(),
            code: code.to_string(),
        })
        .await
    }

    pub async fn edit_bot(&self, user: &str, name: &str, code: &str) -> Result<String> {
        self.text(BackendRequest::EditBot {
            user: user.to_string(),
            name: name.to_string(),
            code: code.to_string(),
        })
        .await
    }

    pub async fn kill_bot(&self, name: &str) -> Result<String> {
        self.text(BackendRequest::KillBot {
            name: name.to_string(),
        })
        .await
    }

    pub async fn list_bots(&self) -> Result<String> {
        self.text(BackendRequest::ListBots).await
    }

    pub async fn man(&self, func: Option<&str>) -> Result<String> {
        self.text(BackendRequest::Man {
            func: func.map(|f| f.to_string()),
        })
        .await
    }

    async fn text(&self, req: BackendRequest) -> Result<String> {
        let data = self.client.call(req).await?;
        Ok(value_to_text(&data))
    }

    async fn typed<T: DeserializeOwned>(&self, req: BackendRequest) -> Result<T> {
        let kind = req.kind();
        let data = self.client.call(req).await?;
        serde_json::from_value(data)
            .map_err(|e| Error::Protocol(format!("unexpected `{kind}` response shape: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct CannedBackend {
        reply: Value,
        seen: Mutex<Vec<BackendRequest>>,
    }

    #[async_trait]
    impl BackendClient for CannedBackend {
        async fn call(&self, req: BackendRequest) -> Result<Value> {
            self.seen.lock().unwrap().push(req);
            Ok(self.reply.clone())
        }
    }

    fn backend(reply: Value) -> (Backend, Arc<CannedBackend>) {
        let canned = Arc::new(CannedBackend {
            reply,
            seen: Mutex::new(Vec::new()),
        });
        (Backend::new(canned.clone()), canned)
    }

    #[tokio::test]
    async fn bot_exists_decodes_boolean() {
        let (b, canned) = backend(json!(true));
        assert!(b.bot_exists("foo").await.unwrap());
        assert_eq!(
            canned.seen.lock().unwrap()[0],
            BackendRequest::BotExists {
                name: "foo".to_string()
            }
        );
    }

    #[tokio::test]
    async fn bot_data_requires_code() {
        let (b, _) = backend(json!({"name": "foo", "user": "u", "code": "x = 1", "lastsaid": ""}));
        assert_eq!(b.bot_data("foo").await.unwrap().code, "x = 1");

        let (b, _) = backend(json!({"name": "foo"}));
        assert!(matches!(b.bot_data("foo").await, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn text_results_render_non_strings() {
        let (b, _) = backend(json!("Bot `foo` has been killed"));
        assert_eq!(b.kill_bot("foo").await.unwrap(), "Bot `foo` has been killed");

        let (b, _) = backend(json!(["a", "b"]));
        assert_eq!(b.list_bots().await.unwrap(), r#"["a","b"]"#);
    }

    #[tokio::test]
    async fn message_decodes_relay_output() {
        let (b, _) = backend(json!({"broadcasts": [], "messages": ["hi"], "pms": {"u1": ["psst"]}}));
        let out = b.message("Bob", "hello").await.unwrap();
        assert_eq!(out.messages, vec!["hi"]);
        assert_eq!(out.pms["u1"], vec!["psst"]);
    }
}
