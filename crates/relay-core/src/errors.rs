/// Core error type for the relay.
///
/// Adapter crates map their specific errors into this type so the engine can
/// decide what is user-facing (validation, backend) and what is only logged
/// (transport, protocol).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    /// Missing or malformed command arguments. The message is shown to the user.
    #[error("{0}")]
    Validation(String),

    /// Broadcast cap exceeded. Only the requester hears about it.
    #[error("Your broadcast, `{from}: {message}` was not sent, because the chatroom exceeded its limit of {limit} broadcasts per {per}.")]
    RateLimited {
        from: String,
        message: String,
        limit: usize,
        per: String,
    },

    /// Structured error reported by the automation backend.
    #[error("{message}")]
    Backend {
        message: String,
        stacktrace: Option<String>,
        removed_bot: Option<String>,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    pub fn backend(message: impl Into<String>, stacktrace: Option<String>) -> Self {
        Error::Backend {
            message: message.into(),
            stacktrace,
            removed_bot: None,
        }
    }

    /// Errors that should be shown to the chat user verbatim.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::RateLimited { .. } | Error::Backend { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
