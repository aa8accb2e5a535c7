use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    backend::client::{Backend, BackendClient},
    commands,
    config::Config,
    domain::{PrivateMessage, RoomMessage, UserId},
    echo::EchoSuppressor,
    errors::Error,
    messaging::port::{BroadcastPort, ChatPort},
    rate_limit::BroadcastWindow,
    session::{Session, SessionState, SessionStore, UserLocks},
    utils::truncate_text,
    Result,
};

const RETRY_HINT: &str = "Try entering your script again below, or type `abort`";

/// The single owner of all relay state.
///
/// Transport adapters feed inbound room and private messages in; everything
/// the relay says goes out through the chat and broadcast ports.
pub struct RelayEngine {
    pub(crate) cfg: Arc<Config>,
    pub(crate) chat: Arc<dyn ChatPort>,
    pub(crate) broadcaster: Arc<dyn BroadcastPort>,
    pub(crate) backend: Backend,
    pub(crate) sessions: SessionStore,
    pub(crate) window: Mutex<BroadcastWindow>,
    pub(crate) echoes: Mutex<EchoSuppressor>,
    user_locks: UserLocks,
}

impl RelayEngine {
    pub fn new(
        cfg: Arc<Config>,
        chat: Arc<dyn ChatPort>,
        broadcaster: Arc<dyn BroadcastPort>,
        backend: Arc<dyn BackendClient>,
    ) -> Self {
        let window = BroadcastWindow::new(cfg.broadcast_limit, cfg.broadcast_window);
        let echoes = EchoSuppressor::new(cfg.echo_capacity, cfg.echo_ttl);
        Self {
            cfg,
            chat,
            broadcaster,
            backend: Backend::new(backend),
            sessions: SessionStore::new(),
            window: Mutex::new(window),
            echoes: Mutex::new(echoes),
            user_locks: UserLocks::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub async fn session_state(&self, user: &UserId) -> SessionState {
        self.sessions.state(user).await
    }

    /// A message appeared in the room: unless it is our own echo, let every
    /// bot react to it.
    pub async fn handle_room_message(&self, msg: RoomMessage) -> Result<()> {
        if self
            .echoes
            .lock()
            .await
            .try_consume(&msg.sender_name, &msg.text)
        {
            debug!(sender = %msg.sender_name, "dropping echo of our own broadcast");
            return Ok(());
        }

        debug!(
            sender = %msg.sender_name,
            text = %truncate_text(&msg.text, 80),
            "room message"
        );
        let output = self.backend.message(&msg.sender_name, &msg.text).await?;
        self.relay_output(output).await;
        Ok(())
    }

    /// A user wrote to the relay privately: either the next step of their
    /// session, or a command.
    pub async fn handle_private_message(&self, msg: PrivateMessage) -> Result<()> {
        let _guard = self.user_locks.lock_user(&msg.sender).await;

        if let Some(session) = self.sessions.get(&msg.sender).await {
            return self
                .continue_session(&msg.sender, session, &msg.text)
                .await;
        }

        commands::dispatch(self, &msg.sender, &msg.text).await
    }

    async fn continue_session(&self, user: &UserId, session: Session, text: &str) -> Result<()> {
        if text == "abort" {
            self.sessions.end(user).await;
            info!(user = %user, bot = %session.bot_name, "session aborted");
            self.reply(user, "Aborted.").await;
            return Ok(());
        }

        let result = match session.state {
            SessionState::AwaitingNewScript => {
                self.backend
                    .make_bot(user.as_str(), &session.bot_name, text)
                    .await
            }
            SessionState::AwaitingEditedScript => {
                self.backend
                    .edit_bot(user.as_str(), &session.bot_name, text)
                    .await
            }
            SessionState::Idle => {
                self.sessions.end(user).await;
                return commands::dispatch(self, user, text).await;
            }
        };

        match result {
            Ok(reply) => {
                self.sessions.end(user).await;
                info!(user = %user, bot = %session.bot_name, state = ?session.state, "script accepted");
                self.reply(user, &reply).await;
            }
            Err(Error::Backend {
                message,
                stacktrace,
                ..
            }) => {
                let mut out = format!("ERROR: {message}\n");
                if let Some(trace) = stacktrace.filter(|t| !t.trim().is_empty()) {
                    out.push_str(&trace);
                    if !trace.ends_with('\n') {
                        out.push('\n');
                    }
                }
                out.push_str(RETRY_HINT);
                self.reply(user, &out).await;
            }
            Err(e) => {
                warn!(user = %user, bot = %session.bot_name, "script submission failed: {e}");
                let out = format!("{}\n{RETRY_HINT}", user_error_text(&e));
                self.reply(user, &out).await;
            }
        }
        Ok(())
    }

    /// Send a private message, logging (not propagating) delivery failures.
    pub(crate) async fn reply(&self, user: &UserId, text: &str) {
        if let Err(e) = self.chat.send_private(user, text).await {
            warn!(user = %user, "failed to send private message: {e}");
        }
    }

    pub(crate) async fn say(&self, text: &str) {
        if let Err(e) = self.chat.send_room(text).await {
            warn!(room = %self.cfg.room_name, "failed to send room message: {e}");
        }
    }

    pub(crate) async fn reply_error(&self, user: &UserId, err: &Error) {
        if !err.is_user_facing() {
            error!(user = %user, "command failed: {err}");
        }
        self.reply(user, &user_error_text(err)).await;
    }
}

/// The `ERROR: ...` line shown to a user for a failed request.
pub(crate) fn user_error_text(err: &Error) -> String {
    match err {
        Error::RateLimited { .. } => err.to_string(),
        Error::Validation(_) | Error::Backend { .. } => format!("ERROR: {err}"),
        Error::Transport(_) | Error::Io(_) => {
            "ERROR: the bot backend is unavailable right now".to_string()
        }
        Error::Protocol(_) | Error::Json(_) => {
            "ERROR: the bot backend sent an unexpected response".to_string()
        }
        Error::Config(_) | Error::External(_) => "ERROR: internal error".to_string(),
    }
}
