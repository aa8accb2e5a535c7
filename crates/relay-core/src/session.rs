use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::UserId;

/// Where a user is in the multi-turn script submission flow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    /// `makebot` accepted a name; the next message is the new bot's script.
    AwaitingNewScript,
    /// `editbot` showed the current script; the next message replaces it.
    AwaitingEditedScript,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub state: SessionState,
    pub bot_name: String,
}

/// One session record per user. A missing record means `Idle`.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<UserId, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user: &UserId) -> Option<Session> {
        self.sessions.lock().await.get(user).cloned()
    }

    pub async fn state(&self, user: &UserId) -> SessionState {
        self.get(user)
            .await
            .map(|s| s.state)
            .unwrap_or(SessionState::Idle)
    }

    /// Start (or replace) the user's session. Beginning an `Idle` session is
    /// the same as ending it.
    pub async fn begin(&self, user: &UserId, state: SessionState, bot_name: &str) {
        let mut sessions = self.sessions.lock().await;
        if state == SessionState::Idle {
            sessions.remove(user);
            return;
        }
        sessions.insert(
            user.clone(),
            Session {
                state,
                bot_name: bot_name.to_string(),
            },
        );
    }

    pub async fn end(&self, user: &UserId) -> Option<Session> {
        self.sessions.lock().await.remove(user)
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

/// Per-user async locks so one user's messages are handled strictly in order.
///
/// Locks nobody holds or waits on are dropped the next time any user locks.
#[derive(Default)]
pub struct UserLocks {
    inner: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub async fn lock_user(&self, user: &UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(user.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.inner.lock().await.len()
    }
}
