//! Delivery of backend output: room messages, private messages, and
//! rate-limited broadcasts, including removal of bots whose broadcasts the
//! broadcast API rejects.

use std::{collections::VecDeque, time::Duration};

use tracing::{debug, error, info, warn};

use crate::{
    backend::types::RelayOutput,
    domain::UserId,
    engine::RelayEngine,
    errors::Error,
    messaging::types::{BroadcastColor, BroadcastReceipt, BroadcastRequest},
};

/// Result of one pass through the broadcast pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// Posted; an echo is now expected in the room.
    Sent,
    /// Refused by the local rate limit; the requester was told why.
    Dropped,
    /// The broadcast API refused it, with its reason.
    Rejected(String),
    /// The request never got a verdict (network, timeout, unreadable reply).
    Failed,
}

impl RelayEngine {
    /// Rate-limit, post, and remember the echo of one broadcast.
    ///
    /// `requester` is who hears about a rate-limit drop: the user for the
    /// `broadcast` command, the bot owner for script broadcasts.
    pub async fn send_broadcast(
        &self,
        requester: &UserId,
        from: &str,
        message: &str,
        color: BroadcastColor,
    ) -> BroadcastOutcome {
        let (admitted, limit, window) = {
            let mut w = self.window.lock().await;
            (w.admit(), w.limit(), w.window())
        };
        if !admitted {
            info!(requester = %requester, from, "broadcast dropped by rate limit");
            self.reply(requester, &rate_limit_notice(from, message, limit, window))
                .await;
            return BroadcastOutcome::Dropped;
        }

        let req = BroadcastRequest {
            from: from.to_string(),
            message: message.to_string(),
            color,
        };
        match self.broadcaster.post(&req).await {
            Ok(BroadcastReceipt::Delivered) => {
                self.echoes.lock().await.record(from, message);
                debug!(from, color = %color, "broadcast sent");
                BroadcastOutcome::Sent
            }
            Ok(BroadcastReceipt::Rejected(reason)) => {
                warn!(from, reason = %reason, "broadcast rejected by API");
                BroadcastOutcome::Rejected(reason)
            }
            Err(e) => {
                error!(from, "broadcast failed: {e}");
                BroadcastOutcome::Failed
            }
        }
    }

    /// Deliver everything in `output`.
    ///
    /// Removing a bot yields output of its own; that is queued and delivered
    /// after the current output. Outputs already `max_cascade_depth` removals
    /// deep do not trigger further removals.
    pub async fn relay_output(&self, output: RelayOutput) {
        let max_depth = self.cfg.max_cascade_depth;
        let mut queue = VecDeque::from([(output, 0usize)]);

        while let Some((out, depth)) = queue.pop_front() {
            if out.has_timers() {
                debug!("backend output carries timers; not delivered");
            }

            for entry in &out.broadcasts {
                let owner = UserId(entry.botowner.clone());
                let color = BroadcastColor::from_backend(entry.color.as_deref());
                let outcome = self
                    .send_broadcast(&owner, &entry.name, &entry.msg, color)
                    .await;

                let BroadcastOutcome::Rejected(reason) = outcome else {
                    continue;
                };
                if depth >= max_depth {
                    warn!(
                        bot = %entry.botname,
                        depth,
                        "not removing bot: removal cascade too deep"
                    );
                    continue;
                }

                warn!(bot = %entry.botname, owner = %owner, reason = %reason, "removing bot after rejected broadcast");
                match self.backend.remove_bot(&entry.botname).await {
                    Ok(removal) => queue.push_back((removal, depth + 1)),
                    Err(e) => error!(bot = %entry.botname, "removebot failed: {e}"),
                }
            }

            for msg in &out.messages {
                self.say(msg).await;
            }

            for (user, msgs) in &out.pms {
                let user = UserId(user.clone());
                for msg in msgs {
                    self.reply(&user, msg).await;
                }
            }
        }
    }
}

fn rate_limit_notice(from: &str, message: &str, limit: usize, window: Duration) -> String {
    Error::RateLimited {
        from: from.to_string(),
        message: message.to_string(),
        limit,
        per: describe_window(window),
    }
    .to_string()
}

fn describe_window(window: Duration) -> String {
    let secs = window.as_secs();
    match secs {
        60 => "minute".to_string(),
        s if s > 0 && s % 60 == 0 => format!("{} minutes", s / 60),
        1 => "second".to_string(),
        s => format!("{s} seconds"),
    }
}
