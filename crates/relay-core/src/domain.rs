use std::fmt;

/// Transport-level user identifier (private-message address).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

/// A message posted in the room, as seen by everyone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomMessage {
    /// Display name of the poster (for broadcasts, the spoofed name).
    pub sender_name: String,
    pub text: String,
}

/// A private message sent directly to the relay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrivateMessage {
    pub sender: UserId,
    pub text: String,
}
