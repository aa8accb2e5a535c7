use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, Result};

pub const DEFAULT_BROADCAST_API_URL: &str = "https://api.hipchat.com/v1/rooms/message";

/// Typed configuration for the relay.
#[derive(Clone, Debug)]
pub struct Config {
    // Chat transport
    pub telegram_bot_token: String,
    pub room_chat_id: i64,
    pub room_name: String,
    pub chat_throttle_enabled: bool,
    /// Longest text sent as one chat message; longer text is split.
    pub telegram_safe_limit: usize,

    // Automation backend
    pub backend_socket: String,
    /// `None` waits for the backend indefinitely.
    pub backend_timeout: Option<Duration>,

    // Broadcast API
    pub broadcast_api_url: String,
    pub broadcast_auth_token: String,
    pub broadcast_room_id: String,
    pub broadcast_timeout: Duration,

    // Broadcast rate limiting
    pub broadcast_limit: usize,
    pub broadcast_window: Duration,

    // Echo suppression
    pub echo_capacity: usize,
    pub echo_ttl: Duration,

    // Output relay
    pub max_cascade_depth: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let room_chat_id = required("RELAY_ROOM_CHAT_ID")?
            .trim()
            .parse::<i64>()
            .map_err(|e| Error::Config(format!("RELAY_ROOM_CHAT_ID must be numeric: {e}")))?;
        let room_name = env_str("RELAY_ROOM_NAME")
            .and_then(non_empty)
            .unwrap_or_else(|| "room".to_string());
        let chat_throttle_enabled = env_bool("CHAT_THROTTLE_ENABLED").unwrap_or(true);
        let telegram_safe_limit = env_usize("TELEGRAM_SAFE_LIMIT").unwrap_or(4000);

        let backend_socket = required("BACKEND_SOCKET")?;
        let backend_timeout = match env_u64("BACKEND_TIMEOUT_MS").unwrap_or(30_000) {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        let broadcast_api_url = env_str("BROADCAST_API_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_BROADCAST_API_URL.to_string());
        let broadcast_auth_token = required("BROADCAST_AUTH_TOKEN")?;
        let broadcast_room_id = required("BROADCAST_ROOM_ID")?;
        let broadcast_timeout =
            Duration::from_millis(env_u64("BROADCAST_TIMEOUT_MS").unwrap_or(10_000));

        let broadcast_limit = env_usize("BROADCAST_LIMIT").unwrap_or(30);
        let broadcast_window =
            Duration::from_millis(env_u64("BROADCAST_WINDOW_MS").unwrap_or(300_000));

        let echo_capacity = env_usize("ECHO_CAPACITY").unwrap_or(256).max(1);
        let echo_ttl = Duration::from_millis(env_u64("ECHO_TTL_MS").unwrap_or(600_000));

        let max_cascade_depth = env_usize("RELAY_MAX_CASCADE").unwrap_or(3);

        Ok(Self {
            telegram_bot_token,
            room_chat_id,
            room_name,
            chat_throttle_enabled,
            telegram_safe_limit,
            backend_socket,
            backend_timeout,
            broadcast_api_url,
            broadcast_auth_token,
            broadcast_room_id,
            broadcast_timeout,
            broadcast_limit,
            broadcast_window,
            echo_capacity,
            echo_ttl,
            max_cascade_depth,
        })
    }
}

fn required(key: &str) -> Result<String> {
    env_str(key)
        .and_then(non_empty)
        .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| parse_bool(&s))
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
