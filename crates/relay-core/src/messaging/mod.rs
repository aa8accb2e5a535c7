//! Outbound chat and broadcast abstractions (Telegram + HTTP broadcast today).

pub mod port;
pub mod throttled;
pub mod types;
