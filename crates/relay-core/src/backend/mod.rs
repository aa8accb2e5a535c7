//! Automation backend: request/response types, the line-protocol codec, and
//! the client port implemented by `relay-backend`.

pub mod client;
pub mod types;
pub mod wire;
