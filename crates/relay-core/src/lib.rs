//! Core domain + application logic for the chat relay.
//!
//! This crate is framework-agnostic. The chat transport, the broadcast API and
//! the automation backend live behind ports (traits) implemented in adapter
//! crates.

pub mod backend;
pub mod commands;
pub mod config;
pub mod domain;
pub mod echo;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod rate_limit;
pub mod relay;
pub mod session;
pub mod tokenizer;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::RelayEngine;
pub use errors::{Error, Result};
