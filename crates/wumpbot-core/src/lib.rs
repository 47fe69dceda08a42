//! # wumpbot-core
//!
//! Core types for the wumpbot chat-to-game bridge.
//!
//! Everything in this crate is synchronous and free of I/O:
//! - Session configuration
//! - Chat protocol commands and line parsing
//! - Handshake and prompt state machines
//! - Game commands and the chat command sanitizer

pub mod chat;
pub mod command;
pub mod config;
pub mod error;
pub mod handshake;
pub mod prompt;

pub use chat::{ChatCommand, addressed_text, ping_payload};
pub use command::{GameCommand, sanitize};
pub use config::SessionConfig;
pub use error::{BridgeError, Result};
pub use handshake::{Handshake, HandshakeStep};
pub use prompt::{PromptReply, PromptState, Transition};
