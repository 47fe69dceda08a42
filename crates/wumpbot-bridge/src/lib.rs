//! Async plumbing between a console game process and a chat channel
//!
//! This crate provides:
//! - Sinks: a channel plus one writer task per destination stream
//! - The game output scanner that turns prose into channel messages
//! - The chat reader that drives the handshake and forwards player commands
//! - The session that wires it all to the real streams

pub mod irc;
pub mod scanner;
pub mod session;
pub mod transport;

pub use irc::{ChatAction, ChatHandler, ChatProtocol};
pub use scanner::OutputScanner;
pub use session::{OperatorExit, Session};
pub use transport::{AsyncWriter, Sink, SinkSender, StreamWriter, writer_task};
