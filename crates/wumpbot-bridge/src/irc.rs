//! Chat connection reader
//!
//! [`ChatProtocol`] decides what each received line means; [`ChatHandler`]
//! owns the read loop and carries the decisions out on the sinks.

use crate::scanner::OutputScanner;
use crate::transport::SinkSender;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wumpbot_core::{
    ChatCommand, GameCommand, Handshake, HandshakeStep, Result, SessionConfig, addressed_text,
    ping_payload, sanitize,
};

/// What to do in response to one received line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatAction {
    /// Queue a line on the chat sink
    Chat(String),
    /// Queue a line on the game sink
    Game(String),
    /// Start relaying game output
    StartRelay,
}

/// Per-line protocol logic: keepalive, handshake, addressed commands
#[derive(Debug)]
pub struct ChatProtocol {
    config: Arc<SessionConfig>,
    handshake: Handshake,
}

impl ChatProtocol {
    pub fn new(config: Arc<SessionConfig>) -> Self {
        Self {
            config,
            handshake: Handshake::default(),
        }
    }

    pub fn handshake(&self) -> Handshake {
        self.handshake
    }

    /// Interpret one received line (terminator included or not)
    pub fn handle_line(&mut self, line: &str) -> Vec<ChatAction> {
        // Keepalive wins over everything and does not count as handshake input
        if let Some(payload) = ping_payload(line) {
            debug!("Keepalive challenge: {}", payload);
            let pong = ChatCommand::Pong {
                payload: payload.to_string(),
            };
            return vec![ChatAction::Chat(pong.encode())];
        }

        let mut actions = Vec::new();

        let (next, step) = self.handshake.advance();
        self.handshake = next;
        if let Some(step) = step {
            actions.push(self.handshake_action(step));
        }

        if let Some(text) = addressed_text(line, &self.config.channel, &self.config.nick) {
            let command = sanitize(text);
            if command == GameCommand::Unrecognized {
                debug!("Rejected chat command: {:?}", text.trim_end());
            }
            actions.push(ChatAction::Game(command.encode()));
            return actions;
        }

        info!("{}", line.trim_end());
        actions
    }

    fn handshake_action(&self, step: HandshakeStep) -> ChatAction {
        let config = &self.config;
        match step {
            HandshakeStep::SendNick => ChatAction::Chat(
                ChatCommand::Nick {
                    nick: config.nick.clone(),
                }
                .encode(),
            ),
            HandshakeStep::SendUser => ChatAction::Chat(
                ChatCommand::User {
                    nick: config.nick.clone(),
                }
                .encode(),
            ),
            HandshakeStep::SendJoin => ChatAction::Chat(
                ChatCommand::Join {
                    channel: config.channel.clone(),
                }
                .encode(),
            ),
            HandshakeStep::StartRelay => ChatAction::StartRelay,
        }
    }
}

/// Game output scanner waiting for the handshake to finish
struct PendingRelay<G> {
    scanner: OutputScanner,
    output: G,
}

/// Read loop over the chat connection
pub struct ChatHandler<G> {
    protocol: ChatProtocol,
    chat: SinkSender,
    game: SinkSender,
    relay: Option<PendingRelay<G>>,
    cancel: CancellationToken,
}

impl<G> ChatHandler<G>
where
    G: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(
        config: Arc<SessionConfig>,
        chat: SinkSender,
        game: SinkSender,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            protocol: ChatProtocol::new(config),
            chat,
            game,
            relay: None,
            cancel,
        }
    }

    /// Scanner and game output to start once the handshake is ready
    pub fn with_relay(mut self, scanner: OutputScanner, output: G) -> Self {
        self.relay = Some(PendingRelay { scanner, output });
        self
    }

    /// Read lines until the connection closes, a sink closes, or `cancel`
    /// fires. No reconnect is attempted.
    pub async fn run<R: AsyncBufRead + Unpin>(mut self, mut reader: R) {
        let mut raw = Vec::new();

        loop {
            raw.clear();
            let read = tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("Chat reader cancelled");
                    break;
                }
                read = reader.read_until(b'\n', &mut raw) => read,
            };

            match read {
                Ok(0) => {
                    info!("Chat connection closed");
                    break;
                }
                Ok(_) if raw.last() != Some(&b'\n') => {
                    debug!("Dropping unterminated final line");
                    info!("Chat connection closed");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Chat read failed: {}", e);
                    break;
                }
            }

            let line = String::from_utf8_lossy(&raw).into_owned();
            if let Err(e) = self.dispatch(&line).await {
                warn!("Chat reader stopped: {}", e);
                break;
            }
        }
    }

    async fn dispatch(&mut self, line: &str) -> Result<()> {
        for action in self.protocol.handle_line(line) {
            match action {
                ChatAction::Chat(out) => self.chat.send(out).await?,
                ChatAction::Game(out) => self.game.send(out).await?,
                ChatAction::StartRelay => self.start_relay(),
            }
        }
        Ok(())
    }

    fn start_relay(&mut self) {
        match self.relay.take() {
            Some(PendingRelay { scanner, output }) => {
                info!(
                    "Joined {}, relaying game output",
                    self.protocol.config.channel_target()
                );
                tokio::spawn(scanner.run(output, self.cancel.clone()));
            }
            None => warn!("Handshake ready but no game output to relay"),
        }
    }
}
