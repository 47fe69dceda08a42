//! Session wiring
//!
//! Writer tasks are spawned before any producer so that the first queued
//! line always has a consumer. The chat reader then starts the game output
//! scanner itself once the handshake is ready.

use crate::irc::ChatHandler;
use crate::scanner::OutputScanner;
use crate::transport::{Sink, StreamWriter};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wumpbot_core::{BridgeError, ChatCommand, GameCommand, Result, SessionConfig};

/// Operator line that shuts the session down
pub const QUIT_LINE: &str = "q";

/// Why the operator loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorExit {
    /// Quit requested; quit commands are queued on both sinks
    Quit,
    /// Operator input ended; nothing was sent
    Closed,
}

/// A running bridge between one game process and one chat connection
pub struct Session {
    /// Stops everything, writers included
    cancel: CancellationToken,
    /// Stops the reader loops only
    readers: CancellationToken,
    game: Sink,
    chat: Sink,
    chat_reader: JoinHandle<()>,
}

impl Session {
    /// Spawn the writer tasks and the chat reader over the given streams
    pub fn start<GW, GR, CR, CW>(
        config: SessionConfig,
        game_in: GW,
        game_out: GR,
        chat_in: CR,
        chat_out: CW,
    ) -> Self
    where
        GW: AsyncWrite + Unpin + Send + 'static,
        GR: AsyncRead + Unpin + Send + 'static,
        CR: AsyncRead + Unpin + Send + 'static,
        CW: AsyncWrite + Unpin + Send + 'static,
    {
        let config = Arc::new(config);
        let cancel = CancellationToken::new();
        let readers = cancel.child_token();

        let game = Sink::spawn(
            "game",
            StreamWriter(game_in),
            config.channel_capacity,
            cancel.clone(),
        );
        let chat = Sink::spawn(
            "chat",
            StreamWriter(chat_out),
            config.channel_capacity,
            cancel.clone(),
        );

        let scanner = OutputScanner::new(&config, chat.sender(), game.sender());
        let handler = ChatHandler::new(config.clone(), chat.sender(), game.sender(), readers.clone())
            .with_relay(scanner, BufReader::new(game_out));
        let chat_reader = tokio::spawn(handler.run(BufReader::new(chat_in)));

        info!("Session started for {} as {}", config.channel_target(), config.nick);

        Self {
            cancel,
            readers,
            game,
            chat,
            chat_reader,
        }
    }

    /// Read operator lines until a quit line or end of input
    pub async fn operator_loop<R: AsyncBufRead + Unpin>(&self, mut input: R) -> Result<OperatorExit> {
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = input
                .read_line(&mut line)
                .await
                .map_err(|e| BridgeError::Io(format!("Failed to read operator input: {}", e)))?;

            // An unterminated last line is not a command
            if bytes_read == 0 || !line.ends_with('\n') {
                info!("Operator input closed");
                return Ok(OperatorExit::Closed);
            }

            if line.trim_end_matches(['\r', '\n']) == QUIT_LINE {
                self.quit().await?;
                return Ok(OperatorExit::Quit);
            }

            debug!("Ignoring operator input: {}", line.trim_end());
        }
    }

    /// Ask the game and the chat server to end the session, then stop the
    /// reader loops. Writers keep draining what is already queued.
    pub async fn quit(&self) -> Result<()> {
        info!("Quitting game and disconnecting");
        self.game.sender().send(GameCommand::Quit.encode()).await?;
        self.chat.sender().send(ChatCommand::Quit.encode()).await?;
        self.readers.cancel();
        Ok(())
    }

    /// Cancel every task and wait up to `grace` for each to finish
    pub async fn shutdown(self, grace: Duration) {
        self.cancel.cancel();

        if tokio::time::timeout(grace, self.chat_reader).await.is_err() {
            warn!("Chat reader did not stop within {:?}", grace);
        }
        for sink in [self.game, self.chat] {
            match tokio::time::timeout(grace, sink.join()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("{}", e),
                Err(_) => warn!("Writer did not stop within {:?}", grace),
            }
        }
        debug!("Session shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};

    const WAIT: Duration = Duration::from_secs(5);

    struct Peers {
        session: Session,
        /// What the bridge writes to the game's stdin
        game_in: BufReader<DuplexStream>,
        /// The game's stdout
        game_out: DuplexStream,
        server_rx: BufReader<ReadHalf<DuplexStream>>,
        server_tx: WriteHalf<DuplexStream>,
    }

    fn start() -> Peers {
        let (game_in_bridge, game_in) = tokio::io::duplex(4096);
        let (game_out, game_out_bridge) = tokio::io::duplex(4096);
        let (server, bridge) = tokio::io::duplex(4096);
        let (chat_in, chat_out) = tokio::io::split(bridge);
        let (server_rx, server_tx) = tokio::io::split(server);

        let session = Session::start(
            SessionConfig::new("localhost:6667", "wump", "cave"),
            game_in_bridge,
            game_out_bridge,
            chat_in,
            chat_out,
        );

        Peers {
            session,
            game_in: BufReader::new(game_in),
            game_out,
            server_rx: BufReader::new(server_rx),
            server_tx,
        }
    }

    async fn next_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> String {
        let mut line = String::new();
        tokio::time::timeout(WAIT, reader.read_line(&mut line))
            .await
            .expect("timed out waiting for a line")
            .unwrap();
        line
    }

    async fn server_says(peers: &mut Peers, line: &str) {
        peers.server_tx.write_all(line.as_bytes()).await.unwrap();
    }

    #[tokio::test]
    async fn test_full_session() {
        let mut p = start();

        server_says(&mut p, ":srv NOTICE * :*** Checking ident\r\n").await;
        assert_eq!(next_line(&mut p.server_rx).await, "NICK wump\r\n");
        server_says(&mut p, ":srv NOTICE * :*** No ident\r\n").await;
        assert_eq!(next_line(&mut p.server_rx).await, "USER wump wump 0 :wump\r\n");
        server_says(&mut p, ":srv 001 wump :Welcome\r\n").await;
        assert_eq!(next_line(&mut p.server_rx).await, "JOIN #cave\r\n");

        server_says(&mut p, "PING :abc123\r\n").await;
        assert_eq!(next_line(&mut p.server_rx).await, "PONG :abc123\r\n");

        // Fourth counted line starts the relay
        server_says(&mut p, ":wump JOIN #cave\r\n").await;

        p.game_out
            .write_all(b"Instructions? (y-n) You are in room 3.\nTunnels ")
            .await
            .unwrap();
        assert_eq!(next_line(&mut p.game_in).await, "n\n");
        assert_eq!(
            next_line(&mut p.server_rx).await,
            "PRIVMSG #cave :You are in room 3.\r\n"
        );

        server_says(&mut p, ":alice!a@host PRIVMSG #cave :wump: m 12\r\n").await;
        assert_eq!(next_line(&mut p.game_in).await, "m 12\n");
        server_says(&mut p, ":alice!a@host PRIVMSG #cave :wump: m 123\r\n").await;
        assert_eq!(next_line(&mut p.game_in).await, "wtf\n");

        let exit = p.session.operator_loop(&b"status\nq\n"[..]).await.unwrap();
        assert_eq!(exit, OperatorExit::Quit);
        assert_eq!(next_line(&mut p.game_in).await, "q\n");
        assert_eq!(next_line(&mut p.server_rx).await, "QUIT\r\n");

        p.session.shutdown(WAIT).await;
    }

    #[tokio::test]
    async fn test_operator_eof_sends_nothing() {
        let mut p = start();

        let exit = p.session.operator_loop(&b"hello\n"[..]).await.unwrap();
        assert_eq!(exit, OperatorExit::Closed);

        p.session.shutdown(WAIT).await;

        // Writers are gone, so both streams end without any output
        let mut rest = String::new();
        tokio::time::timeout(WAIT, p.game_in.read_line(&mut rest))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rest, "");
    }

    #[tokio::test]
    async fn test_quit_line_must_match_exactly() {
        let mut p = start();

        let exit = p.session.operator_loop(&b"quit\n q\n"[..]).await.unwrap();
        assert_eq!(exit, OperatorExit::Closed);

        let exit = p.session.operator_loop(&b"q"[..]).await.unwrap();
        assert_eq!(exit, OperatorExit::Closed);

        let exit = p.session.operator_loop(&b"q\r\n"[..]).await.unwrap();
        assert_eq!(exit, OperatorExit::Quit);
        assert_eq!(next_line(&mut p.game_in).await, "q\n");

        p.session.shutdown(WAIT).await;
    }
}
