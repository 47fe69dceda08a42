//! Game output scanner
//!
//! Reads the game's stdout as space-delimited tokens, rebuilds them into
//! channel messages and lets the prompt state machine swallow and answer the
//! game's interactive questions.

use crate::transport::SinkSender;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wumpbot_core::chat::LINE_END;
use wumpbot_core::{ChatCommand, PromptReply, PromptState, Result, SessionConfig};

/// Turns the game's token stream into chat lines and prompt answers
pub struct OutputScanner {
    /// Channel message header, e.g. `PRIVMSG #cave :`
    prefix: String,
    /// Outbound line being built, always starting with `prefix`
    line: String,
    prompt: PromptState,
    chat: SinkSender,
    game: SinkSender,
}

impl OutputScanner {
    pub fn new(config: &SessionConfig, chat: SinkSender, game: SinkSender) -> Self {
        let prefix = ChatCommand::privmsg_prefix(&config.channel);
        Self {
            line: prefix.clone(),
            prefix,
            prompt: PromptState::default(),
            chat,
            game,
        }
    }

    pub fn prompt_state(&self) -> PromptState {
        self.prompt
    }

    /// Text accumulated for the next chat line
    pub fn pending(&self) -> &str {
        &self.line[self.prefix.len()..]
    }

    /// Scan until the stream ends, a read fails, a sink closes, or `cancel`
    /// fires. A trailing unterminated line is never sent.
    pub async fn run<R: AsyncBufRead + Unpin>(mut self, mut reader: R, cancel: CancellationToken) {
        let mut raw = Vec::new();

        loop {
            raw.clear();
            let read = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Game output scanner cancelled");
                    break;
                }
                read = reader.read_until(b' ', &mut raw) => read,
            };

            let complete = match read {
                Ok(0) => {
                    info!("Game output closed");
                    break;
                }
                Ok(_) => raw.last() == Some(&b' '),
                Err(e) => {
                    warn!("Game output read failed: {}", e);
                    break;
                }
            };

            let token = String::from_utf8_lossy(&raw).into_owned();
            let fed = if complete {
                self.feed(&token).await
            } else {
                self.finish(&token).await
            };

            if let Err(e) = fed {
                warn!("Game output scanner stopped: {}", e);
                break;
            }
            if !complete {
                info!("Game output closed");
                break;
            }
        }
    }

    /// Process one space-terminated token
    pub async fn feed(&mut self, token: &str) -> Result<()> {
        // Line breaks only matter while relaying; inside a prompt every token
        // is matched raw against the terminator.
        let token = if self.prompt.is_relaying() {
            self.flush_lines(token).await?
        } else {
            token
        };

        let transition = self.prompt.step(token);
        self.prompt = transition.next;

        if let Some(reply) = transition.reply {
            if reply == PromptReply::NewCave {
                info!("Restarting game");
            }
            debug!("Answering prompt: {:?}", reply);
            self.game.send(reply.command().encode()).await?;
        }

        if !transition.suppressed {
            self.line.push_str(token);
        }
        Ok(())
    }

    /// Process the final token of a stream that ended without a delimiter
    async fn finish(&mut self, token: &str) -> Result<()> {
        if self.prompt.is_relaying() {
            self.flush_lines(token).await?;
        }
        Ok(())
    }

    /// Send every line completed inside `token` and return the remainder
    async fn flush_lines<'t>(&mut self, token: &'t str) -> Result<&'t str> {
        let mut rest = token;
        while let Some(index) = rest.find('\n') {
            self.line.push_str(&rest[..index]);
            self.flush().await?;
            rest = &rest[index + 1..];
        }
        Ok(rest)
    }

    async fn flush(&mut self) -> Result<()> {
        let text = self.pending().trim_end_matches('\r');
        let out = if text.trim().is_empty() {
            None
        } else {
            Some(format!("{}{}{}", self.prefix, text, LINE_END))
        };
        self.line.truncate(self.prefix.len());

        if let Some(out) = out {
            self.chat.send(out).await?;
        }
        Ok(())
    }
}
