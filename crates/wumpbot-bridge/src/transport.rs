//! Outbound transport
//!
//! Each destination stream gets exactly one writer task. Producers never
//! touch the stream; they push finished lines into the sink's channel and
//! the writer flushes them in arrival order.

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use wumpbot_core::{BridgeError, Result};

/// Trait for async writing to a destination stream
#[async_trait]
pub trait AsyncWriter: Send {
    /// Write one complete line and flush it
    async fn write_line(&mut self, data: &[u8]) -> Result<()>;
}

/// Writer over any byte stream (process stdin, socket write half, ...)
pub struct StreamWriter<W>(pub W);

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> AsyncWriter for StreamWriter<W> {
    async fn write_line(&mut self, data: &[u8]) -> Result<()> {
        self.0
            .write_all(data)
            .await
            .map_err(|e| BridgeError::Io(format!("Write failed: {}", e)))?;

        self.0
            .flush()
            .await
            .map_err(|e| BridgeError::Io(format!("Flush failed: {}", e)))?;

        Ok(())
    }
}

/// Producer side of a sink
#[derive(Debug, Clone)]
pub struct SinkSender {
    name: &'static str,
    tx: mpsc::Sender<String>,
}

impl SinkSender {
    pub fn new(name: &'static str, tx: mpsc::Sender<String>) -> Self {
        Self { name, tx }
    }

    /// Queue a line, waiting while the channel is full
    pub async fn send(&self, line: impl Into<String>) -> Result<()> {
        self.tx
            .send(line.into())
            .await
            .map_err(|_| BridgeError::ChannelClosed(format!("{} sink", self.name)))
    }
}

/// A channel plus the task draining it into one stream
pub struct Sink {
    sender: SinkSender,
    handle: JoinHandle<()>,
}

impl Sink {
    /// Spawn the writer task for `writer`
    pub fn spawn<W>(name: &'static str, writer: W, capacity: usize, cancel: CancellationToken) -> Self
    where
        W: AsyncWriter + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(writer_task(name, writer, rx, cancel));
        Self {
            sender: SinkSender::new(name, tx),
            handle,
        }
    }

    /// A new producer handle
    pub fn sender(&self) -> SinkSender {
        self.sender.clone()
    }

    /// Drop this sink's own producer handle and wait for the writer to stop.
    ///
    /// The writer stops once every producer is gone, the stream fails, or the
    /// cancellation token fires.
    pub async fn join(self) -> Result<()> {
        let name = self.sender.name;
        drop(self.sender);
        self.handle
            .await
            .map_err(|e| BridgeError::Io(format!("{} writer task failed: {}", name, e)))
    }
}

/// Drain `rx` into `writer` until the channel closes, a write fails, or
/// `cancel` fires.
///
/// Queued lines are preferred over cancellation, so lines sent before a
/// shutdown still reach the stream.
pub async fn writer_task<W: AsyncWriter>(
    name: &'static str,
    mut writer: W,
    mut rx: mpsc::Receiver<String>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            line = rx.recv() => {
                match line {
                    Some(line) => {
                        debug!("[{}] {}", name, line.trim_end());
                        if let Err(e) = writer.write_line(line.as_bytes()).await {
                            error!("{} writer stopped: {}", name, e);
                            break;
                        }
                    }
                    None => {
                        debug!("{} channel closed, writer exiting", name);
                        break;
                    }
                }
            }

            _ = cancel.cancelled() => {
                debug!("{} writer cancelled", name);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_writes_in_send_order() {
        let mock = Builder::new()
            .write(b"n\n")
            .write(b"m 12\n")
            .write(b"s 3\n")
            .build();
        let sink = Sink::spawn("game", StreamWriter(mock), 1, CancellationToken::new());

        let tx = sink.sender();
        tx.send("n\n").await.unwrap();
        tx.send("m 12\n").await.unwrap();
        tx.send("s 3\n").await.unwrap();
        drop(tx);

        sink.join().await.unwrap();
    }

    #[tokio::test]
    async fn test_many_producers_no_interleaving() {
        let (bridge_end, mut game_end) = tokio::io::duplex(4096);
        let sink = Sink::spawn("game", StreamWriter(bridge_end), 1, CancellationToken::new());

        let mut producers = Vec::new();
        for p in 0..4 {
            let tx = sink.sender();
            producers.push(tokio::spawn(async move {
                for i in 0..10 {
                    tx.send(format!("p{} {}\n", p, i)).await.unwrap();
                }
            }));
        }
        for producer in producers {
            producer.await.unwrap();
        }
        sink.join().await.unwrap();

        let mut written = String::new();
        game_end.read_to_string(&mut written).await.unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 40);

        // Each producer's lines arrive whole and in its own send order
        for p in 0..4 {
            let prefix = format!("p{} ", p);
            let own: Vec<&str> = lines.iter().copied().filter(|l| l.starts_with(&prefix)).collect();
            let expected: Vec<String> = (0..10).map(|i| format!("p{} {}", p, i)).collect();
            assert_eq!(own, expected);
        }
    }

    #[tokio::test]
    async fn test_queued_lines_drain_before_cancel() {
        let mock = Builder::new().write(b"q\n").write(b"QUIT\r\n").build();
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(4);
        tx.send("q\n".to_string()).await.unwrap();
        tx.send("QUIT\r\n".to_string()).await.unwrap();
        cancel.cancel();

        // tx is still alive, so only cancellation can stop the writer
        writer_task("chat", StreamWriter(mock), rx, cancel).await;
        drop(tx);
    }

    #[tokio::test]
    async fn test_send_after_writer_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = SinkSender::new("chat", tx);
        match sender.send("hello\r\n").await {
            Err(BridgeError::ChannelClosed(name)) => assert_eq!(name, "chat sink"),
            other => panic!("Expected closed channel, got {:?}", other),
        }
    }
}
