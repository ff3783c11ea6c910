//! Per-connection command loop
//!
//! ```text
//! Client → TCP → read_frame → tokenize → lock table → process_command → reply
//! ```
//!
//! The table lock is held for exactly one command and never across an
//! await point, so every engine operation runs to completion before any
//! other connection observes the table.

use super::protocol::{read_frame, tokenize, write_reply, Frame};
use super::server::{ShutdownHandle, ShutdownReason};
use crate::command::{process_command, Outcome};
use crate::storage::HashMap;
use anyhow::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::sync::watch;

/// Table shared by every connection
pub type SharedTable = Arc<Mutex<HashMap>>;

/// Connection handler for TCP streams
#[derive(Debug)]
pub struct ConnectionHandler {
    table: SharedTable,
    max_line_bytes: usize,
    shutdown: ShutdownHandle,
}

impl ConnectionHandler {
    pub fn new(table: SharedTable, max_line_bytes: usize, shutdown: ShutdownHandle) -> Self {
        Self {
            table,
            max_line_bytes,
            shutdown,
        }
    }

    /// Run one command line against the table
    pub fn execute(&self, line: &[u8]) -> Option<Outcome> {
        let argv = tokenize(line);
        if argv.is_empty() {
            return None;
        }
        let mut table = self.table.lock();
        Some(process_command(&mut table, &argv))
    }

    /// Serve a TCP connection until the peer disconnects or the server
    /// shuts down
    ///
    /// `shutdown` must be subscribed before the connection is handed off;
    /// a shutdown already in effect closes the connection immediately.
    pub async fn handle(
        &self,
        stream: TcpStream,
        mut shutdown: watch::Receiver<Option<ShutdownReason>>,
    ) -> Result<()> {
        let peer_addr = stream.peer_addr()?;
        tracing::info!("New connection from {}", peer_addr);

        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        loop {
            let frame = tokio::select! {
                frame = read_frame(&mut reader, self.max_line_bytes) => frame?,
                _ = shutdown.wait_for(Option::is_some) => {
                    tracing::debug!("Closing connection from {} for shutdown", peer_addr);
                    break;
                }
            };

            let outcome = match frame {
                Frame::Eof => {
                    tracing::info!("Client disconnected: {}", peer_addr);
                    break;
                }
                Frame::TooLong => {
                    tracing::warn!(peer = %peer_addr, "Discarded overlong line");
                    Outcome::Error(format!("Line exceeds {} bytes", self.max_line_bytes))
                }
                Frame::Line(line) => match self.execute(&line) {
                    Some(outcome) => outcome,
                    None => continue,
                },
            };

            if let Err(e) = write_reply(&mut write_half, &outcome.to_reply()).await {
                tracing::error!("Failed to write reply to {}: {}", peer_addr, e);
                break;
            }

            if outcome.is_fatal() {
                self.shutdown.trigger(ShutdownReason::Fatal);
                break;
            }
        }

        tracing::info!("Connection closed from {}", peer_addr);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{murmur3, ValueType};

    fn handler() -> ConnectionHandler {
        let table = HashMap::init(4, murmur3, ValueType::String).unwrap();
        ConnectionHandler::new(
            Arc::new(Mutex::new(table)),
            1024,
            ShutdownHandle::new(),
        )
    }

    #[test]
    fn test_execute_lines() {
        let handler = handler();
        assert_eq!(handler.execute(b"SET a 1\n"), Some(Outcome::Success));
        assert_eq!(
            handler.execute(b"GET a\n"),
            Some(Outcome::Value(b"1".to_vec()))
        );
        assert_eq!(handler.execute(b"\n"), None);
    }

    #[test]
    fn test_fatal_outcome_on_destroyed_table() {
        let handler = handler();
        handler.table.lock().destroy();
        let outcome = handler.execute(b"SET a 1\n");
        assert!(outcome.is_some_and(|o| o.is_fatal()));
    }

    #[tokio::test]
    async fn test_handle_returns_when_shutdown_already_seen() -> Result<()> {
        let handler = handler();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let _client = TcpStream::connect(listener.local_addr()?).await?;
        let (stream, _) = listener.accept().await?;

        handler.shutdown.trigger(ShutdownReason::Requested);
        // Subscribed after the trigger, so the change is already marked seen
        let shutdown = handler.shutdown.subscribe();

        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            handler.handle(stream, shutdown),
        )
        .await??;
        Ok(())
    }
}
