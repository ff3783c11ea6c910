//! TCP server for the SiKV line protocol

use super::connection::{ConnectionHandler, SharedTable};
use crate::config::ServerConfig;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

/// Why the server stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Interrupt or explicit request
    Requested,
    /// The engine hit an unrecoverable error
    Fatal,
}

impl ShutdownReason {
    /// Process exit status for this reason
    pub fn exit_status(self) -> u8 {
        match self {
            ShutdownReason::Requested => 0,
            ShutdownReason::Fatal => 1,
        }
    }
}

/// Capability to stop the server, handed to signal handlers and
/// connections instead of any process-wide state
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<Option<ShutdownReason>>>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown. A fatal reason is never downgraded.
    pub fn trigger(&self, reason: ShutdownReason) {
        self.tx.send_if_modified(|current| match current {
            Some(ShutdownReason::Fatal) => false,
            _ => {
                *current = Some(reason);
                true
            }
        });
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ShutdownReason>> {
        self.tx.subscribe()
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// SiKV protocol server
pub struct ProtocolServer {
    config: ServerConfig,
    handler: Arc<ConnectionHandler>,
    connection_semaphore: Arc<Semaphore>,
    shutdown: ShutdownHandle,
}

impl ProtocolServer {
    /// Create a new protocol server
    pub fn new(config: ServerConfig, table: SharedTable) -> Self {
        let shutdown = ShutdownHandle::new();
        let handler = Arc::new(ConnectionHandler::new(
            table,
            config.max_line_bytes,
            shutdown.clone(),
        ));
        let connection_semaphore = Arc::new(Semaphore::new(config.max_connections));

        Self {
            config,
            handler,
            connection_semaphore,
            shutdown,
        }
    }

    /// Bind the configured address and serve until shutdown
    pub async fn serve(&self) -> Result<ShutdownReason> {
        let listener = TcpListener::bind(self.config.bind)
            .await
            .with_context(|| format!("Failed to bind {}", self.config.bind))?;
        self.serve_on(listener).await
    }

    /// Serve connections from `listener` until shutdown is triggered, then
    /// wait for open connections to finish their current command
    pub async fn serve_on(&self, listener: TcpListener) -> Result<ShutdownReason> {
        tracing::info!(
            "SiKV server listening on {}",
            listener.local_addr().unwrap_or(self.config.bind)
        );

        let mut shutdown_rx = self.shutdown.subscribe();
        let mut connections = JoinSet::new();

        loop {
            if shutdown_rx.borrow_and_update().is_some() {
                break;
            }

            // Acquire connection permit
            let permit = tokio::select! {
                permit = self.connection_semaphore.clone().acquire_owned() => permit?,
                _ = shutdown_rx.wait_for(Option::is_some) => continue,
            };

            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = shutdown_rx.wait_for(Option::is_some) => continue,
            };

            match accepted {
                Ok((stream, addr)) => {
                    let handler = self.handler.clone();
                    let connection_shutdown = self.shutdown.subscribe();

                    connections.spawn(async move {
                        tracing::debug!("Accepted connection from {}", addr);

                        if let Err(e) = handler.handle(stream, connection_shutdown).await {
                            tracing::error!("Connection error from {}: {}", addr, e);
                        }

                        // Permit automatically released when dropped
                        drop(permit);
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept connection: {}", e);
                    // Don't break the loop, keep accepting new connections
                }
            }

            // Reap finished connections
            while connections.try_join_next().is_some() {}
        }

        let open = connections.len();
        if open > 0 {
            tracing::info!(open, "Waiting for connections to close");
        }
        while connections.join_next().await.is_some() {}

        let reason = self.shutdown.reason().unwrap_or(ShutdownReason::Requested);
        tracing::info!(?reason, "Server stopped");
        Ok(reason)
    }

    /// Handle used to stop the server
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Get server address
    pub fn addr(&self) -> SocketAddr {
        self.config.bind
    }

    /// Get max connections
    pub fn max_connections(&self) -> usize {
        self.config.max_connections
    }

    /// Get available connection slots
    pub fn available_connections(&self) -> usize {
        self.connection_semaphore.available_permits()
    }
}

/// Trigger a requested shutdown on Ctrl-C
pub async fn shutdown_on_ctrl_c(handle: ShutdownHandle) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::warn!("SIGINT received, cleaning up");
            handle.trigger(ShutdownReason::Requested);
        }
        Err(e) => tracing::error!("Unable to listen for Ctrl-C: {}", e),
    }
}
