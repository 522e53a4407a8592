//! `GomokuServer` builder and accept loop.
//!
//! This ties the layers together: transport → codec → registry → rooms.

use std::net::SocketAddr;
use std::sync::Arc;

use gomoku_protocol::{Codec, JsonCodec};
use gomoku_room::{Registry, RegistryHandle, RoomConfig};
use gomoku_transport::{Transport, WebSocketTransport};

use crate::GomokuError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: RegistryHandle,
    pub(crate) codec: C,
    pub(crate) outbound_capacity: usize,
}

/// Builder for configuring and starting a server.
///
/// # Example
///
/// ```rust,no_run
/// use gomoku::prelude::*;
///
/// # async fn start() -> Result<(), GomokuError> {
/// let server = GomokuServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GomokuServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
}

impl GomokuServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            room_config: RoomConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the grace delay and queue sizes used by every room.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Binds the listener and starts the registry, speaking JSON.
    pub async fn build(self) -> Result<GomokuServer<JsonCodec>, GomokuError> {
        self.build_with_codec(JsonCodec).await
    }

    /// Binds the listener and starts the registry with a custom codec.
    pub async fn build_with_codec<C: Codec>(self, codec: C) -> Result<GomokuServer<C>, GomokuError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let outbound_capacity = self.room_config.outbound_capacity;
        let registry = Registry::spawn(self.room_config);

        let state = Arc::new(ServerState {
            registry,
            codec,
            outbound_capacity,
        });

        Ok(GomokuServer { transport, state })
    }
}

impl Default for GomokuServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Gomoku server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct GomokuServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl GomokuServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> GomokuServerBuilder {
        GomokuServerBuilder::new()
    }
}

impl<C: Codec> GomokuServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// The registry behind this server.
    pub fn registry(&self) -> &RegistryHandle {
        &self.state.registry
    }

    /// Runs the accept loop.
    ///
    /// Each connection is handled on its own task. A failed accept is
    /// logged and the loop carries on. Runs until the process is
    /// terminated.
    pub async fn run(mut self) -> Result<(), GomokuError> {
        match self.local_addr() {
            Ok(addr) => tracing::info!(%addr, "gomoku server listening"),
            Err(_) => tracing::info!("gomoku server listening"),
        }

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
