use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use {
    lansite_config::LansiteConfig,
    lansite_sessions::CodeBook,
    tokio::sync::{Mutex, RwLock},
};

use crate::stream::{Stream, StreamPolicy};

// ── Connected socket ─────────────────────────────────────────────────────────

/// A WebSocket currently open against the gateway, bound or not.
#[derive(Debug, Clone)]
pub struct ConnectedSocket {
    pub conn_id: String,
    pub remote: SocketAddr,
}

// ── Gateway state ────────────────────────────────────────────────────────────

/// Shared gateway runtime state, wrapped in Arc for use across async tasks.
pub struct GatewayState {
    /// The main stream. Its request manager owns the admin stream, so this
    /// one lock serializes every stream mutation.
    pub stream: Mutex<Stream>,
    /// Login codes loaded from config at startup. Fixed for the process
    /// lifetime; new codes take effect on the next start.
    pub codes: CodeBook,
    pub sockets: RwLock<HashMap<String, ConnectedSocket>>,
    pub config: LansiteConfig,
    pub version: String,
}

impl GatewayState {
    pub fn new(config: LansiteConfig) -> Arc<Self> {
        let policy = StreamPolicy {
            gate_event_creation: config.stream.require_admin_verification,
            events_admin_only: config.stream.events_admin_only,
            private_messaging: config.stream.private_messaging,
        };
        Arc::new(Self {
            stream: Mutex::new(Stream::with_requests(policy)),
            codes: CodeBook::from_map(&config.codes),
            sockets: RwLock::new(HashMap::new()),
            config,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    pub async fn register_socket(&self, socket: ConnectedSocket) {
        let conn_id = socket.conn_id.clone();
        self.sockets.write().await.insert(conn_id, socket);
    }

    pub async fn remove_socket(&self, conn_id: &str) -> Option<ConnectedSocket> {
        self.sockets.write().await.remove(conn_id)
    }

    pub async fn socket_count(&self) -> usize {
        self.sockets.read().await.len()
    }
}
