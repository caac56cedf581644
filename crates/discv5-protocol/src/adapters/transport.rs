use std::net::SocketAddr;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::DiscoveryError;
use crate::ports::Transport;

// ============================================================================
// NoOpTransport / RecordingTransport - Stubs for testing without network
// ============================================================================

/// Transport that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpTransport;

impl NoOpTransport {
    /// Create a new no-op transport.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for NoOpTransport {
    async fn send(&self, _bytes: Vec<u8>, _destination: SocketAddr) -> Result<(), DiscoveryError> {
        Ok(())
    }
}

/// Transport that keeps every datagram it is asked to send.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(Vec<u8>, SocketAddr)>>,
}

impl RecordingTransport {
    /// Create with nothing recorded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the recorded datagrams, oldest first.
    pub fn take(&self) -> Vec<(Vec<u8>, SocketAddr)> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Number of datagrams recorded and not yet taken.
    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    /// Check if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, bytes: Vec<u8>, destination: SocketAddr) -> Result<(), DiscoveryError> {
        self.sent.lock().push((bytes, destination));
        Ok(())
    }
}

// ============================================================================
// UdpTransport - tokio UDP socket (requires "network" feature)
// ============================================================================

#[cfg(feature = "network")]
mod udp {
    use super::*;
    use crate::service::DiscoveryService;
    use std::sync::Arc;
    use tokio::net::UdpSocket;
    use tracing::{debug, warn};

    /// Receive buffer. Datagrams longer than a packet are rejected by the
    /// codec.
    const RECV_BUFFER_SIZE: usize = 2048;

    /// UDP transport on a tokio socket.
    ///
    /// Cheap to clone; clones share the socket.
    #[derive(Debug, Clone)]
    pub struct UdpTransport {
        socket: Arc<UdpSocket>,
    }

    impl UdpTransport {
        /// Bind to a local address (e.g. "0.0.0.0:9000").
        ///
        /// # Errors
        ///
        /// Returns error if socket binding fails.
        pub async fn bind(bind_addr: &str) -> std::io::Result<Self> {
            let socket = UdpSocket::bind(bind_addr).await?;
            Ok(Self {
                socket: Arc::new(socket),
            })
        }

        /// Get the local address the socket is bound to.
        pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
            self.socket.local_addr()
        }

        /// Feed every received datagram to `service`, each in its own task.
        ///
        /// Returns only when the socket fails.
        pub async fn run_receive_loop(&self, service: Arc<DiscoveryService>) -> std::io::Result<()> {
            let mut buf = vec![0u8; RECV_BUFFER_SIZE];
            loop {
                let (len, source) = match self.socket.recv_from(&mut buf).await {
                    Ok(received) => received,
                    Err(e) if e.kind() == std::io::ErrorKind::ConnectionReset => {
                        debug!("[discv5] Ignoring ICMP reset: {}", e);
                        continue;
                    }
                    Err(e) => {
                        warn!("[discv5] UDP receive failed: {}", e);
                        return Err(e);
                    }
                };
                let datagram = buf[..len].to_vec();
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    service.handle_inbound(&datagram, source).await;
                });
            }
        }
    }

    #[async_trait]
    impl Transport for UdpTransport {
        async fn send(&self, bytes: Vec<u8>, destination: SocketAddr) -> Result<(), DiscoveryError> {
            self.socket
                .send_to(&bytes, destination)
                .await
                .map(|_| ())
                .map_err(|e| DiscoveryError::Transport(format!("send to {destination}: {e}")))
        }
    }
}

#[cfg(feature = "network")]
pub use udp::UdpTransport;
