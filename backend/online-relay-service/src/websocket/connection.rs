use crate::error::{RelayError, Result};
use crate::models::Platform;
use async_trait::async_trait;
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use uuid::Uuid;

/// Unique identifier for a registered gateway connection
///
/// Each connection gets a unique id when the accept path creates it, so a
/// stale disconnect never removes the connection that replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Frames queued toward the transport writer of one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Binary push envelope
    Binary(Bytes),
    /// Control frame asking the client to go offline
    Kick,
}

/// Write side of one live gateway connection
///
/// Implemented by the transport; the relay only reads connection metadata and
/// writes through it.
#[async_trait]
pub trait PushConnection: Send + Sync {
    fn id(&self) -> ConnectionId;

    fn user_id(&self) -> &str;

    fn platform(&self) -> Platform;

    fn remote_addr(&self) -> SocketAddr;

    /// Write one binary frame. An error means the frame was not accepted.
    async fn write_frame(&self, frame: Bytes) -> Result<()>;

    /// Signal the client to disconnect. Teardown is left to the transport.
    async fn send_kick(&self);
}

pub type SharedConnection = Arc<dyn PushConnection>;

/// Connection backed by a bounded queue drained by the socket writer task
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    user_id: String,
    platform: Platform,
    remote_addr: SocketAddr,
    sender: mpsc::Sender<OutboundFrame>,
    write_timeout: Duration,
}

impl ConnectionHandle {
    /// Create a handle and the receiver the transport writer should drain
    pub fn channel(
        user_id: impl Into<String>,
        platform: Platform,
        remote_addr: SocketAddr,
        queue_size: usize,
        write_timeout: Duration,
    ) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (sender, receiver) = mpsc::channel(queue_size.max(1));
        let handle = Self {
            id: ConnectionId::new(),
            user_id: user_id.into(),
            platform,
            remote_addr,
            sender,
            write_timeout,
        };
        (handle, receiver)
    }

    async fn enqueue(&self, frame: OutboundFrame) -> Result<()> {
        self.sender
            .send_timeout(frame, self.write_timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => {
                    RelayError::Transport(format!("write timed out after {:?}", self.write_timeout))
                }
                SendTimeoutError::Closed(_) => RelayError::Transport("connection closed".into()),
            })
    }
}

#[async_trait]
impl PushConnection for ConnectionHandle {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn platform(&self) -> Platform {
        self.platform
    }

    fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    async fn write_frame(&self, frame: Bytes) -> Result<()> {
        self.enqueue(OutboundFrame::Binary(frame)).await
    }

    async fn send_kick(&self) {
        if let Err(e) = self.enqueue(OutboundFrame::Kick).await {
            tracing::warn!(
                user_id = %self.user_id,
                platform = %self.platform,
                remote_addr = %self.remote_addr,
                error = %e,
                "Failed to queue kick frame"
            );
        }
    }
}
