//! Framed byte transport between the client and the game server.
//!
//! Frames are opaque byte payloads. [`TcpTransport`] delimits them with an
//! end-of-transmission byte; [`MemoryTransport`] passes them over channels and
//! backs scripted servers in tests.

mod memory;
mod tcp;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryTransport;
pub use tcp::{FRAME_DELIMITER, MAX_FRAME_LEN, TcpTransport};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {addr}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transport I/O failed")]
    Io(#[from] std::io::Error),

    #[error("transport is closed")]
    Closed,

    #[error("incoming frame exceeds {limit} bytes")]
    FrameTooLarge { limit: usize },

    #[error("connection closed in the middle of a frame")]
    TruncatedFrame,
}

/// Bidirectional, ordered frame transport.
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError>;

    /// Next frame from the peer, or `None` once the peer closed cleanly.
    ///
    /// Must be cancel safe: dropping the future before it completes loses no
    /// data.
    async fn receive(&mut self) -> Result<Option<Vec<u8>>, TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        (**self).send(frame).await
    }

    async fn receive(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        (**self).receive().await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        (**self).close().await
    }
}
