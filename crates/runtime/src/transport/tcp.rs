use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use super::{Transport, TransportError};

/// Byte that terminates every frame on the wire.
pub const FRAME_DELIMITER: u8 = 0x04;

/// Upper bound on a single buffered frame.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

const READ_CHUNK: usize = 16 * 1024;

/// TCP transport with end-of-transmission delimited frames.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    buffer: Vec<u8>,
    closed: bool,
}

impl TcpTransport {
    pub async fn connect(addr: &str) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| TransportError::Connect {
                addr: addr.to_owned(),
                source,
            })?;
        stream.set_nodelay(true)?;
        debug!(addr, "connected to game server");
        Ok(Self::from_stream(stream))
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        Self {
            stream,
            buffer: Vec::with_capacity(READ_CHUNK),
            closed: false,
        }
    }

    /// Splits the first complete frame off the buffer.
    fn take_frame(&mut self) -> Option<Vec<u8>> {
        let end = self.buffer.iter().position(|b| *b == FRAME_DELIMITER)?;
        let mut frame: Vec<u8> = self.buffer.drain(..=end).collect();
        frame.pop();
        Some(frame)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, mut frame: Vec<u8>) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        trace!(len = frame.len(), "sending frame");
        frame.push(FRAME_DELIMITER);
        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            if let Some(frame) = self.take_frame() {
                trace!(len = frame.len(), "received frame");
                return Ok(Some(frame));
            }
            if self.closed {
                return Ok(None);
            }
            if self.buffer.len() > MAX_FRAME_LEN {
                return Err(TransportError::FrameTooLarge {
                    limit: MAX_FRAME_LEN,
                });
            }

            self.buffer.reserve(READ_CHUNK);
            // `read_buf` is cancel safe and appends into the persistent buffer.
            if self.stream.read_buf(&mut self.buffer).await? == 0 {
                self.closed = true;
                if !self.buffer.is_empty() {
                    return Err(TransportError::TruncatedFrame);
                }
                return Ok(None);
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !self.closed {
            self.closed = true;
            self.stream.shutdown().await?;
        }
        Ok(())
    }
}
