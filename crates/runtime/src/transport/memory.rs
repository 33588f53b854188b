use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Transport, TransportError};

/// In-process transport; one half of a connected pair.
///
/// Dropping or closing one half makes the other observe end of stream.
#[derive(Debug)]
pub struct MemoryTransport {
    tx: Option<mpsc::Sender<Vec<u8>>>,
    rx: mpsc::Receiver<Vec<u8>>,
}

impl MemoryTransport {
    /// Two connected halves, each buffering up to `capacity` frames.
    pub fn pair(capacity: usize) -> (Self, Self) {
        let capacity = capacity.max(1);
        let (left_tx, right_rx) = mpsc::channel(capacity);
        let (right_tx, left_rx) = mpsc::channel(capacity);
        (
            Self {
                tx: Some(left_tx),
                rx: left_rx,
            },
            Self {
                tx: Some(right_tx),
                rx: right_rx,
            },
        )
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(frame).await.map_err(|_| TransportError::Closed)
    }

    async fn receive(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.rx.recv().await)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.tx = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn close_reads_as_end_of_stream() {
        let (mut client, mut server) = MemoryTransport::pair(4);
        client.send(b"one".to_vec()).await.unwrap();
        client.close().await.unwrap();

        assert_eq!(server.receive().await.unwrap().unwrap(), b"one");
        assert!(server.receive().await.unwrap().is_none());
        assert!(matches!(
            client.send(b"two".to_vec()).await,
            Err(TransportError::Closed)
        ));
    }
}
