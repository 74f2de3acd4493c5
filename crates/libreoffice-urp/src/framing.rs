//! URP block framing.
//!
//! Every block starts with an 8-byte header: payload size and message count,
//! both big-endian `u32`. This client always sends one message per block and
//! LibreOffice does the same in practice.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, UrpError};

/// Upper bound on a single block; anything larger is treated as corruption.
const MAX_BLOCK: u32 = 64 * 1024 * 1024;

/// Block-level reader/writer over any byte stream.
pub struct Framed<S> {
    stream: S,
}

impl<S> Framed<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    pub async fn write_block(&mut self, message: &[u8]) -> Result<()> {
        let size = u32::try_from(message.len())
            .map_err(|_| UrpError::malformed("outgoing message exceeds u32 size"))?;
        let mut header = [0u8; 8];
        header[..4].copy_from_slice(&size.to_be_bytes());
        header[4..].copy_from_slice(&1u32.to_be_bytes());

        self.stream.write_all(&header).await?;
        self.stream.write_all(message).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Reads one block and returns its payload.
    pub async fn read_block(&mut self) -> Result<Bytes> {
        let mut header = [0u8; 8];
        if let Err(e) = self.stream.read_exact(&mut header).await {
            return Err(if e.kind() == std::io::ErrorKind::UnexpectedEof {
                UrpError::ConnectionClosed
            } else {
                UrpError::Io(e)
            });
        }

        let size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        if size > MAX_BLOCK {
            return Err(UrpError::Malformed(format!("block of {size} bytes")));
        }

        let mut payload = BytesMut::zeroed(size as usize);
        self.stream.read_exact(&mut payload).await?;
        Ok(payload.freeze())
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_blocks_arrive_in_order() {
        let (a, b) = duplex(1024);
        let mut tx = Framed::new(a);
        let mut rx = Framed::new(b);

        tx.write_block(b"first").await.unwrap();
        tx.write_block(b"").await.unwrap();
        tx.write_block(b"third").await.unwrap();

        assert_eq!(rx.read_block().await.unwrap().as_ref(), b"first");
        assert!(rx.read_block().await.unwrap().is_empty());
        assert_eq!(rx.read_block().await.unwrap().as_ref(), b"third");
    }

    #[tokio::test]
    async fn test_header_is_size_then_count() {
        let (a, mut b) = duplex(64);
        let mut tx = Framed::new(a);
        tx.write_block(b"abc").await.unwrap();

        let mut raw = [0u8; 11];
        b.read_exact(&mut raw).await.unwrap();
        assert_eq!(&raw[..8], &[0, 0, 0, 3, 0, 0, 0, 1]);
        assert_eq!(&raw[8..], b"abc");
    }

    #[tokio::test]
    async fn test_peer_hangup_is_reported_as_closed() {
        let (a, b) = duplex(64);
        drop(a);
        let mut rx = Framed::new(b);
        assert!(matches!(rx.read_block().await, Err(UrpError::ConnectionClosed)));
    }
}
