// Copyright 2025 Dustin McAfee
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Typed byte-order I/O over an async transport.
//!
//! Generalizes the teacher's direct `TcpStream::read_exact`/`write_all`
//! calls scattered through the handshake and message loop into one reusable
//! wrapper. RFB is big-endian on the wire except pixel data, which follows
//! the negotiated `PixelFormat::big_endian` flag (handled by the pixel
//! format module, not here).

use crate::error::{Result, VncError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Wraps an async duplex stream with typed big-endian read/write helpers.
/// tokio already retries short reads/writes against `EINTR`/`WouldBlock` at
/// the polling layer; `read_exact`/`write_all` here are about framing a
/// peer's partial writes into whole protocol fields, not about retrying
/// syscalls.
pub struct ByteStream<S> {
    inner: S,
    peeked: Option<u8>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> ByteStream<S> {
    /// Wraps `inner`.
    pub fn new(inner: S) -> Self {
        Self { inner, peeked: None }
    }

    /// Consumes the wrapper, returning the underlying stream.
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Reads one byte without consuming it; a later `read_u8` returns the
    /// same value. Used by the handshake to distinguish protocol messages
    /// that share a leading byte range.
    pub async fn peek_u8(&mut self) -> Result<u8> {
        if let Some(b) = self.peeked {
            return Ok(b);
        }
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf).await.map_err(|e| io_err(e))?;
        self.peeked = Some(buf[0]);
        Ok(buf[0])
    }

    /// Reads one unsigned byte.
    pub async fn read_u8(&mut self) -> Result<u8> {
        if let Some(b) = self.peeked.take() {
            return Ok(b);
        }
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf).await.map_err(io_err)?;
        Ok(buf[0])
    }

    /// Reads a big-endian `u16`.
    pub async fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf).await?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Reads a big-endian `u32`.
    pub async fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf).await?;
        Ok(u32::from_be_bytes(buf))
    }

    /// Reads a big-endian `i32`.
    pub async fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32().await? as i32)
    }

    /// Reads a big-endian `u64`.
    pub async fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf).await?;
        Ok(u64::from_be_bytes(buf))
    }

    /// Fills `buf` entirely, accounting for a byte previously buffered by
    /// `peek_u8`.
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        let mut start = 0;
        if let Some(b) = self.peeked.take() {
            buf[0] = b;
            start = 1;
        }
        if start < buf.len() {
            self.inner.read_exact(&mut buf[start..]).await.map_err(io_err)?;
        }
        Ok(())
    }

    /// Reads `len` bytes into a freshly allocated buffer.
    pub async fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf).await?;
        Ok(buf)
    }

    /// Writes a single byte.
    pub async fn write_u8(&mut self, v: u8) -> Result<()> {
        self.inner.write_all(&[v]).await.map_err(io_err)
    }

    /// Writes a big-endian `u16`.
    pub async fn write_u16(&mut self, v: u16) -> Result<()> {
        self.inner.write_all(&v.to_be_bytes()).await.map_err(io_err)
    }

    /// Writes a big-endian `u32`.
    pub async fn write_u32(&mut self, v: u32) -> Result<()> {
        self.inner.write_all(&v.to_be_bytes()).await.map_err(io_err)
    }

    /// Writes a big-endian `i32`.
    pub async fn write_i32(&mut self, v: i32) -> Result<()> {
        self.write_u32(v as u32).await
    }

    /// Writes raw bytes as-is.
    pub async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.write_all(buf).await.map_err(io_err)
    }

    /// Flushes buffered writes to the transport.
    pub async fn flush(&mut self) -> Result<()> {
        self.inner.flush().await.map_err(io_err)
    }
}

fn io_err(e: std::io::Error) -> VncError {
    if matches!(
        e.kind(),
        std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::BrokenPipe
    ) {
        VncError::TransportClosed
    } else {
        VncError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn round_trip_u32() {
        let (client, mut server) = duplex(64);
        let mut stream = ByteStream::new(client);
        tokio::spawn(async move {
            stream.write_u32(0xDEAD_BEEF).await.unwrap();
        });
        let mut buf = [0u8; 4];
        tokio::io::AsyncReadExt::read_exact(&mut server, &mut buf).await.unwrap();
        assert_eq!(u32::from_be_bytes(buf), 0xDEAD_BEEF);
    }

    #[tokio::test]
    async fn peek_then_read_returns_same_byte() {
        let (mut client, server) = duplex(64);
        tokio::io::AsyncWriteExt::write_all(&mut client, &[0x42]).await.unwrap();
        let mut stream = ByteStream::new(server);
        let peeked = stream.peek_u8().await.unwrap();
        let read = stream.read_u8().await.unwrap();
        assert_eq!(peeked, 0x42);
        assert_eq!(read, 0x42);
    }

    #[tokio::test]
    async fn eof_maps_to_transport_closed() {
        let (client, server) = duplex(64);
        drop(client);
        let mut stream = ByteStream::new(server);
        let err = stream.read_u8().await.unwrap_err();
        assert!(matches!(err, VncError::TransportClosed));
    }
}
