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

//! Error types for the RFB core engine.
//!
//! Each variant corresponds to one entry in the engine's error taxonomy:
//! the variant names a recovery policy, not just a cause.

use std::io;
use thiserror::Error;

/// Result type used throughout the engine.
pub type Result<T> = std::result::Result<T, VncError>;

/// Errors that can occur while running the RFB core engine.
#[derive(Debug, Error)]
pub enum VncError {
    /// The remote or local end of a transport closed the connection.
    /// Terminates the session, releases pressed keys, stops workers.
    #[error("transport closed")]
    TransportClosed,

    /// An I/O error occurred on a transport.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A client sent a malformed header, unknown subencoding, or
    /// out-of-range coordinates. The session is closed.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The client only offered encodings the server cannot produce.
    /// Callers fall back to Raw, which is always available.
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(i32),

    /// A `PixelFormat` was constructed with overlapping channel masks or
    /// an unsupported bits-per-pixel value. Rejected at the boundary;
    /// never surfaces inside the engine.
    #[error("invalid pixel format: {0}")]
    InvalidFormat(String),

    /// A worker pool or zlib stream could not allocate required resources.
    /// The session is bounced; the host process stays stable.
    #[error("resource exhausted: {0}")]
    ResourceExhaustion(String),

    /// A clipboard payload exceeded the configured size limit. The payload
    /// is dropped and the session continues.
    #[error("clipboard payload too large: {0} bytes (limit {1})")]
    ClipboardTooLarge(usize, usize),

    /// Authentication failed during the security handshake.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// TLS negotiation failed.
    #[error("TLS error: {0}")]
    Tls(String),
}

impl VncError {
    /// True unless the error is one that a session can recover from and
    /// keep running (currently only an oversized clipboard payload).
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, VncError::ClipboardTooLarge(..))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clipboard_too_large_is_not_fatal() {
        let err = VncError::ClipboardTooLarge(100, 50);
        assert!(!err.is_fatal());
    }

    #[test]
    fn transport_closed_is_fatal() {
        assert!(VncError::TransportClosed.is_fatal());
    }
}
