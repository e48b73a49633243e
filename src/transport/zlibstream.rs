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

//! Persistent zlib deflate/inflate streams.
//!
//! Generalizes the teacher's per-encoding `Compress` fields (one each for
//! Zlib, ZlibHex, ZRLE in `VncClient`) into a single reusable pair of
//! wrappers. The dictionary is never reset between calls: RFC 6143 requires
//! the Zlib family's compressor/decompressor state to persist across
//! rectangles for the lifetime of a connection.

use crate::error::{Result, VncError};
use bytes::{BufMut, BytesMut};
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use std::io;

/// A persistent deflate stream. One instance must be reused for every
/// rectangle of a given encoding across a session's lifetime.
pub struct ZlibEncoder {
    compress: Compress,
}

impl ZlibEncoder {
    /// Creates an encoder at zlib's default compression level.
    #[must_use]
    pub fn new() -> Self {
        Self { compress: Compress::new(Compression::default(), true) }
    }

    /// Compresses `data` with `Z_SYNC_FLUSH`, appending the result (without
    /// a length prefix) to `out`. Callers that need the RFB-framed form
    /// (4-byte big-endian length + payload) wrap this with
    /// `encode_framed`.
    pub fn encode_into(&mut self, data: &[u8], out: &mut BytesMut) -> Result<()> {
        let max_len = data.len() + data.len() / 1000 + 12;
        let mut scratch = vec![0u8; max_len];
        let previous_in = self.compress.total_in();
        let previous_out = self.compress.total_out();
        self.compress
            .compress(data, &mut scratch, FlushCompress::Sync)
            .map_err(|e| VncError::ResourceExhaustion(format!("zlib compress: {e}")))?;
        let produced = (self.compress.total_out() - previous_out) as usize;
        let consumed = (self.compress.total_in() - previous_in) as usize;
        if consumed < data.len() {
            return Err(VncError::ResourceExhaustion(format!("zlib: incomplete compression {consumed}/{}", data.len())));
        }
        out.extend_from_slice(&scratch[..produced]);
        Ok(())
    }

    /// Compresses `data`, prefixing the result with its 4-byte big-endian
    /// length, matching the Zlib/ZlibHex wire framing.
    pub fn encode_framed(&mut self, data: &[u8]) -> Result<BytesMut> {
        let mut payload = BytesMut::new();
        self.encode_into(data, &mut payload)?;
        let mut out = BytesMut::with_capacity(4 + payload.len());
        out.put_u32(payload.len() as u32);
        out.extend_from_slice(&payload);
        Ok(out)
    }
}

impl Default for ZlibEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// A persistent inflate stream, the decode-side counterpart of
/// `ZlibEncoder`.
pub struct ZlibDecoder {
    decompress: Decompress,
}

impl ZlibDecoder {
    /// Creates a decoder expecting a zlib header on the first call.
    #[must_use]
    pub fn new() -> Self {
        Self { decompress: Decompress::new(true) }
    }

    /// Inflates `data` (a full deflate block as produced by `encode_into`)
    /// into `out`.
    pub fn decode_into(&mut self, data: &[u8], out: &mut Vec<u8>) -> Result<()> {
        let start_len = out.len();
        let mut scratch = vec![0u8; (data.len() * 4).max(4096)];
        let start_in = self.decompress.total_in();
        loop {
            let before_out = self.decompress.total_out();
            let status = self
                .decompress
                .decompress(data, &mut scratch, FlushDecompress::Sync)
                .map_err(|e| VncError::ResourceExhaustion(format!("zlib decompress: {e}")))?;
            let produced = (self.decompress.total_out() - before_out) as usize;
            out.extend_from_slice(&scratch[..produced]);
            let consumed = (self.decompress.total_in() - start_in) as usize;
            if matches!(status, Status::StreamEnd) || consumed >= data.len() {
                break;
            }
            scratch = vec![0u8; scratch.len() * 2];
        }
        if out.len() == start_len && !data.is_empty() {
            return Err(VncError::ResourceExhaustion("zlib: decompression produced no output".into()));
        }
        Ok(())
    }
}

impl Default for ZlibDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot helper matching `flate2`'s own error type, kept distinct from
/// `VncError::Io` since callers treat resource exhaustion differently.
pub fn io_error_from_status(status: Status) -> io::Error {
    io::Error::other(format!("zlib status {status:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encoder_and_decoder() {
        let mut enc = ZlibEncoder::new();
        let mut dec = ZlibDecoder::new();
        let data = b"hello hello hello hello hello world".repeat(8);
        let mut compressed = BytesMut::new();
        enc.encode_into(&data, &mut compressed).unwrap();
        let mut out = Vec::new();
        dec.decode_into(&compressed, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn persists_dictionary_across_calls() {
        let mut enc = ZlibEncoder::new();
        let mut dec = ZlibDecoder::new();
        let mut decoded = Vec::new();
        for _ in 0..3 {
            let data = b"repeated payload for dictionary reuse".to_vec();
            let mut compressed = BytesMut::new();
            enc.encode_into(&data, &mut compressed).unwrap();
            dec.decode_into(&compressed, &mut decoded).unwrap();
        }
        assert_eq!(decoded.len(), "repeated payload for dictionary reuse".len() * 3);
    }

    #[test]
    fn framed_encode_includes_length_prefix() {
        let mut enc = ZlibEncoder::new();
        let framed = enc.encode_framed(b"abc").unwrap();
        let len = u32::from_be_bytes(framed[0..4].try_into().unwrap()) as usize;
        assert_eq!(framed.len(), 4 + len);
    }
}
