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

//! Zlib encoding: Raw pixel data wrapped in a persistent deflate stream,
//! length-prefixed per rectangle (RFC 6143 §7.7.4).

use super::raw::RawCodec;
use super::{Decoder, Encoder};
use crate::error::{Result, VncError};
use crate::pixelformat::PixelFormat;
use crate::transport::zlibstream::{ZlibDecoder, ZlibEncoder};
use bytes::{Buf, BufMut, BytesMut};

/// Zlib codec: a persistent compressor/decompressor pair wrapping Raw
/// pixel data. Must be reused across every rectangle of a session, since
/// the dictionary is never reset.
pub struct ZlibCodec {
    encoder: ZlibEncoder,
    decoder: ZlibDecoder,
}

impl ZlibCodec {
    /// Creates a codec with fresh compression/decompression state.
    #[must_use]
    pub fn new() -> Self {
        Self { encoder: ZlibEncoder::new(), decoder: ZlibDecoder::new() }
    }
}

impl Default for ZlibCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder for ZlibCodec {
    fn encoding_type(&self) -> i32 {
        crate::wire::encoding::ZLIB
    }

    fn encode(
        &mut self,
        pixels: &[u32],
        width: u16,
        height: u16,
        src_format: &PixelFormat,
        dst_format: &PixelFormat,
        out: &mut BytesMut,
    ) -> Result<()> {
        let mut raw = BytesMut::new();
        RawCodec.encode(pixels, width, height, src_format, dst_format, &mut raw)?;
        let framed = self.encoder.encode_framed(&raw)?;
        out.extend_from_slice(&framed);
        Ok(())
    }
}

impl Decoder for ZlibCodec {
    fn encoding_type(&self) -> i32 {
        crate::wire::encoding::ZLIB
    }

    fn decode(&mut self, buf: &mut dyn Buf, width: u16, height: u16, format: &PixelFormat) -> Result<Vec<u32>> {
        if buf.remaining() < 4 {
            return Err(VncError::ProtocolViolation("truncated Zlib length prefix".into()));
        }
        let len = buf.get_u32() as usize;
        if buf.remaining() < len {
            return Err(VncError::ProtocolViolation("truncated Zlib payload".into()));
        }
        let mut compressed = vec![0u8; len];
        buf.copy_to_slice(&mut compressed);
        let mut raw = Vec::new();
        self.decoder.decode_into(&compressed, &mut raw)?;

        let mut raw_buf = bytes::Bytes::from(raw);
        RawCodec.decode(&mut raw_buf, width, height, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixelformat::Color;

    #[test]
    fn round_trips_through_zlib() {
        let fmt = PixelFormat::rgba32();
        let pixels = vec![fmt.pixel(Color::rgb(1, 2, 3)); 64];
        let mut codec_enc = ZlibCodec::new();
        let mut codec_dec = ZlibCodec::new();
        let mut out = BytesMut::new();
        codec_enc.encode(&pixels, 8, 8, &fmt, &fmt, &mut out).unwrap();
        let mut buf = out.freeze();
        let decoded = codec_dec.decode(&mut buf, 8, 8, &fmt).unwrap();
        assert_eq!(decoded, pixels);
    }
}
