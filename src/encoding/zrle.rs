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

//! ZRLE (Zlib Run-Length Encoding): 64x64 tiles, each sent as solid,
//! raw, plain-RLE, packed-palette, or packed-palette-RLE, the whole
//! rectangle's tile stream then deflated as one block with a persistent
//! compressor (RFC 6143 §7.7.6).

use super::common::{convert_tile, read_cpixel, write_cpixel};
use super::trle::{decode_tile_body, encode_tile_body};
use super::{Decoder, Encoder};
use crate::error::{Result, VncError};
use crate::pixelformat::PixelFormat;
use crate::transport::zlibstream::{ZlibDecoder, ZlibEncoder};
use bytes::{Buf, BytesMut};

const TILE: u16 = 64;

/// ZRLE encoder/decoder. Holds the persistent zlib stream that must
/// survive across every rectangle of a session.
pub struct ZrleCodec {
    encoder: ZlibEncoder,
    decoder: ZlibDecoder,
}

impl ZrleCodec {
    /// Creates a codec with fresh zlib state.
    #[must_use]
    pub fn new() -> Self {
        Self { encoder: ZlibEncoder::new(), decoder: ZlibDecoder::new() }
    }
}

impl Default for ZrleCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder for ZrleCodec {
    fn encoding_type(&self) -> i32 {
        crate::wire::encoding::ZRLE
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
        let converted = convert_tile(pixels, src_format, dst_format);
        let mut plain = BytesMut::new();
        for tile_y in (0..height).step_by(TILE as usize) {
            for tile_x in (0..width).step_by(TILE as usize) {
                let tw = TILE.min(width - tile_x);
                let th = TILE.min(height - tile_y);
                let tile_pixels = extract_subtile(&converted, width, tile_x, tile_y, tw, th);
                encode_tile_body(&mut plain, &tile_pixels, tw, th, dst_format, write_cpixel);
            }
        }
        let framed = self.encoder.encode_framed(&plain)?;
        out.extend_from_slice(&framed);
        Ok(())
    }
}

impl Decoder for ZrleCodec {
    fn encoding_type(&self) -> i32 {
        crate::wire::encoding::ZRLE
    }

    fn decode(&mut self, buf: &mut dyn Buf, width: u16, height: u16, format: &PixelFormat) -> Result<Vec<u32>> {
        if buf.remaining() < 4 {
            return Err(VncError::ProtocolViolation("truncated ZRLE length prefix".into()));
        }
        let len = buf.get_u32() as usize;
        if buf.remaining() < len {
            return Err(VncError::ProtocolViolation("truncated ZRLE payload".into()));
        }
        let mut compressed = vec![0u8; len];
        buf.copy_to_slice(&mut compressed);
        let mut plain = Vec::new();
        self.decoder.decode_into(&compressed, &mut plain)?;

        let mut cursor = bytes::Bytes::from(plain);
        let mut pixels = vec![0u32; width as usize * height as usize];
        for tile_y in (0..height).step_by(TILE as usize) {
            for tile_x in (0..width).step_by(TILE as usize) {
                let tw = TILE.min(width - tile_x);
                let th = TILE.min(height - tile_y);
                let tile = decode_tile_body(&mut cursor, tw, th, format, read_cpixel)?;
                place_subtile(&mut pixels, width, tile_x, tile_y, tw, th, &tile);
            }
        }
        Ok(pixels)
    }
}

fn extract_subtile(pixels: &[u32], stride: u16, x: u16, y: u16, w: u16, h: u16) -> Vec<u32> {
    let mut out = Vec::with_capacity(w as usize * h as usize);
    for dy in 0..h {
        let row_start = (y + dy) as usize * stride as usize + x as usize;
        out.extend_from_slice(&pixels[row_start..row_start + w as usize]);
    }
    out
}

fn place_subtile(pixels: &mut [u32], stride: u16, x: u16, y: u16, w: u16, h: u16, tile: &[u32]) {
    for dy in 0..h {
        let row_start = (y + dy) as usize * stride as usize + x as usize;
        let tile_row = &tile[(dy as usize * w as usize)..(dy as usize * w as usize + w as usize)];
        pixels[row_start..row_start + w as usize].copy_from_slice(tile_row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixelformat::Color;

    #[test]
    fn round_trips_a_rectangle_spanning_multiple_tiles() {
        let fmt = PixelFormat::rgba32();
        let mut pixels = vec![fmt.pixel(Color::rgb(0, 0, 0)); 128 * 65];
        for i in 0..200 {
            pixels[i] = fmt.pixel(Color::rgb(i as u8, 255, 0));
        }
        let mut enc = ZrleCodec::new();
        let mut dec = ZrleCodec::new();
        let mut out = BytesMut::new();
        enc.encode(&pixels, 128, 65, &fmt, &fmt, &mut out).unwrap();
        let mut buf = out.freeze();
        let decoded = dec.decode(&mut buf, 128, 65, &fmt).unwrap();
        assert_eq!(decoded, pixels);
    }
}
