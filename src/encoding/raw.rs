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

//! Raw encoding: pixel data sent as-is, with no compression. Always
//! available, used as the fallback when a client offers nothing else.

use super::{Decoder, Encoder};
use crate::error::Result;
use crate::pixelformat::PixelFormat;
use bytes::{Buf, BytesMut};

/// Raw encoder/decoder. Holds no state, so one instance serves both
/// directions.
pub struct RawCodec;

impl Encoder for RawCodec {
    fn encoding_type(&self) -> i32 {
        crate::wire::encoding::RAW
    }

    fn encode(
        &mut self,
        pixels: &[u32],
        _width: u16,
        _height: u16,
        src_format: &PixelFormat,
        dst_format: &PixelFormat,
        out: &mut BytesMut,
    ) -> Result<()> {
        out.reserve(pixels.len() * dst_format.bytes_per_pixel());
        for &px in pixels {
            let converted = if src_format == dst_format { px } else { src_format.convert(px, dst_format) };
            dst_format.write_pixel(out, converted);
        }
        Ok(())
    }
}

impl Decoder for RawCodec {
    fn encoding_type(&self) -> i32 {
        crate::wire::encoding::RAW
    }

    fn decode(&mut self, buf: &mut dyn Buf, width: u16, height: u16, format: &PixelFormat) -> Result<Vec<u32>> {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count);
        for _ in 0..count {
            pixels.push(format.read_pixel(buf));
        }
        Ok(pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixelformat::Color;

    #[test]
    fn encode_then_decode_round_trips() {
        let format = PixelFormat::rgba32();
        let pixels = vec![format.pixel(Color::rgb(10, 20, 30)), format.pixel(Color::rgb(40, 50, 60))];
        let mut out = BytesMut::new();
        RawCodec.encode(&pixels, 2, 1, &format, &format, &mut out).unwrap();

        let mut buf = out.freeze();
        let decoded = RawCodec.decode(&mut buf, 2, 1, &format).unwrap();
        assert_eq!(decoded, pixels);
    }

    #[test]
    fn encode_converts_between_formats() {
        let src = PixelFormat::rgba32();
        let dst = PixelFormat::rgb565();
        let pixels = vec![src.pixel(Color::rgb(255, 0, 0))];
        let mut out = BytesMut::new();
        RawCodec.encode(&pixels, 1, 1, &src, &dst, &mut out).unwrap();
        assert_eq!(out.len(), dst.bytes_per_pixel());
    }
}
