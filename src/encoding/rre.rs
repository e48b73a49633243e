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

//! RRE (Rise-and-Run-length Encoding): a background color plus a list of
//! solid-colored subrectangles. Effective for large solid regions, falls
//! back gracefully (every pixel is still represented) on noisy ones.

use super::common::{convert_tile, find_subrects};
use super::{Decoder, Encoder};
use crate::error::{Result, VncError};
use crate::framebuffer::Framebuffer;
use crate::pixelformat::PixelFormat;
use bytes::{Buf, BufMut, BytesMut};

/// RRE encoder/decoder. Stateless.
pub struct RreCodec;

impl Encoder for RreCodec {
    fn encoding_type(&self) -> i32 {
        crate::wire::encoding::RRE
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
        let bg_color = Framebuffer::background_color(&converted);
        let subrects = find_subrects(&converted, width as usize, height as usize, bg_color);

        out.put_u32(subrects.len() as u32);
        dst_format.write_pixel(out, bg_color);
        for s in &subrects {
            dst_format.write_pixel(out, s.color);
            out.put_u16(s.x);
            out.put_u16(s.y);
            out.put_u16(s.w);
            out.put_u16(s.h);
        }
        Ok(())
    }
}

impl Decoder for RreCodec {
    fn encoding_type(&self) -> i32 {
        crate::wire::encoding::RRE
    }

    fn decode(&mut self, buf: &mut dyn Buf, width: u16, height: u16, format: &PixelFormat) -> Result<Vec<u32>> {
        if buf.remaining() < 4 {
            return Err(VncError::ProtocolViolation("truncated RRE header".into()));
        }
        let count = buf.get_u32();
        let bg = format.read_pixel(buf);
        let mut pixels = vec![bg; width as usize * height as usize];

        for _ in 0..count {
            if buf.remaining() < format.bytes_per_pixel() + 8 {
                return Err(VncError::ProtocolViolation("truncated RRE subrect".into()));
            }
            let color = format.read_pixel(buf);
            let x = buf.get_u16();
            let y = buf.get_u16();
            let w = buf.get_u16();
            let h = buf.get_u16();
            for dy in 0..h {
                for dx in 0..w {
                    let px = x + dx;
                    let py = y + dy;
                    if px < width && py < height {
                        pixels[py as usize * width as usize + px as usize] = color;
                    }
                }
            }
        }
        Ok(pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixelformat::Color;

    #[test]
    fn round_trips_a_simple_tile() {
        let fmt = PixelFormat::rgba32();
        let bg = fmt.pixel(Color::rgb(0, 0, 0));
        let fg = fmt.pixel(Color::rgb(255, 0, 0));
        let mut pixels = vec![bg; 16];
        pixels[5] = fg;
        pixels[6] = fg;

        let mut out = BytesMut::new();
        RreCodec.encode(&pixels, 4, 4, &fmt, &fmt, &mut out).unwrap();

        let mut buf = out.freeze();
        let decoded = RreCodec.decode(&mut buf, 4, 4, &fmt).unwrap();
        assert_eq!(decoded, pixels);
    }
}
