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

//! CoRRE (Compact RRE): RRE with u8 subrectangle coordinates, valid only
//! for tiles up to 255x255 pixels.

use super::common::{convert_tile, find_subrects};
use super::{Decoder, Encoder};
use crate::error::{Result, VncError};
use crate::framebuffer::Framebuffer;
use crate::pixelformat::PixelFormat;
use bytes::{Buf, BufMut, BytesMut};

/// CoRRE encoder/decoder. Stateless.
pub struct CorreCodec;

impl Encoder for CorreCodec {
    fn encoding_type(&self) -> i32 {
        crate::wire::encoding::CORRE
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
        if width > 255 || height > 255 {
            return Err(VncError::ProtocolViolation("CoRRE tile exceeds 255x255".into()));
        }
        let converted = convert_tile(pixels, src_format, dst_format);
        let bg_color = Framebuffer::background_color(&converted);
        let subrects = find_subrects(&converted, width as usize, height as usize, bg_color);

        out.put_u32(subrects.len() as u32);
        dst_format.write_pixel(out, bg_color);
        for s in &subrects {
            dst_format.write_pixel(out, s.color);
            out.put_u8(s.x as u8);
            out.put_u8(s.y as u8);
            out.put_u8(s.w as u8);
            out.put_u8(s.h as u8);
        }
        Ok(())
    }
}

impl Decoder for CorreCodec {
    fn encoding_type(&self) -> i32 {
        crate::wire::encoding::CORRE
    }

    fn decode(&mut self, buf: &mut dyn Buf, width: u16, height: u16, format: &PixelFormat) -> Result<Vec<u32>> {
        if buf.remaining() < 4 {
            return Err(VncError::ProtocolViolation("truncated CoRRE header".into()));
        }
        let count = buf.get_u32();
        let bg = format.read_pixel(buf);
        let mut pixels = vec![bg; width as usize * height as usize];

        for _ in 0..count {
            if buf.remaining() < format.bytes_per_pixel() + 4 {
                return Err(VncError::ProtocolViolation("truncated CoRRE subrect".into()));
            }
            let color = format.read_pixel(buf);
            let x = u16::from(buf.get_u8());
            let y = u16::from(buf.get_u8());
            let w = u16::from(buf.get_u8());
            let h = u16::from(buf.get_u8());
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
        let bg = fmt.pixel(Color::rgb(10, 10, 10));
        let fg = fmt.pixel(Color::rgb(200, 0, 0));
        let mut pixels = vec![bg; 16];
        pixels[0] = fg;

        let mut out = BytesMut::new();
        CorreCodec.encode(&pixels, 4, 4, &fmt, &fmt, &mut out).unwrap();
        let mut buf = out.freeze();
        let decoded = CorreCodec.decode(&mut buf, 4, 4, &fmt).unwrap();
        assert_eq!(decoded, pixels);
    }

    #[test]
    fn rejects_oversized_tile() {
        let fmt = PixelFormat::rgba32();
        let pixels = vec![0u32; 4];
        let mut out = BytesMut::new();
        assert!(CorreCodec.encode(&pixels, 256, 1, &fmt, &fmt, &mut out).is_err());
    }
}
