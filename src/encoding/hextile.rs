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

//! HexTile: splits a rectangle into 16x16 tiles, each independently raw,
//! solid, monochrome-with-subrects, or colored-with-subrects. Background
//! and foreground colors carry over between tiles unless a tile's
//! subencoding byte says otherwise (RFC 6143 §7.7.3).

use super::common::{analyze_tile_colors, convert_tile, find_subrects};
use super::{Decoder, Encoder};
use crate::error::{Result, VncError};
use crate::pixelformat::PixelFormat;
use crate::wire::hextile_flag as flag;
use bytes::{Buf, BufMut, BytesMut};

const TILE: u16 = 16;

/// HexTile encoder/decoder. `last_bg`/`last_fg` persist across calls, as
/// the wire format requires: a tile only repeats a color that changed
/// since the previous tile in the same rectangle stream.
pub struct HextileCodec {
    last_bg: Option<u32>,
    last_fg: Option<u32>,
}

impl HextileCodec {
    /// Creates a codec with no carried-over background/foreground.
    #[must_use]
    pub fn new() -> Self {
        Self { last_bg: None, last_fg: None }
    }

    /// Resets carried-over state. Call between unrelated rectangles (the
    /// wire format itself resets implicitly at each `FramebufferUpdate`'s
    /// first tile only if the server chooses to; this engine resets per
    /// rectangle for predictability).
    pub fn reset(&mut self) {
        self.last_bg = None;
        self.last_fg = None;
    }
}

impl Default for HextileCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder for HextileCodec {
    fn encoding_type(&self) -> i32 {
        crate::wire::encoding::HEXTILE
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
        self.reset();
        let converted = convert_tile(pixels, src_format, dst_format);

        for tile_y in (0..height).step_by(TILE as usize) {
            for tile_x in (0..width).step_by(TILE as usize) {
                let tw = TILE.min(width - tile_x);
                let th = TILE.min(height - tile_y);
                let tile_pixels = extract_subtile(&converted, width, tile_x, tile_y, tw, th);
                self.encode_tile(&tile_pixels, tw, th, dst_format, out);
            }
        }
        Ok(())
    }
}

impl HextileCodec {
    fn encode_tile(&mut self, tile_pixels: &[u32], tw: u16, th: u16, format: &PixelFormat, out: &mut BytesMut) {
        let (is_solid, is_mono, bg, fg) = analyze_tile_colors(tile_pixels);
        let mut subencoding: u8 = 0;
        let tile_start = out.len();
        out.put_u8(0);

        if is_solid {
            if Some(bg) != self.last_bg {
                subencoding |= flag::BACKGROUND_SPECIFIED;
                format.write_pixel(out, bg);
                self.last_bg = Some(bg);
            }
            out[tile_start] = subencoding;
            return;
        }

        let subrects = find_subrects(tile_pixels, tw as usize, th as usize, bg);
        let raw_size = tile_pixels.len() * format.bytes_per_pixel();
        let bg_overhead = if Some(bg) == self.last_bg { 0 } else { format.bytes_per_pixel() };
        let fg_overhead = if is_mono && Some(fg) != self.last_fg { format.bytes_per_pixel() } else { 0 };
        let per_subrect = if is_mono { 2 } else { 2 + format.bytes_per_pixel() };
        let encoded_size = bg_overhead + fg_overhead + 1 + subrects.len() * per_subrect;

        if subrects.is_empty() || subrects.len() > 255 || encoded_size > raw_size {
            out.truncate(tile_start);
            out.put_u8(flag::RAW);
            for &px in tile_pixels {
                format.write_pixel(out, px);
            }
            self.last_bg = None;
            self.last_fg = None;
            return;
        }

        if Some(bg) != self.last_bg {
            subencoding |= flag::BACKGROUND_SPECIFIED;
            format.write_pixel(out, bg);
            self.last_bg = Some(bg);
        }
        subencoding |= flag::ANY_SUBRECTS;

        if is_mono {
            if Some(fg) != self.last_fg {
                subencoding |= flag::FOREGROUND_SPECIFIED;
                format.write_pixel(out, fg);
                self.last_fg = Some(fg);
            }
            out.put_u8(subrects.len() as u8);
            for sr in &subrects {
                out.put_u8(((sr.x as u8) << 4) | (sr.y as u8));
                out.put_u8((((sr.w - 1) as u8) << 4) | ((sr.h - 1) as u8));
            }
        } else {
            subencoding |= flag::SUBRECTS_COLOURED;
            self.last_fg = None;
            out.put_u8(subrects.len() as u8);
            for sr in &subrects {
                format.write_pixel(out, sr.color);
                out.put_u8(((sr.x as u8) << 4) | (sr.y as u8));
                out.put_u8((((sr.w - 1) as u8) << 4) | ((sr.h - 1) as u8));
            }
        }
        out[tile_start] = subencoding;
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

impl Decoder for HextileCodec {
    fn encoding_type(&self) -> i32 {
        crate::wire::encoding::HEXTILE
    }

    fn decode(&mut self, buf: &mut dyn Buf, width: u16, height: u16, format: &PixelFormat) -> Result<Vec<u32>> {
        self.reset();
        let mut pixels = vec![0u32; width as usize * height as usize];

        for tile_y in (0..height).step_by(TILE as usize) {
            for tile_x in (0..width).step_by(TILE as usize) {
                let tw = TILE.min(width - tile_x);
                let th = TILE.min(height - tile_y);
                self.decode_tile(buf, tile_x, tile_y, tw, th, width, format, &mut pixels)?;
            }
        }
        Ok(pixels)
    }
}

impl HextileCodec {
    #[allow(clippy::too_many_arguments)]
    fn decode_tile(
        &mut self,
        buf: &mut dyn Buf,
        tile_x: u16,
        tile_y: u16,
        tw: u16,
        th: u16,
        stride: u16,
        format: &PixelFormat,
        pixels: &mut [u32],
    ) -> Result<()> {
        if !buf.has_remaining() {
            return Err(VncError::ProtocolViolation("truncated HexTile subencoding".into()));
        }
        let subencoding = buf.get_u8();

        if subencoding & flag::RAW != 0 {
            for dy in 0..th {
                for dx in 0..tw {
                    let px = format.read_pixel(buf);
                    pixels[(tile_y + dy) as usize * stride as usize + (tile_x + dx) as usize] = px;
                }
            }
            self.last_bg = None;
            self.last_fg = None;
            return Ok(());
        }

        if subencoding & flag::BACKGROUND_SPECIFIED != 0 {
            self.last_bg = Some(format.read_pixel(buf));
        }
        let bg = self.last_bg.unwrap_or(0);
        for dy in 0..th {
            for dx in 0..tw {
                pixels[(tile_y + dy) as usize * stride as usize + (tile_x + dx) as usize] = bg;
            }
        }

        if subencoding & flag::FOREGROUND_SPECIFIED != 0 {
            self.last_fg = Some(format.read_pixel(buf));
        }

        if subencoding & flag::ANY_SUBRECTS != 0 {
            if !buf.has_remaining() {
                return Err(VncError::ProtocolViolation("truncated HexTile subrect count".into()));
            }
            let count = buf.get_u8();
            let colored = subencoding & flag::SUBRECTS_COLOURED != 0;
            let fg = self.last_fg.unwrap_or(0);
            for _ in 0..count {
                let color = if colored { format.read_pixel(buf) } else { fg };
                if !buf.has_remaining() {
                    return Err(VncError::ProtocolViolation("truncated HexTile subrect".into()));
                }
                let xy = buf.get_u8();
                let wh = buf.get_u8();
                let sx = xy >> 4;
                let sy = xy & 0x0f;
                let sw = (wh >> 4) + 1;
                let sh = (wh & 0x0f) + 1;
                for dy in 0..sh {
                    for dx in 0..sw {
                        let px = tile_x + u16::from(sx) + u16::from(dx);
                        let py = tile_y + u16::from(sy) + u16::from(dy);
                        pixels[py as usize * stride as usize + px as usize] = color;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixelformat::Color;

    #[test]
    fn round_trips_solid_tile() {
        let fmt = PixelFormat::rgba32();
        let pixels = vec![fmt.pixel(Color::rgb(5, 5, 5)); 16 * 16];
        let mut out = BytesMut::new();
        HextileCodec::new().encode(&pixels, 16, 16, &fmt, &fmt, &mut out).unwrap();
        let mut buf = out.freeze();
        let decoded = HextileCodec::new().decode(&mut buf, 16, 16, &fmt).unwrap();
        assert_eq!(decoded, pixels);
    }

    #[test]
    fn round_trips_mixed_tile_with_subrects() {
        let fmt = PixelFormat::rgba32();
        let bg = fmt.pixel(Color::rgb(0, 0, 0));
        let fg = fmt.pixel(Color::rgb(255, 255, 255));
        let mut pixels = vec![bg; 32 * 16];
        for i in 0..8 {
            pixels[i] = fg;
        }
        let mut out = BytesMut::new();
        HextileCodec::new().encode(&pixels, 32, 16, &fmt, &fmt, &mut out).unwrap();
        let mut buf = out.freeze();
        let decoded = HextileCodec::new().decode(&mut buf, 32, 16, &fmt).unwrap();
        assert_eq!(decoded, pixels);
    }

    #[test]
    fn round_trips_noisy_tile_as_raw() {
        let fmt = PixelFormat::rgba32();
        let pixels: Vec<u32> = (0..256).map(|i| fmt.pixel(Color::rgb(i as u8, (i * 3) as u8, (i * 7) as u8))).collect();
        let mut out = BytesMut::new();
        HextileCodec::new().encode(&pixels, 16, 16, &fmt, &fmt, &mut out).unwrap();
        let mut buf = out.freeze();
        let decoded = HextileCodec::new().decode(&mut buf, 16, 16, &fmt).unwrap();
        assert_eq!(decoded, pixels);
    }
}
