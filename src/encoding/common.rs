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

//! Helpers shared across the RRE/CoRRE/HexTile/TRLE/ZRLE encoders: subrect
//! search, solid-color detection, and format conversion of a whole tile.

use crate::pixelformat::PixelFormat;
use bytes::{Buf, BufMut, BytesMut};

/// A solid-colored subrectangle found within a tile, in the tile's local
/// coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subrect {
    /// Native pixel value (in the tile's source format) of this subrect.
    pub color: u32,
    /// X offset within the tile.
    pub x: u16,
    /// Y offset within the tile.
    pub y: u16,
    /// Width in pixels.
    pub w: u16,
    /// Height in pixels.
    pub h: u16,
}

/// Converts every pixel in `pixels` from `src` to `dst` format, in place
/// semantics via a fresh `Vec`. A no-op copy when the formats match.
#[must_use]
pub fn convert_tile(pixels: &[u32], src: &PixelFormat, dst: &PixelFormat) -> Vec<u32> {
    if src == dst {
        return pixels.to_vec();
    }
    pixels.iter().map(|&px| src.convert(px, dst)).collect()
}

/// Finds a greedy cover of `pixels` (row-major, `width x height`) by
/// solid-colored rectangles, excluding `bg_color`. Each pixel is covered by
/// exactly one subrect. Mirrors RRE/CoRRE's and Hextile's "any subrects"
/// sub-encoding search.
#[must_use]
pub fn find_subrects(pixels: &[u32], width: usize, height: usize, bg_color: u32) -> Vec<Subrect> {
    let mut subrects = Vec::new();
    let mut marked = vec![false; pixels.len()];

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            if marked[idx] || pixels[idx] == bg_color {
                continue;
            }
            let color = pixels[idx];

            let mut max_w = 0;
            for test_x in x..width {
                let test_idx = y * width + test_x;
                if marked[test_idx] || pixels[test_idx] != color {
                    break;
                }
                max_w = test_x - x + 1;
            }

            let mut h = 1;
            'grow_h: for test_y in (y + 1)..height {
                for test_x in x..(x + max_w) {
                    let test_idx = test_y * width + test_x;
                    if marked[test_idx] || pixels[test_idx] != color {
                        break 'grow_h;
                    }
                }
                h = test_y - y + 1;
            }

            let mut best_w = max_w;
            let mut best_h = h;

            let mut max_h = 0;
            for test_y in y..height {
                let test_idx = test_y * width + x;
                if marked[test_idx] || pixels[test_idx] != color {
                    break;
                }
                max_h = test_y - y + 1;
            }

            let mut w2 = 1;
            'grow_w: for test_x in (x + 1)..width {
                for test_y in y..(y + max_h) {
                    let test_idx = test_y * width + test_x;
                    if marked[test_idx] || pixels[test_idx] != color {
                        break 'grow_w;
                    }
                }
                w2 = test_x - x + 1;
            }

            if w2 * max_h > best_w * best_h {
                best_w = w2;
                best_h = max_h;
            }

            for dy in 0..best_h {
                for dx in 0..best_w {
                    marked[(y + dy) * width + (x + dx)] = true;
                }
            }

            subrects.push(Subrect { color, x: x as u16, y: y as u16, w: best_w as u16, h: best_h as u16 });
        }
    }

    subrects
}

/// Classifies a tile as solid (one color), two-color ("mono"), or
/// multicolor, returning `(is_solid, is_mono, background, foreground)`.
/// `foreground` is only meaningful when `is_mono` is true.
#[must_use]
pub fn analyze_tile_colors(pixels: &[u32]) -> (bool, bool, u32, u32) {
    if pixels.is_empty() {
        return (true, true, 0, 0);
    }

    let mut colors = crate::framebuffer::Framebuffer::weight_map(pixels);
    if colors.len() == 1 {
        return (true, true, pixels[0], 0);
    }
    if colors.len() == 2 {
        let mut sorted: Vec<_> = colors.drain().collect();
        sorted.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
        return (false, true, sorted[0].0, sorted[1].0);
    }

    let bg = crate::framebuffer::Framebuffer::background_color(pixels);
    (false, false, bg, 0)
}

/// `Some(color)` if every pixel in `pixels` is identical.
#[must_use]
pub fn check_solid_color(pixels: &[u32]) -> Option<u32> {
    let first = *pixels.first()?;
    pixels.iter().all(|&p| p == first).then_some(first)
}

/// Bytes a CPIXEL occupies on the wire for `format`: 3 when the full
/// pixel is 32 bits wide but only carries <= 24 significant bits (the
/// padding byte is dropped, per RFC 6143 §7.6.1), otherwise the format's
/// normal pixel width.
#[must_use]
pub fn cpixel_size(format: &PixelFormat) -> usize {
    if format.bits_per_pixel == 32 && format.depth <= 24 {
        3
    } else {
        format.bytes_per_pixel()
    }
}

/// Writes one pixel in CPIXEL form: the normal wire encoding with the
/// unused padding byte dropped when `bits_per_pixel == 32 && depth <= 24`.
pub fn write_cpixel(out: &mut BytesMut, px: u32, format: &PixelFormat) {
    if cpixel_size(format) == format.bytes_per_pixel() {
        format.write_pixel(out, px);
        return;
    }
    let mut full = BytesMut::with_capacity(4);
    format.write_pixel(&mut full, px);
    if format.big_endian {
        out.extend_from_slice(&full[1..4]);
    } else {
        out.extend_from_slice(&full[0..3]);
    }
}

/// Reads one CPIXEL-encoded pixel per the same convention as
/// `write_cpixel`.
pub fn read_cpixel(buf: &mut dyn Buf, format: &PixelFormat) -> u32 {
    if cpixel_size(format) == format.bytes_per_pixel() {
        return format.read_pixel(buf);
    }
    let mut bytes = [0u8; 3];
    buf.copy_to_slice(&mut bytes);
    let mut full = [0u8; 4];
    if format.big_endian {
        full[1..4].copy_from_slice(&bytes);
    } else {
        full[0..3].copy_from_slice(&bytes);
    }
    let mut cursor = &full[..];
    format.read_pixel(&mut cursor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_tile_detected() {
        let pixels = vec![7u32; 16];
        assert_eq!(check_solid_color(&pixels), Some(7));
    }

    #[test]
    fn non_solid_tile_returns_none() {
        let pixels = vec![1u32, 2, 1, 1];
        assert_eq!(check_solid_color(&pixels), None);
    }

    #[test]
    fn find_subrects_covers_every_non_background_pixel() {
        #[rustfmt::skip]
        let pixels = vec![
            0u32, 0, 1, 1,
            0, 0, 1, 1,
            2, 2, 0, 0,
            2, 2, 0, 0,
        ];
        let subrects = find_subrects(&pixels, 4, 4, 0);
        let mut covered = vec![false; pixels.len()];
        for s in &subrects {
            for dy in 0..s.h {
                for dx in 0..s.w {
                    let idx = (s.y + dy) as usize * 4 + (s.x + dx) as usize;
                    covered[idx] = true;
                }
            }
        }
        for (idx, &px) in pixels.iter().enumerate() {
            if px != 0 {
                assert!(covered[idx], "pixel {idx} not covered");
            }
        }
    }

    #[test]
    fn analyze_mono_tile() {
        let pixels = vec![1u32, 1, 2, 1];
        let (solid, mono, bg, fg) = analyze_tile_colors(&pixels);
        assert!(!solid);
        assert!(mono);
        assert_eq!(bg, 1);
        assert_eq!(fg, 2);
    }

    #[test]
    fn convert_tile_noop_for_equal_formats() {
        let fmt = PixelFormat::rgba32();
        let pixels = vec![1u32, 2, 3];
        assert_eq!(convert_tile(&pixels, &fmt, &fmt), pixels);
    }

    #[test]
    fn cpixel_size_drops_padding_byte_for_24_bit_depth() {
        let fmt = PixelFormat::rgb32();
        assert_eq!(cpixel_size(&fmt), 3);
    }

    #[test]
    fn cpixel_size_matches_bytes_per_pixel_for_full_depth() {
        let fmt = PixelFormat::rgba32();
        assert_eq!(cpixel_size(&fmt), fmt.bytes_per_pixel());
    }

    #[test]
    fn cpixel_round_trips_24_bit_depth() {
        let fmt = PixelFormat::rgb32();
        let px = fmt.pixel(crate::pixelformat::Color::rgb(200, 100, 50));
        let mut buf = BytesMut::new();
        write_cpixel(&mut buf, px, &fmt);
        assert_eq!(buf.len(), 3);
        let mut cursor = buf.freeze();
        assert_eq!(read_cpixel(&mut cursor, &fmt), px);
    }

    #[test]
    fn cpixel_round_trips_16_bit_format() {
        let fmt = PixelFormat::rgb565();
        let px = fmt.pixel(crate::pixelformat::Color::rgb(10, 20, 30));
        let mut buf = BytesMut::new();
        write_cpixel(&mut buf, px, &fmt);
        assert_eq!(buf.len(), 2);
        let mut cursor = buf.freeze();
        assert_eq!(read_cpixel(&mut cursor, &fmt), px);
    }
}
