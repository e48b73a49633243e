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

//! Pixel storage: pitch-based framebuffer, sub-views, run extraction.

use crate::font;
use crate::geometry::Region;
use crate::pixelformat::{Color, PixelFormat};
use std::collections::HashMap;

/// A single maximal horizontal run of one pixel value, as produced by
/// `Framebuffer::extract_runs`. Used by RRE/CoRRE/Hextile subrect search
/// and by the RLE-ish tile encoders in the `encoding` module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelLengthRun {
    /// Pixel value in the framebuffer's native format.
    pub pixel: u32,
    /// Number of consecutive pixels carrying this value.
    pub length: u32,
}

/// Pixel storage backing a server or a client-observed screen: a flat byte
/// buffer addressed by pitch (bytes per row), not necessarily
/// `width * bytes_per_pixel` when padded.
pub struct Framebuffer {
    width: u16,
    height: u16,
    format: PixelFormat,
    pitch: usize,
    data: Vec<u8>,
}

impl Framebuffer {
    /// Allocates a zero-filled framebuffer with pitch equal to the tightest
    /// possible row size.
    #[must_use]
    pub fn new(width: u16, height: u16, format: PixelFormat) -> Self {
        let pitch = width as usize * format.bytes_per_pixel();
        Self { width, height, format, pitch, data: vec![0u8; pitch * height as usize] }
    }

    /// Wraps existing pixel data owned elsewhere, without copying, using an
    /// explicit pitch (may exceed the tight row size when the source is
    /// padded, e.g. a captured X11 shm image).
    pub fn from_owned(width: u16, height: u16, format: PixelFormat, pitch: usize, data: Vec<u8>) -> Self {
        assert!(pitch >= width as usize * format.bytes_per_pixel());
        assert!(data.len() >= pitch * height as usize);
        Self { width, height, format, pitch, data }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// The pixel format describing this buffer's byte layout.
    #[must_use]
    pub fn format(&self) -> &PixelFormat {
        &self.format
    }

    /// Bytes between the start of consecutive rows.
    #[must_use]
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// Raw backing bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whole-buffer region, handy for "everything changed" updates.
    #[must_use]
    pub fn bounds(&self) -> Region {
        Region::new(0, 0, self.width, self.height)
    }

    fn offset(&self, x: u16, y: u16) -> usize {
        y as usize * self.pitch + x as usize * self.format.bytes_per_pixel()
    }

    /// Reads the native pixel value at `(x, y)`.
    #[must_use]
    pub fn get_pixel(&self, x: u16, y: u16) -> u32 {
        let bpp = self.format.bytes_per_pixel();
        let off = self.offset(x, y);
        let mut buf = &self.data[off..off + bpp];
        self.format.read_pixel(&mut buf)
    }

    /// Writes the native pixel value at `(x, y)`.
    pub fn set_pixel(&mut self, x: u16, y: u16, pixel: u32) {
        let bpp = self.format.bytes_per_pixel();
        let off = self.offset(x, y);
        let mut slice = &mut self.data[off..off + bpp];
        self.format.write_pixel(&mut slice, pixel);
    }

    /// Fills `region` (clipped to the buffer) with a solid color.
    pub fn draw_rect(&mut self, region: Region, color: Color) {
        let clipped = region.intersect(&self.bounds());
        if clipped.is_empty() {
            return;
        }
        let pixel = self.format.pixel(color);
        for y in clipped.y as u16..clipped.y as u16 + clipped.height {
            for x in clipped.x as u16..clipped.x as u16 + clipped.width {
                self.set_pixel(x, y, pixel);
            }
        }
    }

    /// Copies a rectangular region from `src` into `self` at `(dst_x,
    /// dst_y)`, converting pixel formats if they differ. Mirrors the
    /// CopyRect source-then-paste shape used by screen capture.
    pub fn blit_region(&mut self, src: &Framebuffer, src_region: Region, dst_x: u16, dst_y: u16) {
        let src_clip = src_region.intersect(&src.bounds());
        if src_clip.is_empty() {
            return;
        }
        let same_format = src.format == self.format;
        for dy in 0..src_clip.height {
            for dx in 0..src_clip.width {
                let sx = src_clip.x as u16 + dx;
                let sy = src_clip.y as u16 + dy;
                let tx = dst_x + dx;
                let ty = dst_y + dy;
                if tx >= self.width || ty >= self.height {
                    continue;
                }
                let px = src.get_pixel(sx, sy);
                let px = if same_format { px } else { src.format.convert(px, &self.format) };
                self.set_pixel(tx, ty, px);
            }
        }
    }

    /// Returns a read-only sub-view over `region` (clipped to the buffer),
    /// as a row-major `Vec<u32>` of native pixel values. Used as the
    /// per-tile input to the encoding library.
    #[must_use]
    pub fn extract_tile(&self, region: Region) -> Vec<u32> {
        let clip = region.intersect(&self.bounds());
        let mut out = Vec::with_capacity(clip.width as usize * clip.height as usize);
        for y in 0..clip.height {
            for x in 0..clip.width {
                out.push(self.get_pixel(clip.x as u16 + x, clip.y as u16 + y));
            }
        }
        out
    }

    /// Splits one row of `width` native pixel values into maximal runs of
    /// equal value. Grounds RRE/CoRRE/Hextile subrect search and the ZRLE/
    /// TRLE plain-RLE sub-encoding.
    #[must_use]
    pub fn extract_runs(row: &[u32]) -> Vec<PixelLengthRun> {
        let mut runs = Vec::new();
        let mut iter = row.iter();
        if let Some(&first) = iter.next() {
            let mut current = first;
            let mut length = 1u32;
            for &px in iter {
                if px == current {
                    length += 1;
                } else {
                    runs.push(PixelLengthRun { pixel: current, length });
                    current = px;
                    length = 1;
                }
            }
            runs.push(PixelLengthRun { pixel: current, length });
        }
        runs
    }

    /// Builds a frequency-ordered palette (most common color first) from a
    /// tile's native pixel values, for palette-based tile sub-encodings.
    #[must_use]
    pub fn palette(pixels: &[u32]) -> Vec<u32> {
        let mut counts: HashMap<u32, usize> = HashMap::new();
        for &px in pixels {
            *counts.entry(px).or_insert(0) += 1;
        }
        let mut palette: Vec<_> = counts.into_iter().collect();
        palette.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
        palette.into_iter().map(|(color, _)| color).collect()
    }

    /// Builds a color -> pixel-count weight map, used to pick a tile's
    /// background color (the most frequent value).
    #[must_use]
    pub fn weight_map(pixels: &[u32]) -> HashMap<u32, usize> {
        let mut counts = HashMap::new();
        for &px in pixels {
            *counts.entry(px).or_insert(0) += 1;
        }
        counts
    }

    /// The single most frequent pixel value in `pixels`, used as a tile's
    /// background color. Returns 0 for an empty slice.
    #[must_use]
    pub fn background_color(pixels: &[u32]) -> u32 {
        let weights = Self::weight_map(pixels);
        weights.into_iter().max_by_key(|(_, count)| *count).map(|(color, _)| color).unwrap_or(0)
    }

    /// Draws `text` starting at `(x, y)` using the built-in 8x16 banner
    /// font, clipped to the buffer.
    pub fn draw_text(&mut self, x: u16, y: u16, text: &str, fg: Color, bg: Option<Color>) {
        let fg_px = self.format.pixel(fg);
        let bg_px = bg.map(|c| self.format.pixel(c));
        for (i, ch) in text.chars().enumerate() {
            let glyph = font::glyph(ch);
            let gx = x as u32 + i as u32 * font::GLYPH_WIDTH;
            for row in 0..font::GLYPH_HEIGHT {
                let py = y as u32 + row;
                if py >= self.height as u32 {
                    break;
                }
                for col in 0..font::GLYPH_WIDTH {
                    let px = gx + col;
                    if px >= self.width as u32 {
                        continue;
                    }
                    if font::glyph_pixel(glyph, row, col) {
                        self.set_pixel(px as u16, py as u16, fg_px);
                    } else if let Some(bg_px) = bg_px {
                        self.set_pixel(px as u16, py as u16, bg_px);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_zeroed() {
        let fb = Framebuffer::new(4, 4, PixelFormat::rgba32());
        assert_eq!(fb.get_pixel(0, 0), 0);
        assert_eq!(fb.get_pixel(3, 3), 0);
    }

    #[test]
    fn draw_rect_fills_clipped_area() {
        let mut fb = Framebuffer::new(4, 4, PixelFormat::rgba32());
        fb.draw_rect(Region::new(1, 1, 10, 10), Color::rgb(255, 0, 0));
        assert_eq!(fb.get_pixel(0, 0), 0);
        let px = fb.get_pixel(1, 1);
        assert_eq!(fb.format().color(px), Color::rgb(255, 0, 0));
        let px3 = fb.get_pixel(3, 3);
        assert_eq!(fb.format().color(px3), Color::rgb(255, 0, 0));
    }

    #[test]
    fn blit_region_converts_formats() {
        let mut src = Framebuffer::new(2, 2, PixelFormat::rgba32());
        src.draw_rect(src.bounds(), Color::rgb(0, 255, 0));
        let mut dst = Framebuffer::new(2, 2, PixelFormat::rgb565());
        dst.blit_region(&src, src.bounds(), 0, 0);
        let px = dst.get_pixel(0, 0);
        let green_max = dst.format().green_max as u8;
        assert_eq!(dst.format().color(px), Color { r: 0, g: green_max, b: 0, a: 255 });
    }

    #[test]
    fn extract_runs_groups_equal_values() {
        let row = [1u32, 1, 1, 2, 2, 3];
        let runs = Framebuffer::extract_runs(&row);
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0], PixelLengthRun { pixel: 1, length: 3 });
        assert_eq!(runs[1], PixelLengthRun { pixel: 2, length: 2 });
        assert_eq!(runs[2], PixelLengthRun { pixel: 3, length: 1 });
    }

    #[test]
    fn extract_runs_empty_row() {
        assert!(Framebuffer::extract_runs(&[]).is_empty());
    }

    #[test]
    fn background_color_picks_most_frequent() {
        let pixels = [1u32, 2, 2, 2, 3];
        assert_eq!(Framebuffer::background_color(&pixels), 2);
    }

    #[test]
    fn extract_tile_respects_bounds() {
        let mut fb = Framebuffer::new(4, 4, PixelFormat::rgba32());
        fb.set_pixel(2, 2, 42);
        let tile = fb.extract_tile(Region::new(2, 2, 2, 2));
        assert_eq!(tile[0], 42);
    }
}
