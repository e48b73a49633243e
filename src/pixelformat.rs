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

//! Pixel format model: wire encoding, pixel/color conversion.
//!
//! Generalizes the teacher's `protocol::PixelFormat` (fixed RGB, no alpha,
//! always describing the server's single RGBA32 framebuffer) into an
//! arbitrary source/destination format pair, and folds in `translate.rs`'s
//! scale/downscale math so any `PixelFormat` can be converted to any other.

use crate::error::{Result, VncError};
use bytes::{Buf, BufMut, BytesMut};

/// An RGBA color with 8 bits per channel, the engine's format-independent
/// intermediate representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    /// Red channel, 0-255.
    pub r: u8,
    /// Green channel, 0-255.
    pub g: u8,
    /// Blue channel, 0-255.
    pub b: u8,
    /// Alpha channel, 0-255. 255 is opaque.
    pub a: u8,
}

impl Color {
    /// Creates an opaque color.
    #[must_use]
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Creates a color with explicit alpha.
    #[must_use]
    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Describes how a pixel's bits map to RGBA channels, matching the RFB wire
/// `PIXEL_FORMAT` structure (16 bytes) plus an alpha extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormat {
    /// Bits occupied by one pixel: one of 8, 16, 24, 30, 32.
    pub bits_per_pixel: u8,
    /// Number of significant bits, <= `bits_per_pixel`.
    pub depth: u8,
    /// True if multi-byte pixels are big-endian on the wire.
    pub big_endian: bool,
    /// False selects a palette; the engine only emits `true`.
    pub true_colour: bool,
    /// Maximum representable red value (e.g. 255 for 8 bits).
    pub red_max: u16,
    /// Maximum representable green value.
    pub green_max: u16,
    /// Maximum representable blue value.
    pub blue_max: u16,
    /// Maximum representable alpha value. Zero means no alpha channel
    /// (opaque), matching spec.md's "absent" convention.
    pub alpha_max: u16,
    /// Bit position of the red field's least-significant bit.
    pub red_shift: u8,
    /// Bit position of the green field's least-significant bit.
    pub green_shift: u8,
    /// Bit position of the blue field's least-significant bit.
    pub blue_shift: u8,
    /// Bit position of the alpha field's least-significant bit. Ignored
    /// when `alpha_max` is zero.
    pub alpha_shift: u8,
}

impl PixelFormat {
    /// 32 bits per pixel, 8 bits per RGBA channel, little-endian.
    #[must_use]
    pub fn rgba32() -> Self {
        Self {
            bits_per_pixel: 32,
            depth: 32,
            big_endian: false,
            true_colour: true,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            alpha_max: 255,
            red_shift: 0,
            green_shift: 8,
            blue_shift: 16,
            alpha_shift: 24,
        }
    }

    /// 32 bits per pixel, 24-bit depth, no alpha channel. The common
    /// "true color" server default.
    #[must_use]
    pub fn rgb32() -> Self {
        Self {
            bits_per_pixel: 32,
            depth: 24,
            big_endian: false,
            true_colour: true,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            alpha_max: 0,
            red_shift: 16,
            green_shift: 8,
            blue_shift: 0,
            alpha_shift: 0,
        }
    }

    /// 16 bits per pixel, RGB565.
    #[must_use]
    pub fn rgb565() -> Self {
        Self {
            bits_per_pixel: 16,
            depth: 16,
            big_endian: false,
            true_colour: true,
            red_max: 31,
            green_max: 63,
            blue_max: 31,
            alpha_max: 0,
            red_shift: 11,
            green_shift: 5,
            blue_shift: 0,
            alpha_shift: 0,
        }
    }

    /// 16 bits per pixel, RGB555.
    #[must_use]
    pub fn rgb555() -> Self {
        Self {
            bits_per_pixel: 16,
            depth: 15,
            big_endian: false,
            true_colour: true,
            red_max: 31,
            green_max: 31,
            blue_max: 31,
            alpha_max: 0,
            red_shift: 10,
            green_shift: 5,
            blue_shift: 0,
            alpha_shift: 0,
        }
    }

    /// 8 bits per pixel, BGR233. Used by the leanest clients.
    #[must_use]
    pub fn bgr233() -> Self {
        Self {
            bits_per_pixel: 8,
            depth: 8,
            big_endian: false,
            true_colour: true,
            red_max: 7,
            green_max: 7,
            blue_max: 3,
            alpha_max: 0,
            red_shift: 0,
            green_shift: 3,
            blue_shift: 6,
            alpha_shift: 0,
        }
    }

    /// Bytes occupied by one pixel on the wire.
    #[must_use]
    pub fn bytes_per_pixel(&self) -> usize {
        (self.bits_per_pixel as usize).div_ceil(8)
    }

    /// Validates internal consistency: channel masks must not overlap, and
    /// `bits_per_pixel` must be one of the RFB-legal values.
    pub fn validate(&self) -> Result<()> {
        if ![8u8, 16, 24, 30, 32].contains(&self.bits_per_pixel) {
            return Err(VncError::InvalidFormat(format!(
                "unsupported bits_per_pixel {}",
                self.bits_per_pixel
            )));
        }
        if self.depth > self.bits_per_pixel {
            return Err(VncError::InvalidFormat(format!(
                "depth {} exceeds bits_per_pixel {}",
                self.depth, self.bits_per_pixel
            )));
        }
        if !self.true_colour {
            return Err(VncError::InvalidFormat("palette formats are not supported".into()));
        }

        let mut occupied: u64 = 0;
        for (max, shift, name) in [
            (self.red_max, self.red_shift, "red"),
            (self.green_max, self.green_shift, "green"),
            (self.blue_max, self.blue_shift, "blue"),
        ] {
            let bits = bits_for_max(max);
            let mask = ((1u64 << bits) - 1) << shift;
            if occupied & mask != 0 {
                return Err(VncError::InvalidFormat(format!("{name} channel mask overlaps another channel")));
            }
            occupied |= mask;
        }
        if self.alpha_max != 0 {
            let bits = bits_for_max(self.alpha_max);
            let mask = ((1u64 << bits) - 1) << self.alpha_shift;
            if occupied & mask != 0 {
                return Err(VncError::InvalidFormat("alpha channel mask overlaps another channel".into()));
            }
            occupied |= mask;
        }
        if occupied >> self.bits_per_pixel != 0 {
            return Err(VncError::InvalidFormat("channel masks exceed bits_per_pixel".into()));
        }
        Ok(())
    }

    /// Packs a `Color` into this format's native pixel representation,
    /// returned as a little-endian `u32` regardless of `bits_per_pixel`
    /// (callers truncate/serialize per `bytes_per_pixel`).
    #[must_use]
    pub fn pixel(&self, color: Color) -> u32 {
        let r = scale_component(color.r, self.red_max) as u32;
        let g = scale_component(color.g, self.green_max) as u32;
        let b = scale_component(color.b, self.blue_max) as u32;
        let mut px = (r << self.red_shift) | (g << self.green_shift) | (b << self.blue_shift);
        if self.alpha_max != 0 {
            let a = scale_component(color.a, self.alpha_max) as u32;
            px |= a << self.alpha_shift;
        }
        px
    }

    /// Unpacks a native pixel value (as produced by `pixel`) into a `Color`
    /// by masking and shifting out each channel's raw `0..max` value
    /// as-is, with no rescale back to 8 bits: callers that need an 8-bit
    /// value go through `convert` instead, which rescales per-channel
    /// against a concrete destination format. When this format carries no
    /// alpha channel, the resulting color is fully opaque.
    #[must_use]
    pub fn color(&self, px: u32) -> Color {
        let r = (((px >> self.red_shift) as u16) & max_mask(self.red_max)) as u8;
        let g = (((px >> self.green_shift) as u16) & max_mask(self.green_max)) as u8;
        let b = (((px >> self.blue_shift) as u16) & max_mask(self.blue_max)) as u8;
        let a = if self.alpha_max == 0 {
            255
        } else {
            (((px >> self.alpha_shift) as u16) & max_mask(self.alpha_max)) as u8
        };
        Color { r, g, b, a }
    }

    /// Converts a pixel value from `self`'s format directly into `dst`'s
    /// format: each channel's raw value is rescaled against the two
    /// formats' maxima (`value * dst_max / src_max`) and repacked at
    /// `dst`'s shifts, without round-tripping through an 8-bit `Color`.
    /// A missing source alpha channel is treated as fully opaque.
    #[must_use]
    pub fn convert(&self, px: u32, dst: &PixelFormat) -> u32 {
        let r = convert_channel(((px >> self.red_shift) as u16) & max_mask(self.red_max), self.red_max, dst.red_max);
        let g = convert_channel(((px >> self.green_shift) as u16) & max_mask(self.green_max), self.green_max, dst.green_max);
        let b = convert_channel(((px >> self.blue_shift) as u16) & max_mask(self.blue_max), self.blue_max, dst.blue_max);
        let mut out = (u32::from(r) << dst.red_shift) | (u32::from(g) << dst.green_shift) | (u32::from(b) << dst.blue_shift);

        if dst.alpha_max != 0 {
            let a = if self.alpha_max == 0 {
                dst.alpha_max
            } else {
                convert_channel(((px >> self.alpha_shift) as u16) & max_mask(self.alpha_max), self.alpha_max, dst.alpha_max)
            };
            out |= u32::from(a) << dst.alpha_shift;
        }
        out
    }

    /// Reads one pixel from `buf` in this format's byte order and width,
    /// returning it as the native `u32` representation used by `color`.
    pub fn read_pixel(&self, buf: &mut impl Buf) -> u32 {
        match self.bytes_per_pixel() {
            1 => buf.get_u8() as u32,
            2 => {
                if self.big_endian {
                    buf.get_u16() as u32
                } else {
                    buf.get_u16_le() as u32
                }
            }
            3 => {
                let mut b = [0u8; 3];
                buf.copy_to_slice(&mut b);
                if self.big_endian {
                    u32::from(b[0]) << 16 | u32::from(b[1]) << 8 | u32::from(b[2])
                } else {
                    u32::from(b[0]) | u32::from(b[1]) << 8 | u32::from(b[2]) << 16
                }
            }
            _ => {
                if self.big_endian {
                    buf.get_u32()
                } else {
                    buf.get_u32_le()
                }
            }
        }
    }

    /// Writes one pixel into `buf` in this format's byte order and width.
    pub fn write_pixel(&self, buf: &mut impl BufMut, px: u32) {
        match self.bytes_per_pixel() {
            1 => buf.put_u8(px as u8),
            2 => {
                if self.big_endian {
                    buf.put_u16(px as u16);
                } else {
                    buf.put_u16_le(px as u16);
                }
            }
            3 => {
                let b = px.to_le_bytes();
                if self.big_endian {
                    buf.put_u8(b[2]);
                    buf.put_u8(b[1]);
                    buf.put_u8(b[0]);
                } else {
                    buf.put_u8(b[0]);
                    buf.put_u8(b[1]);
                    buf.put_u8(b[2]);
                }
            }
            _ => {
                if self.big_endian {
                    buf.put_u32(px);
                } else {
                    buf.put_u32_le(px);
                }
            }
        }
    }

    /// Serializes this format as the 16-byte RFB wire `PIXEL_FORMAT`
    /// structure (3 trailing padding bytes).
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.bits_per_pixel);
        buf.put_u8(self.depth);
        buf.put_u8(u8::from(self.big_endian));
        buf.put_u8(u8::from(self.true_colour));
        buf.put_u16(self.red_max);
        buf.put_u16(self.green_max);
        buf.put_u16(self.blue_max);
        buf.put_u8(self.red_shift);
        buf.put_u8(self.green_shift);
        buf.put_u8(self.blue_shift);
        buf.put_bytes(0, 3);
    }

    /// Parses a 16-byte RFB wire `PIXEL_FORMAT` structure. `alpha_max`/
    /// `alpha_shift` default to 0 (no alpha), since the wire format itself
    /// carries no alpha fields; callers that negotiate alpha out-of-band
    /// set it afterward.
    pub fn from_bytes(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < 16 {
            return Err(VncError::ProtocolViolation("short pixel format".into()));
        }
        let bits_per_pixel = buf.get_u8();
        let depth = buf.get_u8();
        let big_endian = buf.get_u8() != 0;
        let true_colour = buf.get_u8() != 0;
        let red_max = buf.get_u16();
        let green_max = buf.get_u16();
        let blue_max = buf.get_u16();
        let red_shift = buf.get_u8();
        let green_shift = buf.get_u8();
        let blue_shift = buf.get_u8();
        buf.advance(3);
        let pf = PixelFormat {
            bits_per_pixel,
            depth,
            big_endian,
            true_colour,
            red_max,
            green_max,
            blue_max,
            alpha_max: 0,
            red_shift,
            green_shift,
            blue_shift,
            alpha_shift: 0,
        };
        pf.validate()?;
        Ok(pf)
    }
}

fn bits_for_max(max: u16) -> u32 {
    if max == 0 {
        0
    } else {
        16 - max.leading_zeros()
    }
}

fn max_mask(max: u16) -> u16 {
    max
}

/// Scales an 8-bit channel value up to a format's channel range
/// (`0..=max`) via `(value * max) >> 8`. `max == 255` is special-cased to
/// the identity mapping: the general formula loses the top of the range
/// (`(255 * 255) >> 8 == 254`), which would violate the exact round-trip
/// every full 8-bit format (the common case) is expected to give.
#[must_use]
pub fn scale_component(value: u8, max: u16) -> u16 {
    if max == 255 {
        return u16::from(value);
    }
    ((u32::from(value) * u32::from(max)) >> 8) as u16
}

/// Rescales a channel value from one format's range to another's:
/// `value * dst_max / src_max`. Returns 0 if `src_max` is 0 (no source
/// channel to scale from).
fn convert_channel(value: u16, src_max: u16, dst_max: u16) -> u16 {
    if src_max == 0 {
        return 0;
    }
    ((u32::from(value) * u32::from(dst_max)) / u32::from(src_max)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba32_round_trips_through_color() {
        let pf = PixelFormat::rgba32();
        let c = Color::rgba(10, 20, 30, 40);
        let px = pf.pixel(c);
        assert_eq!(pf.color(px), c);
    }

    #[test]
    fn rgb565_color_extracts_raw_channel_value_unscaled() {
        let pf = PixelFormat::rgb565();
        let px = pf.pixel(Color::rgb(255, 255, 255));
        assert_eq!(pf.color(px), Color { r: 30, g: 62, b: 30, a: 255 });
    }

    #[test]
    fn no_alpha_format_reports_opaque() {
        let pf = PixelFormat::rgb32();
        let px = pf.pixel(Color::rgba(1, 2, 3, 0));
        assert_eq!(pf.color(px).a, 255);
    }

    #[test]
    fn convert_between_formats() {
        let src = PixelFormat::rgba32();
        let dst = PixelFormat::rgb565();
        let px = src.pixel(Color::rgb(255, 0, 0));
        let converted = src.convert(px, &dst);
        assert_eq!(dst.color(converted), Color { r: dst.red_max as u8, g: 0, b: 0, a: 255 });
    }

    #[test]
    fn convert_is_identity_for_matching_maxima() {
        let src = PixelFormat::rgb32();
        let dst = PixelFormat::rgba32();
        let px = src.pixel(Color::rgb(12, 34, 56));
        let converted = src.convert(px, &dst);
        assert_eq!(dst.color(converted), Color::rgba(12, 34, 56, 255));
    }

    #[test]
    fn convert_treats_missing_source_alpha_as_opaque() {
        let src = PixelFormat::rgb32();
        let dst = PixelFormat::rgba32();
        let px = src.pixel(Color::rgb(1, 2, 3));
        let converted = src.convert(px, &dst);
        assert_eq!(dst.color(converted).a, 255);
    }

    #[test]
    fn validate_rejects_overlapping_masks() {
        let mut pf = PixelFormat::rgb565();
        pf.green_shift = pf.red_shift;
        assert!(pf.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_bpp() {
        let mut pf = PixelFormat::rgba32();
        pf.bits_per_pixel = 17;
        assert!(pf.validate().is_err());
    }

    #[test]
    fn wire_round_trip() {
        let pf = PixelFormat::rgb565();
        let mut buf = BytesMut::new();
        pf.write_to(&mut buf);
        assert_eq!(buf.len(), 16);
        let mut bytes = buf.freeze();
        let parsed = PixelFormat::from_bytes(&mut bytes).unwrap();
        assert_eq!(parsed.bits_per_pixel, pf.bits_per_pixel);
        assert_eq!(parsed.red_max, pf.red_max);
    }

    #[test]
    fn scale_component_matches_the_wire_packing_formula() {
        assert_eq!(scale_component(0, 31), 0);
        // (255 * 31) >> 8 == 30: the >>8 formula doesn't quite reach the
        // top of a reduced-range channel, unlike the max == 255 identity.
        assert_eq!(scale_component(255, 31), 30);
        assert_eq!(scale_component(255, 255), 255);
    }
}
