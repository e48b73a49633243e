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

//! Tile encoding library: encoders and decoders for every encoding this
//! engine implements, each generic over source and destination pixel
//! formats instead of the teacher's fixed "RGBA32 in, RGB24 out" pipeline.

pub mod common;
pub mod corre;
pub mod hextile;
pub mod pool;
pub mod raw;
pub mod rre;
pub mod trle;
pub mod zlib;
pub mod zrle;

use crate::error::Result;
use crate::pixelformat::PixelFormat;
use crate::wire::encoding as enc_id;
use bytes::{Buf, BytesMut};

/// Encodes one rectangle's worth of native-format pixels into the wire
/// representation for a specific encoding.
pub trait Encoder: Send {
    /// The RFB encoding-type identifier this encoder produces.
    fn encoding_type(&self) -> i32;

    /// Encodes `pixels` (row-major, `width * height` native values in
    /// `src_format`) into `dst_format`'s byte representation, appending the
    /// encoded rectangle body (not the 12-byte header) to `out`.
    fn encode(
        &mut self,
        pixels: &[u32],
        width: u16,
        height: u16,
        src_format: &PixelFormat,
        dst_format: &PixelFormat,
        out: &mut BytesMut,
    ) -> Result<()>;
}

/// Decodes one rectangle body back into native pixel values.
pub trait Decoder: Send {
    /// The RFB encoding-type identifier this decoder consumes.
    fn encoding_type(&self) -> i32;

    /// Reads an encoded rectangle body for a `width x height` tile from
    /// `buf`, interpreting pixel bytes per `format`, returning row-major
    /// native pixel values.
    fn decode(&mut self, buf: &mut dyn Buf, width: u16, height: u16, format: &PixelFormat) -> Result<Vec<u32>>;
}

/// Returns a fresh encoder for `encoding_type`, or `None` if this engine
/// does not implement it.
#[must_use]
pub fn encoder_for(encoding_type: i32) -> Option<Box<dyn Encoder>> {
    match encoding_type {
        enc_id::RAW => Some(Box::new(raw::RawCodec)),
        enc_id::RRE => Some(Box::new(rre::RreCodec)),
        enc_id::CORRE => Some(Box::new(corre::CorreCodec)),
        enc_id::HEXTILE => Some(Box::new(hextile::HextileCodec::new())),
        enc_id::ZLIB => Some(Box::new(zlib::ZlibCodec::new())),
        enc_id::TRLE => Some(Box::new(trle::TrleCodec)),
        enc_id::ZRLE => Some(Box::new(zrle::ZrleCodec::new())),
        _ => None,
    }
}

/// Returns a fresh decoder for `encoding_type`, or `None` if this engine
/// does not implement it.
#[must_use]
pub fn decoder_for(encoding_type: i32) -> Option<Box<dyn Decoder>> {
    match encoding_type {
        enc_id::RAW => Some(Box::new(raw::RawCodec)),
        enc_id::RRE => Some(Box::new(rre::RreCodec)),
        enc_id::CORRE => Some(Box::new(corre::CorreCodec)),
        enc_id::HEXTILE => Some(Box::new(hextile::HextileCodec::new())),
        enc_id::ZLIB => Some(Box::new(zlib::ZlibCodec::new())),
        enc_id::TRLE => Some(Box::new(trle::TrleCodec)),
        enc_id::ZRLE => Some(Box::new(zrle::ZrleCodec::new())),
        _ => None,
    }
}
