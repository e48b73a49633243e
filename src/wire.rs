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

//! RFB wire constants, message framing, and the small structures the
//! handshake exchanges before the session takes over. Generalizes
//! the teacher's `protocol.rs`, dropping the Tight-family constants that
//! have no counterpart and adding VeNCrypt and the pseudo-encodings.

use crate::geometry::Region;
use crate::pixelformat::PixelFormat;
use bytes::{BufMut, BytesMut};

/// Client-to-server message type byte.
pub mod client_msg {
    pub const SET_PIXEL_FORMAT: u8 = 0;
    pub const SET_ENCODINGS: u8 = 2;
    pub const FRAMEBUFFER_UPDATE_REQUEST: u8 = 3;
    pub const KEY_EVENT: u8 = 4;
    pub const POINTER_EVENT: u8 = 5;
    pub const CLIENT_CUT_TEXT: u8 = 6;
    pub const SET_DESKTOP_SIZE: u8 = 251;
    pub const ENABLE_CONTINUOUS_UPDATES: u8 = 150;
}

/// Server-to-client message type byte.
pub mod server_msg {
    pub const FRAMEBUFFER_UPDATE: u8 = 0;
    pub const SET_COLOUR_MAP_ENTRIES: u8 = 1;
    pub const BELL: u8 = 2;
    pub const SERVER_CUT_TEXT: u8 = 3;
    pub const END_OF_CONTINUOUS_UPDATES: u8 = 150;
}

/// Security type identifiers negotiated during the handshake.
pub mod security_type {
    pub const INVALID: u8 = 0;
    pub const NONE: u8 = 1;
    pub const VNC_AUTH: u8 = 2;
    pub const VENCRYPT: u8 = 19;
}

/// VeNCrypt sub-types (RFC-adjacent, as implemented by most servers).
pub mod vencrypt_subtype {
    pub const PLAIN: u32 = 256;
    pub const TLS_NONE: u32 = 257;
    pub const TLS_VNC: u32 = 258;
    pub const X509_NONE: u32 = 260;
    pub const X509_VNC: u32 = 261;
    pub const ANONYMOUS_TLS: u32 = 300;
}

/// Real (non-negative) encoding type identifiers this engine implements.
pub mod encoding {
    pub const RAW: i32 = 0;
    pub const CORRE: i32 = 4;
    pub const HEXTILE: i32 = 5;
    pub const TRLE: i32 = 15;
    pub const ZRLE: i32 = 16;
    pub const RRE: i32 = 2;
    pub const ZLIB: i32 = 6;
}

/// Pseudo-encoding identifiers, negotiated via `SetEncodings` but never
/// sent as a rectangle's own encoding.
pub mod pseudo_encoding {
    pub const DESKTOP_SIZE: i32 = -223;
    pub const EXTENDED_DESKTOP_SIZE: i32 = -308;
    pub const LAST_RECT: i32 = -224;
    pub const CONTINUOUS_UPDATES: i32 = -313;
    pub const EXTENDED_CLIPBOARD: i32 = -1063;
    pub const CURSOR: i32 = -239;
}

/// HexTile sub-encoding bit flags (RFC 6143 §7.7.3).
pub mod hextile_flag {
    pub const RAW: u8 = 1;
    pub const BACKGROUND_SPECIFIED: u8 = 2;
    pub const FOREGROUND_SPECIFIED: u8 = 4;
    pub const ANY_SUBRECTS: u8 = 8;
    pub const SUBRECTS_COLOURED: u8 = 16;
}

/// Extended clipboard action flags, carried in the top bits of the 4-byte
/// header that prefixes an extended `ClientCutText`/`ServerCutText` body.
pub mod clipboard_flag {
    pub const CAPS: u32 = 1 << 24;
    pub const REQUEST: u32 = 1 << 25;
    pub const PEEK: u32 = 1 << 26;
    pub const NOTIFY: u32 = 1 << 27;
    pub const PROVIDE: u32 = 1 << 28;
    /// Format bit for plain UTF-8 text, the only format this engine offers.
    pub const FORMAT_TEXT: u32 = 1 << 0;
}

/// `ExtendedDesktopSize` reply fields: who asked for the change, and
/// whether it was honored.
pub mod extended_desktop_size {
    /// The server changed the layout on its own initiative.
    pub const REASON_SERVER: u8 = 0;
    /// This client's own `SetDesktopSize` request triggered the reply.
    pub const REASON_THIS_CLIENT: u8 = 1;
    /// Another client's `SetDesktopSize` request triggered the reply.
    pub const REASON_OTHER_CLIENT: u8 = 2;

    pub const STATUS_OK: u8 = 0;
    pub const STATUS_PROHIBITED: u8 = 1;
    pub const STATUS_OUT_OF_RESOURCES: u8 = 2;
    pub const STATUS_INVALID_LAYOUT: u8 = 3;
}

/// A rectangle header as it appears inline in a `FramebufferUpdate`:
/// region plus the encoding type used for its body.
#[derive(Debug, Clone, Copy)]
pub struct RectangleHeader {
    /// The screen region this rectangle covers.
    pub region: Region,
    /// The encoding type identifier used to encode the body that follows.
    pub encoding_type: i32,
}

impl RectangleHeader {
    /// Writes the 12-byte rectangle header (x, y, w, h, encoding-type).
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_i16(self.region.x);
        buf.put_i16(self.region.y);
        buf.put_u16(self.region.width);
        buf.put_u16(self.region.height);
        buf.put_i32(self.encoding_type);
    }
}

/// The `ServerInit` message sent once, right after the security handshake
/// completes.
#[derive(Debug, Clone)]
pub struct ServerInit {
    /// Initial framebuffer width in pixels.
    pub width: u16,
    /// Initial framebuffer height in pixels.
    pub height: u16,
    /// The server's native pixel format, offered as a starting point.
    pub pixel_format: PixelFormat,
    /// A human-readable name for the remote desktop, shown in client UIs.
    pub name: String,
}

impl ServerInit {
    /// Serializes this message, including the 4-byte name-length prefix.
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u16(self.width);
        buf.put_u16(self.height);
        self.pixel_format.write_to(buf);
        let name_bytes = self.name.as_bytes();
        buf.put_u32(name_bytes.len() as u32);
        buf.extend_from_slice(name_bytes);
    }
}

/// A fully parsed client-to-server message.
#[derive(Debug, Clone)]
pub enum ClientMessage {
    /// Client wants pixel data delivered in this format from now on.
    SetPixelFormat(PixelFormat),
    /// Client's encoding preference list, most-preferred first.
    SetEncodings(Vec<i32>),
    /// Client wants an update for `region`; `incremental` requests only
    /// changes since the last update.
    FramebufferUpdateRequest { region: Region, incremental: bool },
    /// A key was pressed (`down = true`) or released.
    KeyEvent { down: bool, keysym: u32 },
    /// Pointer moved/clicked; `button_mask` is a bitmask of currently
    /// pressed buttons.
    PointerEvent { button_mask: u8, x: u16, y: u16 },
    /// Legacy clipboard text (ISO 8859-1, Latin-1).
    ClientCutText(String),
    /// Extended clipboard message: action flags plus an optional payload.
    ExtendedClipboard { flags: u32, payload: Vec<u8> },
    /// Client requests a desktop resize to `width x height`.
    SetDesktopSize { width: u16, height: u16 },
    /// Client toggles the continuous-updates pseudo-encoding for `region`.
    EnableContinuousUpdates { enable: bool, region: Region },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_init_serializes_name_with_length_prefix() {
        let init = ServerInit {
            width: 800,
            height: 600,
            pixel_format: PixelFormat::rgba32(),
            name: "desktop".to_string(),
        };
        let mut buf = BytesMut::new();
        init.write_to(&mut buf);
        assert_eq!(&buf[0..2], &800u16.to_be_bytes());
        assert_eq!(&buf[2..4], &600u16.to_be_bytes());
        let name_len_offset = 4 + 16;
        let name_len = u32::from_be_bytes(buf[name_len_offset..name_len_offset + 4].try_into().unwrap());
        assert_eq!(name_len as usize, "desktop".len());
    }

    #[test]
    fn rectangle_header_is_twelve_bytes() {
        let header = RectangleHeader { region: Region::new(1, 2, 3, 4), encoding_type: encoding::RAW };
        let mut buf = BytesMut::new();
        header.write_to(&mut buf);
        assert_eq!(buf.len(), 12);
    }
}
