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

//! # rfbcore
//!
//! A pure Rust remote-framebuffer engine: a pixel-format library, an RFB
//! (RFC 6143) protocol server, and a tile-based encoding library, with no
//! dependency on any particular display or input system. Screen capture,
//! synthetic input, and clipboard access are supplied by the embedding
//! application through the `collaborators` module's traits.
//!
//! ## Features
//!
//! - **Seven tile encodings**: Raw, RRE, CoRRE, HexTile, Zlib, TRLE, ZRLE
//! - **Pixel formats**: 8/16/24/32-bit true-color depths, with alpha
//! - **Security**: None, VNC Authentication (DES challenge-response), and
//!   VeNCrypt (TLS, anonymous or X.509)
//! - **Pseudo-encodings**: DesktopSize, ExtendedDesktopSize, LastRect,
//!   ContinuousUpdates, ExtendedClipboard, Cursor
//! - **Async I/O**: built on Tokio
//!
//! ## Quick start
//!
//! ```no_run
//! use rfbcore::collaborators::{Capture, Input, ClipboardHost, MonitorLayout};
//! use rfbcore::server::{ServerContext, serve_tcp};
//! use rfbcore::session::handshake::SecurityPolicy;
//! use std::sync::Arc;
//!
//! # struct MyCapture;
//! # impl Capture for MyCapture {
//! #     fn snapshot(&self, r: rfbcore::geometry::Region) -> rfbcore::framebuffer::Framebuffer {
//! #         rfbcore::framebuffer::Framebuffer::new(r.width, r.height, rfbcore::pixelformat::PixelFormat::rgba32())
//! #     }
//! #     fn screen_size(&self) -> (u16, u16) { (800, 600) }
//! #     fn resize(&self, m: &[MonitorLayout]) -> rfbcore::error::Result<Vec<MonitorLayout>> { Ok(m.to_vec()) }
//! # }
//! # struct MyInput;
//! # impl Input for MyInput {
//! #     fn key_press_release(&self, _: u32, _: bool) {}
//! #     fn pointer(&self, _: u16, _: u16, _: u8) {}
//! #     fn switch_layout_group(&self, _: u32) {}
//! #     fn keysym_to_keycode(&self, k: u32, _: u32) -> Option<u32> { Some(k) }
//! # }
//! #[tokio::main]
//! async fn main() -> rfbcore::error::Result<()> {
//!     let ctx = Arc::new(ServerContext {
//!         name: "desktop".to_string(),
//!         security: SecurityPolicy::None,
//!         max_clipboard_payload: rfbcore::clipboard::DEFAULT_MAX_PAYLOAD,
//!         threads: None,
//!         capture: Arc::new(MyCapture),
//!         input_factory: Arc::new(|| Box::new(MyInput) as Box<dyn Input>),
//!         clipboard_host: None::<Arc<dyn ClipboardHost>>,
//!         tls_acceptor: None,
//!     });
//!     serve_tcp("0.0.0.0:5900", ctx).await
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clipboard;
pub mod collaborators;
pub mod config;
pub mod encoding;
pub mod error;
pub mod font;
pub mod framebuffer;
pub mod geometry;
pub mod input;
pub mod io;
pub mod pixelformat;
pub mod server;
pub mod session;
pub mod transport;
pub mod wire;

pub use collaborators::{Capture, ClipboardHost, Input};
pub use error::{Result, VncError};
pub use framebuffer::Framebuffer;
pub use pixelformat::PixelFormat;
pub use session::RfbSession;

/// RFB protocol version string sent at the start of every handshake.
pub const PROTOCOL_VERSION: &[u8; 12] = b"RFB 003.008\n";

/// Conventional VNC port, used as the default for `--listen` when the
/// operator omits a port.
pub const DEFAULT_PORT: u16 = 5900;
