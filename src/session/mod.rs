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

//! One client's RFB session: handshake, message dispatch, and the
//! deferred-batch update scheduler.
//!
//! Generalizes the teacher's `VncClient::handle_messages`/
//! `send_batched_update` (`client.rs`), which held one screen's framebuffer
//! directly and pushed raw `ClientEvent`s into an application channel, into
//! a transport-agnostic loop driven entirely through the `Capture`/`Input`/
//! `ClipboardHost` collaborators.

pub mod auth;
pub mod handshake;

use crate::clipboard::{ClipboardRelay, SelectionKind};
use crate::collaborators::{Capture, ClipboardHost, Input, MonitorLayout};
use crate::encoding::{self, Encoder};
use crate::error::{Result, VncError};
use crate::framebuffer::Framebuffer;
use crate::geometry::Region;
use crate::input::InputInjector;
use crate::io::ByteStream;
use crate::pixelformat::PixelFormat;
use crate::transport::zlibstream::{ZlibDecoder, ZlibEncoder};
use crate::wire::{client_msg, clipboard_flag, extended_desktop_size, pseudo_encoding, server_msg, RectangleHeader};
use bytes::{BufMut, BytesMut};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::Instant;

const MAX_RECTS_PER_UPDATE: usize = 50;
const MIN_UPDATE_INTERVAL: Duration = Duration::from_millis(33);
const DEFER_TICK: Duration = Duration::from_millis(5);
const DIFF_BLOCK: u16 = 32;

/// Static, per-session configuration supplied by the server when a
/// connection is accepted.
pub struct SessionConfig {
    /// Name advertised in `ServerInit`.
    pub name: String,
    /// Security policy to enforce during the handshake.
    pub security: handshake::SecurityPolicy,
    /// Cap on a single clipboard payload, in bytes.
    pub max_clipboard_payload: usize,
    /// Worker threads for parallel tile encoding. `None` uses the
    /// machine's available parallelism.
    pub threads: Option<usize>,
}

/// Which pseudo-encodings the connected client declared support for, via
/// `SetEncodings`.
#[derive(Debug, Clone, Copy, Default)]
struct Capabilities {
    last_rect: bool,
    desktop_size: bool,
    extended_desktop_size: bool,
    continuous_updates: bool,
    extended_clipboard: bool,
    cursor: bool,
}

impl Capabilities {
    fn from_encodings(encodings: &[i32]) -> Self {
        Self {
            last_rect: encodings.contains(&pseudo_encoding::LAST_RECT),
            desktop_size: encodings.contains(&pseudo_encoding::DESKTOP_SIZE),
            extended_desktop_size: encodings.contains(&pseudo_encoding::EXTENDED_DESKTOP_SIZE),
            continuous_updates: encodings.contains(&pseudo_encoding::CONTINUOUS_UPDATES),
            extended_clipboard: encodings.contains(&pseudo_encoding::EXTENDED_CLIPBOARD),
            cursor: encodings.contains(&pseudo_encoding::CURSOR),
        }
    }
}

/// One connected viewer, tying the wire protocol to a set of collaborators.
pub struct RfbSession<S> {
    stream: ByteStream<S>,
    capture: Arc<dyn Capture>,
    clipboard_host: Option<Arc<dyn ClipboardHost>>,
    input: InputInjector,
    clipboard: ClipboardRelay,
    clipboard_cookie: u64,
    clipboard_compressor: ZlibEncoder,
    clipboard_decompressor: ZlibDecoder,
    clipboard_rx: Option<mpsc::UnboundedReceiver<(SelectionKind, Vec<u8>, u64)>>,
    format: PixelFormat,
    encodings: Vec<i32>,
    caps: Capabilities,
    width: u16,
    height: u16,
    pool_workers: usize,
    encoders: HashMap<i32, Box<dyn Encoder>>,
    last_frame: Framebuffer,
    dirty: Vec<Region>,
    update_requested: bool,
    incremental_only: bool,
    continuous: bool,
    continuous_region: Region,
    last_sent_at: Instant,
}

impl<S: AsyncRead + AsyncWrite + Unpin> RfbSession<S> {
    /// Runs the handshake over `stream` and the message loop to
    /// completion, returning once the client disconnects or a fatal
    /// protocol error occurs.
    pub async fn run(
        stream: S,
        config: SessionConfig,
        capture: Arc<dyn Capture>,
        input: Box<dyn Input>,
        clipboard_host: Option<Arc<dyn ClipboardHost>>,
    ) -> Result<()> {
        let mut stream = ByteStream::new(stream);
        let (width, height) = capture.screen_size();
        let format = PixelFormat::rgba32();

        let outcome = handshake::run(&mut stream, &config.security, width, height, &config.name, format).await?;
        info!("handshake complete, exclusive={}", outcome.exclusive);

        let clipboard_rx = clipboard_host.as_ref().map(|host| {
            let (tx, rx) = mpsc::unbounded_channel();
            host.observe_selection(Box::new(move |kind, bytes, cookie| {
                let _ = tx.send((kind, bytes, cookie));
            }));
            rx
        });

        let last_frame = capture.snapshot(Region::new(0, 0, width, height));
        let mut session = RfbSession {
            stream,
            capture,
            clipboard_host,
            input: InputInjector::new(input),
            clipboard: ClipboardRelay::with_limit(config.max_clipboard_payload),
            clipboard_cookie: 0,
            clipboard_compressor: ZlibEncoder::new(),
            clipboard_decompressor: ZlibDecoder::new(),
            clipboard_rx,
            format: outcome.initial_format,
            encodings: vec![crate::wire::encoding::RAW],
            caps: Capabilities::default(),
            width,
            height,
            pool_workers: encoding::pool::worker_count(config.threads),
            encoders: HashMap::new(),
            last_frame,
            dirty: Vec::new(),
            update_requested: false,
            incremental_only: true,
            continuous: false,
            continuous_region: Region::default(),
            last_sent_at: Instant::now() - MIN_UPDATE_INTERVAL,
        };

        session.message_loop().await;
        session.input.release_all();
        Ok(())
    }

    async fn message_loop(&mut self) {
        let mut ticker = tokio::time::interval(DEFER_TICK);
        let mut clipboard_rx = self.clipboard_rx.take();
        loop {
            tokio::select! {
                msg = self.read_message() => {
                    match msg {
                        Ok(msg) => {
                            if let Err(e) = self.dispatch(msg).await {
                                if e.is_fatal() {
                                    warn!("session ending: {e}");
                                    return;
                                }
                                warn!("dropping malformed message: {e}");
                            }
                        }
                        Err(e) => {
                            debug!("client disconnected: {e}");
                            return;
                        }
                    }
                }
                _ = ticker.tick() => {
                    self.refresh_dirty_regions();
                    if let Err(e) = self.maybe_send_update().await {
                        warn!("update send failed: {e}");
                        return;
                    }
                }
                change = recv_clipboard_change(&mut clipboard_rx) => {
                    if let Some((kind, bytes, cookie)) = change {
                        if let Err(e) = self.handle_host_selection_change(kind, bytes, cookie).await {
                            warn!("failed to relay clipboard change: {e}");
                        }
                    }
                }
            }
        }
    }

    async fn read_message(&mut self) -> Result<ClientMessage> {
        let msg_type = self.stream.read_u8().await?;
        match msg_type {
            client_msg::SET_PIXEL_FORMAT => {
                self.stream.read_exact(&mut [0u8; 3]).await?;
                let bytes = self.stream.read_vec(16).await?;
                let mut buf = bytes::Bytes::from(bytes);
                Ok(ClientMessage::SetPixelFormat(PixelFormat::from_bytes(&mut buf)?))
            }
            client_msg::SET_ENCODINGS => {
                self.stream.read_exact(&mut [0u8; 1]).await?;
                let count = self.stream.read_u16().await?;
                let mut encodings = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    encodings.push(self.stream.read_i32().await?);
                }
                Ok(ClientMessage::SetEncodings(encodings))
            }
            client_msg::FRAMEBUFFER_UPDATE_REQUEST => {
                let incremental = self.stream.read_u8().await? != 0;
                let x = self.stream.read_u16().await?;
                let y = self.stream.read_u16().await?;
                let w = self.stream.read_u16().await?;
                let h = self.stream.read_u16().await?;
                Ok(ClientMessage::FramebufferUpdateRequest {
                    region: Region::new(x as i16, y as i16, w, h),
                    incremental,
                })
            }
            client_msg::KEY_EVENT => {
                let down = self.stream.read_u8().await? != 0;
                self.stream.read_exact(&mut [0u8; 2]).await?;
                let keysym = self.stream.read_u32().await?;
                Ok(ClientMessage::KeyEvent { down, keysym })
            }
            client_msg::POINTER_EVENT => {
                let button_mask = self.stream.read_u8().await?;
                let x = self.stream.read_u16().await?;
                let y = self.stream.read_u16().await?;
                Ok(ClientMessage::PointerEvent { button_mask, x, y })
            }
            client_msg::CLIENT_CUT_TEXT => {
                self.stream.read_exact(&mut [0u8; 3]).await?;
                let length = self.stream.read_i32().await?;
                if length >= 0 {
                    let bytes = self.stream.read_vec(length as usize).await?;
                    let text = bytes.iter().map(|&b| b as char).collect();
                    Ok(ClientMessage::ClientCutText(text))
                } else {
                    let compressed_len = (-length) as usize;
                    let compressed = self.stream.read_vec(compressed_len).await?;
                    let mut plain = Vec::new();
                    self.clipboard_decompressor.decode_into(&compressed, &mut plain)?;
                    if plain.len() < 4 {
                        return Err(VncError::ProtocolViolation("truncated extended clipboard message".into()));
                    }
                    let flags = u32::from_be_bytes(plain[0..4].try_into().unwrap());
                    let payload = plain[4..].to_vec();
                    Ok(ClientMessage::ExtendedClipboard { flags, payload })
                }
            }
            client_msg::SET_DESKTOP_SIZE => {
                self.stream.read_exact(&mut [0u8; 1]).await?;
                let width = self.stream.read_u16().await?;
                let height = self.stream.read_u16().await?;
                let num_screens = self.stream.read_u8().await?;
                self.stream.read_exact(&mut [0u8; 1]).await?;
                for _ in 0..num_screens {
                    self.stream.read_exact(&mut [0u8; 16]).await?;
                }
                Ok(ClientMessage::SetDesktopSize { width, height })
            }
            client_msg::ENABLE_CONTINUOUS_UPDATES => {
                let enable = self.stream.read_u8().await? != 0;
                let x = self.stream.read_u16().await?;
                let y = self.stream.read_u16().await?;
                let w = self.stream.read_u16().await?;
                let h = self.stream.read_u16().await?;
                Ok(ClientMessage::EnableContinuousUpdates { enable, region: Region::new(x as i16, y as i16, w, h) })
            }
            other => Err(VncError::ProtocolViolation(format!("unknown client message type {other}"))),
        }
    }

    async fn dispatch(&mut self, msg: ClientMessage) -> Result<()> {
        match msg {
            ClientMessage::SetPixelFormat(format) => {
                format.validate()?;
                self.format = format;
            }
            ClientMessage::SetEncodings(encodings) => {
                self.caps = Capabilities::from_encodings(&encodings);
                self.encodings = encodings.into_iter().filter(|e| *e >= 0).collect();
                if self.encodings.is_empty() {
                    self.encodings.push(crate::wire::encoding::RAW);
                }
            }
            ClientMessage::FramebufferUpdateRequest { region, incremental } => {
                self.update_requested = true;
                self.incremental_only = incremental;
                if !incremental {
                    self.dirty = vec![region.intersect(&Region::new(0, 0, self.width, self.height))];
                }
            }
            ClientMessage::KeyEvent { down, keysym } => {
                self.input.key_event(down, keysym);
            }
            ClientMessage::PointerEvent { button_mask, x, y } => {
                self.input.pointer_event(x, y, button_mask);
            }
            ClientMessage::ClientCutText(text) => {
                let bytes = self.clipboard.receive_legacy_cut_text(text.into_bytes())?;
                self.forward_to_clipboard_host(SelectionKind::Clipboard, bytes);
            }
            ClientMessage::ExtendedClipboard { flags, payload } => {
                if flags & clipboard_flag::PROVIDE != 0 && !payload.is_empty() {
                    if let Some(bytes) = self.clipboard.receive_chunk(payload.len() as u32, 0, &payload)? {
                        self.forward_to_clipboard_host(SelectionKind::Clipboard, bytes);
                    }
                }
            }
            ClientMessage::SetDesktopSize { width, height } => {
                self.handle_desktop_resize(width, height).await?;
            }
            ClientMessage::EnableContinuousUpdates { enable, region } => {
                self.continuous = enable;
                self.continuous_region = region;
                if !enable {
                    self.send_raw_message(&[server_msg::END_OF_CONTINUOUS_UPDATES, 0]).await?;
                }
            }
        }
        Ok(())
    }

    fn forward_to_clipboard_host(&mut self, kind: SelectionKind, bytes: Vec<u8>) {
        if let Some(host) = &self.clipboard_host {
            self.clipboard_cookie += 1;
            let cookie = self.clipboard_cookie;
            self.clipboard.note_own_set(kind, cookie);
            host.set_selection(kind, bytes, cookie);
        }
    }

    /// Relays a selection change the clipboard host observed on the
    /// captured display to the viewer, unless it is just the echo of a
    /// change this session itself just pushed via `forward_to_clipboard_host`.
    async fn handle_host_selection_change(&mut self, kind: SelectionKind, bytes: Vec<u8>, cookie: u64) -> Result<()> {
        if let Some(forward) = self.clipboard.observe_selection_change(kind, bytes, cookie) {
            self.send_server_cut_text(forward).await?;
        }
        Ok(())
    }

    async fn send_server_cut_text(&mut self, bytes: Vec<u8>) -> Result<()> {
        if self.caps.extended_clipboard {
            self.send_extended_server_cut_text(&bytes).await
        } else {
            self.send_legacy_server_cut_text(&bytes).await
        }
    }

    async fn send_legacy_server_cut_text(&mut self, bytes: &[u8]) -> Result<()> {
        let mut msg = BytesMut::with_capacity(8 + bytes.len());
        msg.put_u8(server_msg::SERVER_CUT_TEXT);
        msg.put_bytes(0, 3);
        msg.put_i32(bytes.len() as i32);
        msg.extend_from_slice(bytes);
        self.stream.write_all(&msg).await?;
        self.stream.flush().await
    }

    /// Sends `payload` as a zlib-compressed extended `ServerCutText`: a
    /// negative length followed by a compressed block of `flags:u32` plus
    /// the raw payload, mirroring the framing `read_message` already
    /// decodes for the client-to-server direction.
    async fn send_extended_server_cut_text(&mut self, payload: &[u8]) -> Result<()> {
        let mut plain = Vec::with_capacity(4 + payload.len());
        plain.extend_from_slice(&(clipboard_flag::PROVIDE | clipboard_flag::FORMAT_TEXT).to_be_bytes());
        plain.extend_from_slice(payload);

        let mut compressed = BytesMut::new();
        self.clipboard_compressor.encode_into(&plain, &mut compressed)?;

        let mut msg = BytesMut::with_capacity(8 + compressed.len());
        msg.put_u8(server_msg::SERVER_CUT_TEXT);
        msg.put_bytes(0, 3);
        msg.put_i32(-(compressed.len() as i32));
        msg.extend_from_slice(&compressed);
        self.stream.write_all(&msg).await?;
        self.stream.flush().await
    }

    async fn handle_desktop_resize(&mut self, width: u16, height: u16) -> Result<()> {
        let requested = [MonitorLayout { x: 0, y: 0, width, height }];
        let (status, realized) = match self.capture.resize(&requested) {
            Ok(realized) => {
                if let Some(layout) = realized.first() {
                    self.width = layout.width;
                    self.height = layout.height;
                    self.last_frame = self.capture.snapshot(Region::new(0, 0, self.width, self.height));
                    self.dirty = vec![self.last_frame.bounds()];
                }
                (extended_desktop_size::STATUS_OK, realized)
            }
            Err(e) => {
                warn!("desktop resize request failed: {e}");
                (extended_desktop_size::STATUS_INVALID_LAYOUT, Vec::new())
            }
        };
        if self.caps.extended_desktop_size {
            self.send_extended_desktop_size(extended_desktop_size::REASON_THIS_CLIENT, status, &realized).await?;
        }
        Ok(())
    }

    /// Sends a standalone `FramebufferUpdate` carrying one
    /// `ExtendedDesktopSize` pseudo-rectangle, replying to a `SetDesktopSize`
    /// request (or announcing a server-initiated layout change) per the
    /// monitor-count/flags/per-monitor-geometry body RFC 6143's extension
    /// describes.
    async fn send_extended_desktop_size(&mut self, reason: u8, status: u8, monitors: &[MonitorLayout]) -> Result<()> {
        let mut body = BytesMut::new();
        body.put_u8(server_msg::FRAMEBUFFER_UPDATE);
        body.put_u8(0);
        body.put_u16(1);

        let region = Region::new(reason as i16, status as i16, self.width, self.height);
        RectangleHeader { region, encoding_type: pseudo_encoding::EXTENDED_DESKTOP_SIZE }.write_to(&mut body);

        body.put_u8(monitors.len() as u8);
        body.put_bytes(0, 3);
        for (id, monitor) in monitors.iter().enumerate() {
            body.put_u32(id as u32);
            body.put_u16(monitor.x as u16);
            body.put_u16(monitor.y as u16);
            body.put_u16(monitor.width);
            body.put_u16(monitor.height);
            body.put_u32(0);
        }

        self.stream.write_all(&body).await?;
        self.stream.flush().await
    }

    fn refresh_dirty_regions(&mut self) {
        let current = self.capture.snapshot(Region::new(0, 0, self.width, self.height));
        for tile in current.bounds().divide_blocks(DIFF_BLOCK) {
            if tile_differs(&self.last_frame, &current, tile) {
                self.dirty.push(tile);
            }
        }
        self.last_frame = current;
    }

    async fn maybe_send_update(&mut self) -> Result<()> {
        if self.dirty.is_empty() {
            return Ok(());
        }
        if !self.continuous && !self.update_requested {
            return Ok(());
        }
        if self.last_sent_at.elapsed() < MIN_UPDATE_INTERVAL {
            return Ok(());
        }

        let mut regions: Vec<Region> = self.dirty.drain(..).collect();
        regions.truncate(MAX_RECTS_PER_UPDATE);
        if regions.is_empty() {
            return Ok(());
        }

        let mut body = BytesMut::new();
        body.put_u8(server_msg::FRAMEBUFFER_UPDATE);
        body.put_u8(0);
        body.put_u16(regions.len() as u16);

        let encoding_type = self.preferred_encoding();
        if regions.len() > 1 && Self::is_poolable(encoding_type) {
            self.encode_regions_parallel(&regions, encoding_type, &mut body).await?;
        } else {
            self.encode_regions_serial(&regions, encoding_type, &mut body)?;
        }

        self.stream.write_all(&body).await?;
        self.stream.flush().await?;
        self.last_sent_at = Instant::now();
        self.update_requested = false;
        Ok(())
    }

    fn preferred_encoding(&self) -> i32 {
        self.encodings
            .iter()
            .find(|e| encoding::encoder_for(**e).is_some())
            .copied()
            .unwrap_or(crate::wire::encoding::RAW)
    }

    /// Stateless encodings carry no state across rectangles, so their
    /// rectangles can be encoded concurrently on the worker pool. Zlib and
    /// ZRLE keep a persistent compressor that must see rectangles in
    /// order, on this session's own task.
    fn is_poolable(encoding_type: i32) -> bool {
        use crate::wire::encoding::{CORRE, HEXTILE, RAW, RRE, TRLE};
        matches!(encoding_type, RAW | RRE | CORRE | HEXTILE | TRLE)
    }

    /// Encodes every region in `regions` across the bounded worker pool,
    /// falling back to serial Raw encoding if the pool itself fails (e.g.
    /// a worker panicked).
    async fn encode_regions_parallel(&mut self, regions: &[Region], encoding_type: i32, out: &mut BytesMut) -> Result<()> {
        let native_format = PixelFormat::rgba32();
        let jobs = regions
            .iter()
            .map(|&region| encoding::pool::EncodeJob { region, pixels: self.last_frame.extract_tile(region), encoding_type })
            .collect();

        match encoding::pool::encode_parallel(jobs, native_format, self.format, self.pool_workers).await {
            Ok(encoded) => {
                for rect in encoded {
                    RectangleHeader { region: rect.region, encoding_type }.write_to(out);
                    out.extend_from_slice(&rect.body);
                }
                Ok(())
            }
            Err(e) => {
                warn!("parallel tile encode failed, falling back to serial Raw: {e}");
                self.encode_regions_serial(regions, crate::wire::encoding::RAW, out)
            }
        }
    }

    fn encode_regions_serial(&mut self, regions: &[Region], encoding_type: i32, out: &mut BytesMut) -> Result<()> {
        for &region in regions {
            self.encode_rectangle(region, encoding_type, out)?;
        }
        Ok(())
    }

    fn encode_rectangle(&mut self, region: Region, encoding_type: i32, out: &mut BytesMut) -> Result<()> {
        let native_format = PixelFormat::rgba32();
        let pixels = self.last_frame.extract_tile(region);

        let encoder = self.encoders.entry(encoding_type).or_insert_with(|| {
            encoding::encoder_for(encoding_type).expect("checked supported above")
        });

        let mut rect_body = BytesMut::new();
        if encoder.encode(&pixels, region.width, region.height, &native_format, &self.format, &mut rect_body).is_err() {
            let mut raw = Box::new(crate::encoding::raw::RawCodec) as Box<dyn Encoder>;
            rect_body.clear();
            raw.encode(&pixels, region.width, region.height, &native_format, &self.format, &mut rect_body)?;
            RectangleHeader { region, encoding_type: crate::wire::encoding::RAW }.write_to(out);
        } else {
            RectangleHeader { region, encoding_type }.write_to(out);
        }
        out.extend_from_slice(&rect_body);
        Ok(())
    }

    async fn send_raw_message(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await
    }
}

/// Awaits the next host-observed selection change, or never resolves if
/// no `ClipboardHost` was supplied. Kept as a free function, rather than a
/// `&mut self` method, so `message_loop`'s `select!` can hold this future
/// alongside `self.read_message()` without two conflicting mutable
/// borrows of `self`.
async fn recv_clipboard_change(
    rx: &mut Option<mpsc::UnboundedReceiver<(SelectionKind, Vec<u8>, u64)>>,
) -> Option<(SelectionKind, Vec<u8>, u64)> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn tile_differs(previous: &Framebuffer, current: &Framebuffer, tile: Region) -> bool {
    for y in tile.y as u16..tile.y as u16 + tile.height {
        for x in tile.x as u16..tile.x as u16 + tile.width {
            if previous.get_pixel(x, y) != current.get_pixel(x, y) {
                return true;
            }
        }
    }
    false
}

/// A fully parsed client-to-server message, read from the wire by
/// `RfbSession::read_message`.
#[derive(Debug, Clone)]
enum ClientMessage {
    SetPixelFormat(PixelFormat),
    SetEncodings(Vec<i32>),
    FramebufferUpdateRequest { region: Region, incremental: bool },
    KeyEvent { down: bool, keysym: u32 },
    PointerEvent { button_mask: u8, x: u16, y: u16 },
    ClientCutText(String),
    ExtendedClipboard { flags: u32, payload: Vec<u8> },
    SetDesktopSize { width: u16, height: u16 },
    EnableContinuousUpdates { enable: bool, region: Region },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::Framebuffer as Fb;
    use crate::pixelformat::Color;

    #[test]
    fn capabilities_parsed_from_encodings_list() {
        let caps = Capabilities::from_encodings(&[0, pseudo_encoding::LAST_RECT, pseudo_encoding::CURSOR]);
        assert!(caps.last_rect);
        assert!(caps.cursor);
        assert!(!caps.desktop_size);
    }

    #[test]
    fn tile_differs_detects_changed_pixel() {
        let mut a = Fb::new(4, 4, PixelFormat::rgba32());
        let b = Fb::new(4, 4, PixelFormat::rgba32());
        assert!(!tile_differs(&a, &b, Region::new(0, 0, 4, 4)));
        a.set_pixel(1, 1, a.format().pixel(Color::rgb(9, 9, 9)));
        assert!(tile_differs(&a, &b, Region::new(0, 0, 4, 4)));
    }

    #[test]
    fn stateless_encodings_are_poolable() {
        assert!(RfbSession::<tokio::io::DuplexStream>::is_poolable(crate::wire::encoding::RAW));
        assert!(RfbSession::<tokio::io::DuplexStream>::is_poolable(crate::wire::encoding::TRLE));
        assert!(!RfbSession::<tokio::io::DuplexStream>::is_poolable(crate::wire::encoding::ZLIB));
        assert!(!RfbSession::<tokio::io::DuplexStream>::is_poolable(crate::wire::encoding::ZRLE));
    }

    #[tokio::test]
    async fn clipboard_receiver_never_resolves_without_a_host() {
        let mut rx: Option<mpsc::UnboundedReceiver<(SelectionKind, Vec<u8>, u64)>> = None;
        tokio::select! {
            _ = recv_clipboard_change(&mut rx) => panic!("should never resolve"),
            () = tokio::time::sleep(Duration::from_millis(10)) => {}
        }
    }
}
