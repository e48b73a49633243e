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

//! `rfbcored`: the host binary wiring the engine to collaborators.
//!
//! Real screen capture and input injection (XCB/X11, RandR, PAM) are out of
//! scope for this crate, the same way the teacher's own `headless_server`
//! example (`examples/headless_server.rs`) drives its `VncServer` with a
//! generated animated pattern instead of a real display. This binary does
//! the same: an animated-gradient `Capture` collaborator stands in for a
//! real display so the engine is runnable and demonstrable end-to-end.

use clap::Parser;
use log::{error, info, warn};
use rfbcore::collaborators::{Capture, ClipboardHost, Input, MonitorLayout};
use rfbcore::config::{Config, TlsMode};
use rfbcore::error::Result;
use rfbcore::framebuffer::Framebuffer;
use rfbcore::geometry::Region;
use rfbcore::pixelformat::{Color, PixelFormat};
use rfbcore::server::{self, ServerContext};
use rfbcore::session::handshake::SecurityPolicy;
use rfbcore::transport::tls;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

const DEMO_WIDTH: u16 = 1024;
const DEMO_HEIGHT: u16 = 768;

struct DemoCapture {
    frame: AtomicU32,
}

impl Capture for DemoCapture {
    fn snapshot(&self, region: Region) -> Framebuffer {
        let frame = self.frame.fetch_add(1, Ordering::Relaxed);
        let format = PixelFormat::rgba32();
        let mut fb = Framebuffer::new(region.width, region.height, format);
        for y in 0..region.height {
            for x in 0..region.width {
                let r = ((x as u32 + frame) % 256) as u8;
                let g = ((y as u32 + frame) % 256) as u8;
                let b = ((frame / 2) % 256) as u8;
                fb.set_pixel(x, y, format.pixel(Color::rgb(r, g, b)));
            }
        }
        fb.draw_text(8, 8, "rfbcored demo", Color::rgb(255, 255, 255), None);
        fb
    }

    fn screen_size(&self) -> (u16, u16) {
        (DEMO_WIDTH, DEMO_HEIGHT)
    }

    fn resize(&self, _monitors: &[MonitorLayout]) -> Result<Vec<MonitorLayout>> {
        warn!("demo capture does not support resize; reporting the fixed demo geometry");
        Ok(vec![MonitorLayout { x: 0, y: 0, width: DEMO_WIDTH, height: DEMO_HEIGHT }])
    }
}

struct DemoInput;

impl Input for DemoInput {
    fn key_press_release(&self, keycode: u32, down: bool) {
        info!("demo input: key {keycode} {}", if down { "down" } else { "up" });
    }

    fn pointer(&self, x: u16, y: u16, buttons: u8) {
        info!("demo input: pointer ({x}, {y}) buttons={buttons:#04b}");
    }

    fn switch_layout_group(&self, index: u32) {
        info!("demo input: switch layout group {index}");
    }

    fn keysym_to_keycode(&self, keysym: u32, _group: u32) -> Option<u32> {
        Some(keysym & 0xff)
    }
}

struct DemoClipboard;

impl ClipboardHost for DemoClipboard {
    fn set_selection(&self, kind: rfbcore::clipboard::SelectionKind, bytes: Vec<u8>, cookie: u64) {
        info!("demo clipboard: {kind:?} set to {} bytes (cookie {cookie})", bytes.len());
    }

    fn observe_selection(&self, _on_change: Box<dyn Fn(rfbcore::clipboard::SelectionKind, Vec<u8>, u64) + Send + Sync>) {
        // The demo clipboard never changes on its own; nothing to observe.
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    env_logger::init();
    let config = Config::parse();
    if let Err(e) = config.validate() {
        error!("invalid configuration: {e}");
        return std::process::ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!("server error: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<()> {
    let security = match config.password {
        Some(password) => SecurityPolicy::VncAuth { password },
        None => SecurityPolicy::None,
    };

    let tls_acceptor = match config.tls {
        TlsMode::None => None,
        TlsMode::Anon => Some(tls::anonymous_acceptor(vec!["rfbcored".to_string()])?),
        TlsMode::X509 => {
            let cert = std::fs::read(config.tls_cert.as_deref().unwrap())?;
            let key = std::fs::read(config.tls_key.as_deref().unwrap())?;
            Some(tls::acceptor_from_pem(&cert, &key)?)
        }
    };

    let ctx = Arc::new(ServerContext {
        name: format!("rfbcored ({})", config.display),
        security,
        max_clipboard_payload: rfbcore::clipboard::DEFAULT_MAX_PAYLOAD,
        threads: config.threads,
        capture: Arc::new(DemoCapture { frame: AtomicU32::new(0) }),
        input_factory: Arc::new(|| Box::new(DemoInput) as Box<dyn Input>),
        clipboard_host: Some(Arc::new(DemoClipboard)),
        tls_acceptor,
    });

    match config.listen {
        Some(addr) => server::serve_tcp(&addr, ctx).await,
        None => server::serve_stdio(ctx).await,
    }
}
