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

//! Top-level server: binds a listener (or takes over stdin/stdout) and
//! spawns one `RfbSession` task per connection.
//!
//! The teacher has no standalone accept loop of its own to ground this on
//! (its `server.rs` wasn't part of the retrieved pack); this follows the
//! accept-then-spawn shape implied by `client.rs`'s per-connection
//! `VncClient::new` constructor and the crate's own doc example, generalized
//! to also cover the stdio and TLS-wrapped transports.

use crate::collaborators::{Capture, ClipboardHost, Input};
use crate::error::{Result, VncError};
use crate::session::handshake::SecurityPolicy;
use crate::session::{RfbSession, SessionConfig};
use crate::transport::tcp;
use log::{error, info};
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;

/// Everything the server needs to build a new session, supplied once by
/// the embedding application.
pub struct ServerContext {
    /// Desktop name advertised to clients.
    pub name: String,
    /// Security policy (None / VncAuth / VeNCrypt) offered to clients.
    pub security: SecurityPolicy,
    /// Cap on a single clipboard payload, in bytes.
    pub max_clipboard_payload: usize,
    /// Worker threads for parallel tile encoding. `None` uses the
    /// machine's available parallelism.
    pub threads: Option<usize>,
    /// Screen capture collaborator, shared across every session.
    pub capture: Arc<dyn Capture>,
    /// Factory producing a fresh input collaborator per session (some
    /// embedders want per-connection XTest client connections).
    pub input_factory: Arc<dyn Fn() -> Box<dyn Input> + Send + Sync>,
    /// Clipboard host collaborator, shared across every session.
    pub clipboard_host: Option<Arc<dyn ClipboardHost>>,
    /// TLS acceptor to wrap accepted sockets with, if VeNCrypt TLS
    /// sub-types are in play.
    pub tls_acceptor: Option<TlsAcceptor>,
}

impl ServerContext {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            name: self.name.clone(),
            security: self.security.clone(),
            max_clipboard_payload: self.max_clipboard_payload,
            threads: self.threads,
        }
    }
}

/// Binds `addr` and serves connections until the process is terminated or
/// the listener errors out.
pub async fn serve_tcp(addr: &str, ctx: Arc<ServerContext>) -> Result<()> {
    let listener = tcp::listen(addr).await?;
    info!("listening on {addr}");
    loop {
        let (stream, peer) = tcp::accept(&listener).await?;
        let ctx = ctx.clone();
        tokio::spawn(async move {
            info!("client connected: {peer}");
            if let Err(e) = run_session_over_tcp(stream, &ctx).await {
                error!("session with {peer} ended: {e}");
            } else {
                info!("client disconnected: {peer}");
            }
        });
    }
}

/// Serves exactly one session over a pre-connected stdin/stdout duplex
/// stream, returning once that session ends. Used for inetd-style
/// invocation where a supervisor hands the process one connection.
pub async fn serve_stdio(ctx: Arc<ServerContext>) -> Result<()> {
    let stdio = crate::transport::stdio::Stdio::new();
    let input = (ctx.input_factory)();
    RfbSession::run(stdio, ctx.session_config(), ctx.capture.clone(), input, ctx.clipboard_host.clone()).await
}

async fn run_session_over_tcp(stream: tokio::net::TcpStream, ctx: &Arc<ServerContext>) -> Result<()> {
    let input = (ctx.input_factory)();
    match &ctx.tls_acceptor {
        Some(acceptor) => {
            let tls_stream = acceptor.accept(stream).await.map_err(|e| VncError::Tls(e.to_string()))?;
            RfbSession::run(tls_stream, ctx.session_config(), ctx.capture.clone(), input, ctx.clipboard_host.clone()).await
        }
        None => RfbSession::run(stream, ctx.session_config(), ctx.capture.clone(), input, ctx.clipboard_host.clone()).await,
    }
}
