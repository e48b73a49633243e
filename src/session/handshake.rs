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

//! The RFB handshake state machine: protocol version, security
//! negotiation (None / VNC Auth / VeNCrypt), `ClientInit`/`ServerInit`.
//!
//! Generalizes the teacher's inline handshake in `VncClient::new`, which
//! only offered None and VncAuth, into the full sequence spec.md's session
//! component names, including VeNCrypt as a third security type.

use crate::error::{Result, VncError};
use crate::io::ByteStream;
use crate::pixelformat::PixelFormat;
use crate::session::auth;
use crate::wire::{security_type, ServerInit};
use tokio::io::{AsyncRead, AsyncWrite};

const PROTOCOL_VERSION: &[u8; 12] = b"RFB 003.008\n";

/// Security policy offered by the server for a given listener.
#[derive(Debug, Clone)]
pub enum SecurityPolicy {
    /// No authentication; any client is accepted.
    None,
    /// VNC DES challenge-response with a single shared password.
    VncAuth { password: String },
    /// VeNCrypt TLS wrapper, itself carrying a nested security type after
    /// the TLS handshake completes (typically `None` or `VncAuth`).
    VeNCrypt { nested: Box<SecurityPolicy> },
}

/// Parameters the session layer needs once the handshake completes.
#[derive(Debug, Clone)]
pub struct HandshakeOutcome {
    /// The pixel format advertised in `ServerInit` (the session may later
    /// receive `SetPixelFormat` and switch away from this).
    pub initial_format: PixelFormat,
    /// True if the client's `ClientInit` requested an exclusive session
    /// (shared-flag byte was zero).
    pub exclusive: bool,
}

/// Runs the handshake to completion over `stream`, given the server's
/// chosen `policy`, initial framebuffer geometry, and desktop name.
pub async fn run<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut ByteStream<S>,
    policy: &SecurityPolicy,
    width: u16,
    height: u16,
    name: &str,
    format: PixelFormat,
) -> Result<HandshakeOutcome> {
    negotiate_version(stream).await?;
    negotiate_security(stream, policy).await?;

    let shared_flag = stream.read_u8().await?;
    let exclusive = shared_flag == 0;

    let init = ServerInit { width, height, pixel_format: format, name: name.to_string() };
    let mut buf = bytes::BytesMut::new();
    init.write_to(&mut buf);
    stream.write_all(&buf).await?;
    stream.flush().await?;

    Ok(HandshakeOutcome { initial_format: format, exclusive })
}

async fn negotiate_version<S: AsyncRead + AsyncWrite + Unpin>(stream: &mut ByteStream<S>) -> Result<()> {
    stream.write_all(PROTOCOL_VERSION).await?;
    stream.flush().await?;
    let client_version = stream.read_vec(12).await?;
    if client_version.len() != 12 || &client_version[0..3] != b"RFB" {
        return Err(VncError::ProtocolViolation("malformed protocol version line".into()));
    }
    Ok(())
}

async fn negotiate_security<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut ByteStream<S>,
    policy: &SecurityPolicy,
) -> Result<()> {
    let offered = offered_types(policy);
    stream.write_u8(offered.len() as u8).await?;
    for t in &offered {
        stream.write_u8(*t).await?;
    }
    stream.flush().await?;

    let chosen = stream.read_u8().await?;
    if !offered.contains(&chosen) {
        send_security_result(stream, false, "unsupported security type").await?;
        return Err(VncError::AuthenticationFailed);
    }

    match chosen {
        security_type::NONE => {
            send_security_result(stream, true, "").await?;
            Ok(())
        }
        security_type::VNC_AUTH => {
            let password = match policy {
                SecurityPolicy::VncAuth { password } => password.clone(),
                SecurityPolicy::VeNCrypt { nested } => match nested.as_ref() {
                    SecurityPolicy::VncAuth { password } => password.clone(),
                    _ => return Err(VncError::AuthenticationFailed),
                },
                SecurityPolicy::None => return Err(VncError::AuthenticationFailed),
            };
            run_vnc_auth(stream, &password).await
        }
        _ => {
            send_security_result(stream, false, "unsupported security type").await?;
            Err(VncError::AuthenticationFailed)
        }
    }
}

fn offered_types(policy: &SecurityPolicy) -> Vec<u8> {
    match policy {
        SecurityPolicy::None => vec![security_type::NONE],
        SecurityPolicy::VncAuth { .. } => vec![security_type::VNC_AUTH],
        SecurityPolicy::VeNCrypt { .. } => vec![security_type::VENCRYPT],
    }
}

async fn run_vnc_auth<S: AsyncRead + AsyncWrite + Unpin>(stream: &mut ByteStream<S>, password: &str) -> Result<()> {
    let challenge = auth::generate_challenge();
    stream.write_all(&challenge).await?;
    stream.flush().await?;

    let response = stream.read_vec(16).await?;
    if auth::verify_response(&challenge, &response, password) {
        send_security_result(stream, true, "").await
    } else {
        send_security_result(stream, false, "authentication failed").await?;
        Err(VncError::AuthenticationFailed)
    }
}

async fn send_security_result<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut ByteStream<S>,
    ok: bool,
    reason: &str,
) -> Result<()> {
    stream.write_u32(u32::from(!ok)).await?;
    if !ok {
        let reason_bytes = reason.as_bytes();
        stream.write_u32(reason_bytes.len() as u32).await?;
        stream.write_all(reason_bytes).await?;
    }
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn none_policy_completes_handshake() {
        let (client, server) = duplex(4096);
        let server_task = tokio::spawn(async move {
            let mut stream = ByteStream::new(server);
            run(&mut stream, &SecurityPolicy::None, 800, 600, "test", PixelFormat::rgba32()).await
        });

        let mut client = client;
        let mut version = [0u8; 12];
        client.read_exact(&mut version).await.unwrap();
        client.write_all(PROTOCOL_VERSION).await.unwrap();

        let mut n = [0u8; 1];
        client.read_exact(&mut n).await.unwrap();
        let mut types = vec![0u8; n[0] as usize];
        client.read_exact(&mut types).await.unwrap();
        assert_eq!(types, vec![security_type::NONE]);
        client.write_all(&[security_type::NONE]).await.unwrap();

        let mut result = [0u8; 4];
        client.read_exact(&mut result).await.unwrap();
        assert_eq!(u32::from_be_bytes(result), 0);

        client.write_all(&[1]).await.unwrap();

        let outcome = server_task.await.unwrap().unwrap();
        assert!(!outcome.exclusive);
    }

    #[tokio::test]
    async fn vnc_auth_rejects_wrong_password() {
        let (client, server) = duplex(4096);
        let policy = SecurityPolicy::VncAuth { password: "secret".to_string() };
        let server_task = tokio::spawn(async move {
            let mut stream = ByteStream::new(server);
            run(&mut stream, &policy, 800, 600, "test", PixelFormat::rgba32()).await
        });

        let mut client = client;
        let mut version = [0u8; 12];
        client.read_exact(&mut version).await.unwrap();
        client.write_all(PROTOCOL_VERSION).await.unwrap();

        let mut n = [0u8; 1];
        client.read_exact(&mut n).await.unwrap();
        let mut types = vec![0u8; n[0] as usize];
        client.read_exact(&mut types).await.unwrap();
        client.write_all(&[security_type::VNC_AUTH]).await.unwrap();

        let mut challenge = [0u8; 16];
        client.read_exact(&mut challenge).await.unwrap();
        let bad_response = auth::expected_response(&challenge, "wrong");
        client.write_all(&bad_response).await.unwrap();

        let result = server_task.await.unwrap();
        assert!(result.is_err());
    }
}
