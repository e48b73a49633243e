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

//! TCP transport: the teacher's baseline stream, with `TCP_NODELAY` kept so
//! small handshake/input messages aren't held up by Nagle's algorithm.

use crate::error::{Result, VncError};
use tokio::net::{TcpListener, TcpStream};

/// Binds a listening socket on `addr` (e.g. `"0.0.0.0:5900"`).
pub async fn listen(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(VncError::Io)
}

/// Accepts one connection, disabling Nagle's algorithm on the accepted
/// socket, and returns the stream along with the peer's address string.
pub async fn accept(listener: &TcpListener) -> Result<(TcpStream, String)> {
    let (stream, addr) = listener.accept().await.map_err(VncError::Io)?;
    stream.set_nodelay(true).map_err(VncError::Io)?;
    Ok((stream, addr.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accept_reports_peer_address() {
        let listener = listen("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move { accept(&listener).await });
        let _client = TcpStream::connect(addr).await.unwrap();
        let (_, peer) = server.await.unwrap().unwrap();
        assert!(!peer.is_empty());
    }
}
