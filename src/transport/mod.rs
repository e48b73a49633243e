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

//! Transport abstraction: TCP, stdio, TLS, and a persistent-zlib decorator.
//!
//! The teacher's `VncClient` holds a bare `TcpStream`; sessions here hold a
//! boxed trait object so the same handshake and message loop run over any
//! of the concrete transports below.

pub mod stdio;
pub mod tcp;
pub mod tls;
pub mod zlibstream;

use tokio::io::{AsyncRead, AsyncWrite};

/// Anything the session layer can read from and write to.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

/// A boxed transport, used where the concrete stream type is chosen at
/// runtime (TCP vs stdio vs TLS-wrapped).
pub type BoxedTransport = Box<dyn Transport>;
