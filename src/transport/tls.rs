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

//! TLS transport wrapper (VeNCrypt's `x509` and `anonymous` sub-types).
//!
//! rustls has no anonymous-DH cipher suite (it dropped those deliberately
//! for security reasons), so "anonymous" mode here means: generate an
//! ephemeral, self-signed certificate at startup and serve X.509 TLS with
//! it, without asking the operator for a cert. Clients that don't verify
//! the server certificate (as `anonymous` implies) get the same encrypted
//! channel; clients that do verify it will reject an unknown CA, same as
//! they would against the self-signed cert any "anonymous" VeNCrypt server
//! actually presents in practice. See DESIGN.md's Open Questions.

use crate::error::{Result, VncError};
use rcgen::{CertifiedKey, generate_simple_self_signed};
use rustls::ServerConfig;
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;

/// Loads a PEM certificate chain and private key from disk and builds a
/// TLS acceptor for VeNCrypt's `x509` sub-type.
pub fn acceptor_from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<TlsAcceptor> {
    let certs = rustls_pemfile::certs(&mut std::io::Cursor::new(cert_pem))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| VncError::Tls(format!("parsing certificate chain: {e}")))?;
    let key = rustls_pemfile::private_key(&mut std::io::Cursor::new(key_pem))
        .map_err(|e| VncError::Tls(format!("parsing private key: {e}")))?
        .ok_or_else(|| VncError::Tls("no private key found in PEM".into()))?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| VncError::Tls(e.to_string()))?;
    Ok(TlsAcceptor::from(Arc::new(config)))
}

/// Builds a TLS acceptor backed by a freshly generated self-signed
/// certificate, for VeNCrypt's `anonymous` sub-type.
pub fn anonymous_acceptor(subject_alt_names: Vec<String>) -> Result<TlsAcceptor> {
    let CertifiedKey { cert, signing_key } = generate_simple_self_signed(subject_alt_names)
        .map_err(|e| VncError::Tls(format!("generating ephemeral certificate: {e}")))?;
    let cert_der = cert.der().clone();
    let key_der = rustls::pki_types::PrivateKeyDer::Pkcs8(signing_key.serialize_der().into());

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(vec![cert_der], key_der)
        .map_err(|e| VncError::Tls(e.to_string()))?;
    Ok(TlsAcceptor::from(Arc::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_acceptor_builds_without_error() {
        let result = anonymous_acceptor(vec!["localhost".to_string()]);
        assert!(result.is_ok());
    }
}
