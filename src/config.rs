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

//! Command-line surface for the `rfbcored` host binary.
//!
//! The teacher has no CLI of its own (it's a library embedded in an
//! application); this is built fresh against `clap`'s derive API the way
//! the rest of this crate's dependency stack is used elsewhere (`rand`,
//! `des`, `flate2` are all pulled in by name rather than hand-rolled).

use clap::{Parser, ValueEnum};

/// TLS mode selected by `--tls`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TlsMode {
    /// No TLS; VeNCrypt is not offered.
    None,
    /// VeNCrypt with an ephemeral self-signed certificate.
    Anon,
    /// VeNCrypt with an operator-supplied X.509 certificate chain.
    X509,
}

/// Host process configuration, parsed from argv.
#[derive(Debug, Parser)]
#[command(name = "rfbcored", version, about = "Remote-framebuffer server")]
pub struct Config {
    /// Address to listen on, e.g. `0.0.0.0:5900`. Omit to use stdin/stdout
    /// (inetd-style invocation).
    #[arg(long)]
    pub listen: Option<String>,

    /// Name of the display to capture, passed through to the capture
    /// collaborator untouched.
    #[arg(long, default_value = "default")]
    pub display: String,

    /// TLS mode for VeNCrypt.
    #[arg(long, value_enum, default_value_t = TlsMode::None)]
    pub tls: TlsMode,

    /// CA certificate path, required when `--tls x509`.
    #[arg(long)]
    pub tls_ca: Option<String>,

    /// Server certificate chain path, required when `--tls x509`.
    #[arg(long)]
    pub tls_cert: Option<String>,

    /// Server private key path, required when `--tls x509`.
    #[arg(long)]
    pub tls_key: Option<String>,

    /// Worker threads for parallel tile encoding. Defaults to the
    /// machine's available parallelism.
    #[arg(long)]
    pub threads: Option<usize>,

    /// Comma-separated list of debug areas to enable verbose logging for
    /// (e.g. `encoding,clipboard`). An empty list means the default
    /// `log`/`env_logger` level filtering applies.
    #[arg(long, value_delimiter = ',')]
    pub debug: Vec<String>,

    /// Shared password for VNC Authentication. Omit to allow
    /// unauthenticated connections.
    #[arg(long)]
    pub password: Option<String>,
}

impl Config {
    /// Validates cross-field constraints `clap` can't express directly
    /// (`--tls x509` requiring its three path arguments).
    pub fn validate(&self) -> Result<(), String> {
        if self.tls == TlsMode::X509 && (self.tls_ca.is_none() || self.tls_cert.is_none() || self.tls_key.is_none()) {
            return Err("--tls x509 requires --tls-ca, --tls-cert, and --tls-key".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x509_without_paths_is_rejected() {
        let config = Config { listen: None, display: "default".into(), tls: TlsMode::X509, tls_ca: None, tls_cert: None, tls_key: None, threads: None, debug: vec![], password: None };
        assert!(config.validate().is_err());
    }

    #[test]
    fn none_mode_needs_no_paths() {
        let config = Config { listen: None, display: "default".into(), tls: TlsMode::None, tls_ca: None, tls_cert: None, tls_key: None, threads: None, debug: vec![], password: None };
        assert!(config.validate().is_ok());
    }
}
