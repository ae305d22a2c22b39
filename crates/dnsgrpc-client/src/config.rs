//! Client configuration using Figment.
//!
//! Configuration is loaded from:
//! 1. An optional TOML file
//! 2. Environment variables prefixed with `DNSGRPC_` (`__` separates nesting)
//!
//! ```toml
//! server = "dns.example.com:5553"
//!
//! [channel]
//! connect_timeout = "5s"
//! request_timeout = "30s"
//!
//! [tls]
//! ca = "/etc/dnsgrpc/ca.pem"
//! cert = "/etc/dnsgrpc/client.pem"
//! key = "/etc/dnsgrpc/client.key"
//! ```
//!
//! `DNSGRPC_SERVER` is not merged here; it takes part in address resolution
//! at lower priority than the file (see [`crate::connection::resolve_address`]).

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tonic::transport::{Certificate, ClientTlsConfig, Identity};

use crate::error::{ClientError, Result};

/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "DNSGRPC_";

/// Top-level client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server address, as accepted by [`crate::connection::normalize_url`]
    pub server: Option<String>,
    /// Channel tuning
    pub channel: ChannelConfig,
    /// TLS material; plaintext when absent
    pub tls: Option<TlsConfig>,
}

impl ClientConfig {
    /// Load configuration from environment variables only.
    pub fn load() -> std::result::Result<Self, figment::Error> {
        Self::figment(None).extract()
    }

    /// Load configuration from a TOML file, overridden by environment variables.
    ///
    /// The file must exist.
    pub fn load_from<P: AsRef<Path>>(path: P) -> std::result::Result<Self, figment::Error> {
        Self::figment(Some(path.as_ref())).extract()
    }

    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Toml::file_exact(path));
        }
        figment.merge(
            Env::prefixed(CONFIG_ENV_PREFIX)
                .split("__")
                .ignore(&["server"]),
        )
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> Result<()> {
        if let Some(tls) = &self.tls {
            tls.validate()?;
        }
        if self.channel.connect_timeout.is_zero() {
            return Err(ClientError::InvalidConfig(
                "channel.connect_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// gRPC channel configuration.
///
/// Only unary calls honour `request_timeout`; the watch stream runs on a
/// separate channel without one, so a quiet watch is never cut off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// How long to wait for the initial connection
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Timeout for one-shot queries (none by default)
    #[serde(with = "humantime_serde")]
    pub request_timeout: Option<Duration>,
    /// HTTP/2 keepalive interval
    #[serde(with = "humantime_serde")]
    pub keepalive_interval: Duration,
    /// How long to wait for a keepalive response
    #[serde(with = "humantime_serde")]
    pub keepalive_timeout: Duration,
    /// Whether to send keepalive pings even when idle
    pub keepalive_while_idle: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            keepalive_interval: Duration::from_secs(10),
            keepalive_timeout: Duration::from_secs(20),
            keepalive_while_idle: true,
        }
    }
}

impl ChannelConfig {
    /// Fast configuration for local connections.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            request_timeout: Some(Duration::from_secs(5)),
            keepalive_interval: Duration::from_secs(15),
            keepalive_timeout: Duration::from_secs(5),
            keepalive_while_idle: true,
        }
    }
}

/// PEM files for a TLS connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// CA bundle used to verify the server
    pub ca: Option<PathBuf>,
    /// Client certificate
    pub cert: Option<PathBuf>,
    /// Client private key
    pub key: Option<PathBuf>,
}

impl TlsConfig {
    /// Build from optional command-line style arguments; `None` when all are unset.
    #[must_use]
    pub fn from_parts(
        cert: Option<PathBuf>,
        key: Option<PathBuf>,
        ca: Option<PathBuf>,
    ) -> Option<Self> {
        let tls = Self { ca, cert, key };
        (!tls.is_empty()).then_some(tls)
    }

    /// Returns true if no TLS material is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ca.is_none() && self.cert.is_none() && self.key.is_none()
    }

    /// Check that the client identity is complete.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(ClientError::InvalidConfig(
                "tls section requires at least one of ca, cert, key".to_string(),
            ));
        }
        match (&self.cert, &self.key) {
            (Some(_), None) => Err(ClientError::InvalidConfig(
                "tls.cert given without tls.key".to_string(),
            )),
            (None, Some(_)) => Err(ClientError::InvalidConfig(
                "tls.key given without tls.cert".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Read the PEM files into a tonic TLS configuration.
    pub fn load(&self) -> Result<ClientTlsConfig> {
        self.validate()?;

        let mut tls = ClientTlsConfig::new();
        if let Some(ca) = &self.ca {
            tls = tls.ca_certificate(Certificate::from_pem(std::fs::read(ca)?));
        }
        if let (Some(cert), Some(key)) = (&self.cert, &self.key) {
            tls = tls.identity(Identity::from_pem(
                std::fs::read(cert)?,
                std::fs::read(key)?,
            ));
        }
        Ok(tls)
    }
}
