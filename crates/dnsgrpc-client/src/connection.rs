//! Server address resolution.
//!
//! The address to dial comes from, in order:
//! 1. `--server` on the command line (an invalid value is an error)
//! 2. `server = "..."` in the configuration file
//! 3. the `DNSGRPC_SERVER` environment variable
//! 4. `http://localhost:5553`
//!
//! Invalid values from 2 and 3 are logged and skipped.
//!
//! ```
//! use dnsgrpc_client::connection::{AddressSource, ServerAddress};
//!
//! let addr = ServerAddress::parse("10.0.0.53", AddressSource::CommandLine)?;
//! assert_eq!(addr.as_str(), "http://10.0.0.53:5553/");
//! # Ok::<(), dnsgrpc_client::connection::AddressError>(())
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

use crate::error::Result;

/// Default gRPC port for the DNS service.
pub const DEFAULT_GRPC_PORT: u16 = 5553;

/// Default server address when no configuration is provided.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5553";

/// Environment variable consulted for the server address.
pub const SERVER_ENV_VAR: &str = "DNSGRPC_SERVER";

/// Where a server address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressSource {
    /// Built-in `http://localhost:5553`
    Default,
    /// `DNSGRPC_SERVER`
    Environment,
    /// `server` key of the config file
    ConfigFile,
    /// `--server`
    CommandLine,
}

impl AddressSource {
    /// Short label for structured log fields.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Environment => "env",
            Self::ConfigFile => "config",
            Self::CommandLine => "cli",
        }
    }
}

impl fmt::Display for AddressSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Environment => write!(f, "from {SERVER_ENV_VAR}"),
            Self::ConfigFile => f.write_str("from config file"),
            Self::CommandLine => f.write_str("from command line"),
        }
    }
}

/// Invalid server address.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Blank input
    #[error("server address is empty")]
    Empty,
    /// Not parseable as a URL
    #[error("invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// Neither http nor https
    #[error("unsupported scheme '{0}' (use http or https)")]
    UnsupportedScheme(String),
    /// No host to dial
    #[error("server URL has no host")]
    MissingHost,
}

/// A normalized `http(s)://host:port/` URL that tonic can dial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    url: String,
    source: AddressSource,
}

impl ServerAddress {
    /// Normalize `input` (see [`normalize_url`]) and tag it with its source.
    pub fn parse(input: &str, source: AddressSource) -> std::result::Result<Self, AddressError> {
        Ok(Self {
            url: normalize_url(input)?.to_string(),
            source,
        })
    }

    /// Normalized URL string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Where this address came from.
    #[must_use]
    pub fn source(&self) -> AddressSource {
        self.source
    }

    /// Returns `true` for an https address.
    #[must_use]
    pub fn is_tls(&self) -> bool {
        self.url.starts_with("https://")
    }

    /// Returns the same address with the scheme switched to `https`.
    #[must_use]
    pub fn with_tls(mut self) -> Self {
        if let Some(rest) = self.url.strip_prefix("http://") {
            self.url = format!("https://{rest}");
        }
        self
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

impl FromStr for ServerAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s, AddressSource::CommandLine)
    }
}

impl Default for ServerAddress {
    fn default() -> Self {
        Self {
            url: format!("{DEFAULT_SERVER_URL}/"),
            source: AddressSource::Default,
        }
    }
}

/// Trim `input`, add `http://` when no scheme is given and port 5553 when no
/// port is given. Only http and https are accepted.
pub fn normalize_url(input: &str) -> std::result::Result<Url, AddressError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AddressError::Empty);
    }

    let mut url = if input.contains("://") {
        Url::parse(input)?
    } else {
        Url::parse(&format!("http://{input}"))?
    };

    if !matches!(url.scheme(), "http" | "https") {
        return Err(AddressError::UnsupportedScheme(url.scheme().to_string()));
    }
    if url.host().is_none() {
        return Err(AddressError::MissingHost);
    }
    if url.port().is_none() {
        url.set_port(Some(DEFAULT_GRPC_PORT))
            .map_err(|()| AddressError::MissingHost)?;
    }
    Ok(url)
}

/// Pick the server address from the command line, the config file, the
/// environment or the default, in that order.
///
/// A command-line value must be valid. Bad config-file and environment values
/// are skipped with a warning.
pub fn resolve_address(
    command_line: Option<&str>,
    config_file: Option<&str>,
) -> Result<ServerAddress> {
    if let Some(input) = command_line {
        return Ok(ServerAddress::parse(input, AddressSource::CommandLine)?);
    }

    let fallbacks = [
        (config_file.map(str::to_string), AddressSource::ConfigFile),
        (std::env::var(SERVER_ENV_VAR).ok(), AddressSource::Environment),
    ];
    for (input, source) in fallbacks {
        let Some(input) = input.filter(|s| !s.trim().is_empty()) else {
            continue;
        };
        match ServerAddress::parse(&input, source) {
            Ok(addr) => return Ok(addr),
            Err(e) => {
                tracing::warn!(source = source.label(), input = %input, error = %e, "Ignoring invalid server address");
            }
        }
    }

    Ok(ServerAddress::default())
}
