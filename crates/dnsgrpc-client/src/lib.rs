//! gRPC DNS client library.
//!
//! This crate turns the server-push watch stream of a CoreDNS-style gRPC DNS
//! service into a pull-style sequence of query results. It is UI-agnostic and
//! can be used by CLI tools, test harnesses and long-running services.
//!
//! ```no_run
//! use dnsgrpc_client::{ChannelConfig, DnsClient, ServerAddress, WatchResult};
//! use hickory_proto::rr::RecordType;
//!
//! # async fn run() -> dnsgrpc_client::Result<()> {
//! let address = ServerAddress::default();
//! let client = DnsClient::connect(&address, &ChannelConfig::default(), None).await?;
//!
//! let mut watch = client.watch_name_and_type("example.org", RecordType::A).await?;
//! while let Some(result) = watch.recv().await {
//!     match result {
//!         WatchResult::Resolved(message) => println!("{:?}", message.answers()),
//!         WatchResult::Error(err) => eprintln!("server error: {err}"),
//!         WatchResult::End => break,
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod query;
pub mod transport;
pub mod watch;

pub use client::DnsClient;
pub use config::{ChannelConfig, ClientConfig, TlsConfig, CONFIG_ENV_PREFIX};
pub use connection::{
    normalize_url, resolve_address, AddressError, AddressSource, ServerAddress,
    DEFAULT_GRPC_PORT, DEFAULT_SERVER_URL, SERVER_ENV_VAR,
};
pub use error::{ClientError, Result};
pub use query::{build_query, fqdn};
pub use transport::{GrpcTransport, ResponseStream, Transport};
pub use watch::{WatchResult, WatchSession};
