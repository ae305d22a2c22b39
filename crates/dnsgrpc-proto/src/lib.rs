//! Protocol buffer definitions and conversions for the gRPC DNS service.
//!
//! This crate contains:
//! - Message types and the `DnsServiceClient` stub generated from `proto/dns.proto`
//! - Conversions between DNS messages and their opaque `DnsPacket` wire form
//! - [`ServerEvent`], the closed sum type a watch stream response decodes into
//!
//! # Architecture
//!
//! The proto types are kept separate from client logic to:
//! - Avoid transport-layer coupling in watch session code
//! - Keep the flag-based wire response out of the dispatch loop
//! - Provide clear boundaries for type conversions

pub mod convert;

/// `coredns.dns` protocol buffer types.
#[allow(missing_docs)]
pub mod dns {
    tonic::include_proto!("coredns.dns");
}

// Re-export commonly used types at crate root
pub use convert::ServerEvent;
pub use dns::*;
