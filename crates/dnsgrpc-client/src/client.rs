//! gRPC client for querying and watching the DNS service.

use std::sync::Arc;

use dnsgrpc_proto::DnsPacket;
use hickory_proto::op::Message;
use hickory_proto::rr::RecordType;

use crate::config::{ChannelConfig, TlsConfig};
use crate::connection::ServerAddress;
use crate::error::Result;
use crate::query::build_query;
use crate::transport::{GrpcTransport, Transport};
use crate::watch::WatchSession;

/// Client for a gRPC DNS service.
///
/// Cloning is cheap; clones share the underlying transport. Every watch keeps
/// a clone so it can re-run its query when the server reports a change.
pub struct DnsClient<T: Transport = GrpcTransport> {
    transport: Arc<T>,
}

impl<T: Transport> Clone for DnsClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl DnsClient<GrpcTransport> {
    /// Connect to the DNS service at the given address.
    ///
    /// Plaintext unless `tls` is given; see [`GrpcTransport::connect`].
    pub async fn connect(
        address: &ServerAddress,
        config: &ChannelConfig,
        tls: Option<&TlsConfig>,
    ) -> Result<Self> {
        let transport = GrpcTransport::connect(address, config, tls).await?;
        Ok(Self::new(transport))
    }
}

impl<T: Transport> DnsClient<T> {
    /// Wrap an already-open transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// Perform a one-shot query.
    ///
    /// Packs `request`, sends it as a single unary call and unpacks the reply.
    /// Nothing is retried.
    pub async fn query(&self, request: &Message) -> Result<Message> {
        let packet = DnsPacket::pack(request)?;
        tracing::trace!(id = request.id(), bytes = packet.msg.len(), "Sending query");

        let reply = self.transport.query(packet).await.map_err(|status| {
            tracing::debug!(error = %status, "Query failed");
            status
        })?;
        Ok(reply.unpack()?)
    }

    /// Query by name and record type.
    pub async fn query_name_and_type(&self, name: &str, record_type: RecordType) -> Result<Message> {
        let request = build_query(name, record_type)?;
        self.query(&request).await
    }

    /// Ask the server to push change notifications for `request`.
    ///
    /// Returns once the server has confirmed the watch. The session then
    /// yields a freshly queried answer for every change notification.
    pub async fn watch(&self, request: Message) -> Result<WatchSession> {
        WatchSession::establish(self.clone(), request).await
    }

    /// Watch by name and record type.
    pub async fn watch_name_and_type(
        &self,
        name: &str,
        record_type: RecordType,
    ) -> Result<WatchSession> {
        let request = build_query(name, record_type)?;
        self.watch(request).await
    }
}
