//! RPC channel to the DNS service.
//!
//! [`Transport`] is the seam between the client logic and the wire: a unary
//! `Query` call and the bidirectional `Watch` stream. [`GrpcTransport`] is the
//! tonic implementation; tests substitute an in-memory one.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use dnsgrpc_proto::dns_service_client::DnsServiceClient;
use dnsgrpc_proto::{DnsPacket, WatchRequest, WatchResponse};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tonic::transport::{Channel, Endpoint};

use crate::config::{ChannelConfig, TlsConfig};
use crate::connection::ServerAddress;
use crate::error::{ClientError, Result};

/// Server side of a watch stream, as seen by the client.
pub type ResponseStream =
    Pin<Box<dyn Stream<Item = std::result::Result<WatchResponse, tonic::Status>> + Send>>;

/// An open, authenticated channel to the DNS service.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send one packed query and wait for the packed reply.
    async fn query(&self, packet: DnsPacket) -> std::result::Result<DnsPacket, tonic::Status>;

    /// Open a watch stream.
    ///
    /// Every request pushed into the sender paired with `requests` goes out
    /// on the stream, in order. Requests queued before the call are sent as
    /// soon as the stream opens.
    async fn watch(
        &self,
        requests: mpsc::UnboundedReceiver<WatchRequest>,
    ) -> std::result::Result<ResponseStream, tonic::Status>;
}

/// Maximum decoded message size; large zone transfers exceed the 4 MB default.
const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// tonic-backed [`Transport`].
#[derive(Clone)]
pub struct GrpcTransport {
    /// Client for unary calls (honours the request timeout)
    unary: DnsServiceClient<Channel>,
    /// Dedicated client for watch streams (no request timeout)
    streaming: DnsServiceClient<Channel>,
}

impl GrpcTransport {
    /// Dial the server.
    ///
    /// With `tls` set, the PEM files are read and the connection uses https
    /// regardless of the scheme in `address`.
    pub async fn connect(
        address: &ServerAddress,
        config: &ChannelConfig,
        tls: Option<&TlsConfig>,
    ) -> Result<Self> {
        let address = match tls {
            Some(_) => address.clone().with_tls(),
            None => address.clone(),
        };

        let mut endpoint = Self::endpoint(&address, config)?;
        if let Some(timeout) = config.request_timeout {
            endpoint = endpoint.timeout(timeout);
        }

        // Watch streams may stay quiet for hours; never put a request timeout on them
        let mut streaming_endpoint = Self::endpoint(&address, config)?.tcp_nodelay(true);

        if let Some(tls) = tls {
            let tls_config = tls.load()?;
            endpoint = endpoint.tls_config(tls_config.clone())?;
            streaming_endpoint = streaming_endpoint.tls_config(tls_config)?;
        }

        tracing::debug!(
            address = %address,
            source = address.source().label(),
            tls = address.is_tls(),
            "Connecting to DNS service"
        );

        let channel = endpoint.connect().await?;
        let streaming_channel = streaming_endpoint.connect().await?;

        Ok(Self {
            unary: DnsServiceClient::new(channel).max_decoding_message_size(MAX_MESSAGE_SIZE),
            streaming: DnsServiceClient::new(streaming_channel)
                .max_decoding_message_size(MAX_MESSAGE_SIZE),
        })
    }

    fn endpoint(address: &ServerAddress, config: &ChannelConfig) -> Result<Endpoint> {
        Ok(Channel::from_shared(address.as_str().to_string())
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?
            .connect_timeout(config.connect_timeout)
            .http2_keep_alive_interval(config.keepalive_interval)
            .keep_alive_timeout(config.keepalive_timeout)
            .keep_alive_while_idle(config.keepalive_while_idle)
            .tcp_keepalive(Some(Duration::from_secs(60))))
    }
}

#[async_trait]
impl Transport for GrpcTransport {
    async fn query(&self, packet: DnsPacket) -> std::result::Result<DnsPacket, tonic::Status> {
        let response = self.unary.clone().query(packet).await?;
        Ok(response.into_inner())
    }

    async fn watch(
        &self,
        requests: mpsc::UnboundedReceiver<WatchRequest>,
    ) -> std::result::Result<ResponseStream, tonic::Status> {
        let response = self
            .streaming
            .clone()
            .watch(UnboundedReceiverStream::new(requests))
            .await?;
        Ok(response.into_inner().boxed())
    }
}
