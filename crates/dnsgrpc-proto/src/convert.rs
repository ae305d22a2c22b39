use crate::dns::{self, watch_request::RequestUnion};
use hickory_proto::error::ProtoError;
use hickory_proto::op::Message;

// DnsPacket <-> DNS message

impl dns::DnsPacket {
    /// Pack a DNS message into its wire form.
    pub fn pack(message: &Message) -> Result<Self, ProtoError> {
        Ok(Self {
            msg: message.to_vec()?,
        })
    }

    /// Unpack the wire form back into a DNS message.
    pub fn unpack(&self) -> Result<Message, ProtoError> {
        Message::from_vec(&self.msg)
    }
}

// Request envelopes

impl dns::WatchRequest {
    /// Envelope asking the server to start watching `query`.
    pub fn create(query: dns::DnsPacket) -> Self {
        Self {
            request_union: Some(RequestUnion::CreateRequest(dns::WatchCreateRequest {
                query: Some(query),
            })),
        }
    }

    /// Envelope asking the server to tear down watch `watch_id`.
    pub fn cancel(watch_id: i64) -> Self {
        Self {
            request_union: Some(RequestUnion::CancelRequest(dns::WatchCancelRequest {
                watch_id,
            })),
        }
    }
}

/// One inbound unit of a watch stream, with exactly one case populated.
///
/// The wire [`dns::WatchResponse`] carries independent `err`, `created` and
/// `canceled` fields. They are resolved in that order; a response with none
/// of them set is a change notification, which carries no payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// The server accepted a create request and assigned this watch id.
    Created(i64),
    /// The server reported an error for the watched query.
    Error(String),
    /// The server tore the watch down.
    Canceled,
    /// Something the watched query depends on changed.
    Changed,
}

impl From<dns::WatchResponse> for ServerEvent {
    fn from(response: dns::WatchResponse) -> Self {
        if !response.err.is_empty() {
            ServerEvent::Error(response.err)
        } else if response.created {
            ServerEvent::Created(response.watch_id)
        } else if response.canceled {
            ServerEvent::Canceled
        } else {
            ServerEvent::Changed
        }
    }
}
