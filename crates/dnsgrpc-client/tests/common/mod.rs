//! In-memory DNS service for exercising the client without a network.
//!
//! [`MockTransport`] answers unary queries from a shared record set and hands
//! the server side of every watch stream to the test as a [`ServerStream`].

use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dnsgrpc_client::{DnsClient, ResponseStream, Transport, WatchSession};
use dnsgrpc_proto::watch_request::RequestUnion;
use dnsgrpc_proto::{DnsPacket, WatchRequest, WatchResponse};
use hickory_proto::op::{Message, MessageType, OpCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{Name, RData, Record, RecordType};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// How long a test waits for something that should happen promptly.
pub const PROMPT: Duration = Duration::from_secs(5);

/// Shared server state.
#[derive(Default)]
struct State {
    records: Mutex<Vec<Record>>,
    queries: AtomicUsize,
    fail_queries: AtomicBool,
    corrupt_replies: AtomicBool,
}

/// Client-side transport backed by in-memory channels.
pub struct MockTransport {
    state: Arc<State>,
    streams: mpsc::UnboundedSender<ServerStream>,
}

/// Test handle on the mock server.
pub struct MockServer {
    state: Arc<State>,
    streams: mpsc::UnboundedReceiver<ServerStream>,
}

/// Build a client wired to a fresh mock server.
pub fn mock_client() -> (DnsClient<MockTransport>, MockServer) {
    let state = Arc::new(State::default());
    let (tx, rx) = mpsc::unbounded_channel();
    let transport = MockTransport {
        state: Arc::clone(&state),
        streams: tx,
    };
    (
        DnsClient::new(transport),
        MockServer { state, streams: rx },
    )
}

impl MockServer {
    /// Replace the record set served to queries.
    pub fn set_records(&self, records: Vec<Record>) {
        *self.state.records.lock().unwrap() = records;
    }

    /// Number of unary queries served so far.
    pub fn query_count(&self) -> usize {
        self.state.queries.load(Ordering::SeqCst)
    }

    /// Make unary queries fail with `UNAVAILABLE`.
    pub fn fail_queries(&self, fail: bool) {
        self.state.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Make unary queries return bytes that are not a DNS message.
    pub fn corrupt_replies(&self, corrupt: bool) {
        self.state.corrupt_replies.store(corrupt, Ordering::SeqCst);
    }

    /// Wait for the client to open a watch stream.
    pub async fn accept(&mut self) -> ServerStream {
        tokio::time::timeout(PROMPT, self.streams.recv())
            .await
            .expect("timed out waiting for a watch stream")
            .expect("transport dropped")
    }
}

/// Server side of one watch stream.
pub struct ServerStream {
    requests: Option<mpsc::UnboundedReceiver<WatchRequest>>,
    responses: Option<mpsc::UnboundedSender<Result<WatchResponse, tonic::Status>>>,
}

impl ServerStream {
    async fn next_request(&mut self) -> RequestUnion {
        let requests = self.requests.as_mut().expect("request side already closed");
        let request = tokio::time::timeout(PROMPT, requests.recv())
            .await
            .expect("timed out waiting for a watch request")
            .expect("client closed the request side");
        request.request_union.expect("empty watch request")
    }

    /// Wait for a create request and return the query it carries.
    pub async fn expect_create(&mut self) -> Message {
        match self.next_request().await {
            RequestUnion::CreateRequest(create) => create
                .query
                .expect("create request without query")
                .unpack()
                .expect("create request query does not unpack"),
            other => panic!("expected create request, got {other:?}"),
        }
    }

    /// Wait for a cancel request and return the watch id it names.
    pub async fn expect_cancel(&mut self) -> i64 {
        match self.next_request().await {
            RequestUnion::CancelRequest(cancel) => cancel.watch_id,
            other => panic!("expected cancel request, got {other:?}"),
        }
    }

    fn send(&self, response: Result<WatchResponse, tonic::Status>) {
        if let Some(responses) = &self.responses {
            // The client may already have hung up; that is what some tests check
            let _ = responses.send(response);
        }
    }

    pub fn created(&self, watch_id: i64) {
        self.send(Ok(WatchResponse {
            watch_id,
            created: true,
            ..Default::default()
        }));
    }

    pub fn changed(&self, watch_id: i64) {
        self.send(Ok(WatchResponse {
            watch_id,
            qname: "example.org.".to_string(),
            ..Default::default()
        }));
    }

    pub fn canceled(&self, watch_id: i64) {
        self.send(Ok(WatchResponse {
            watch_id,
            canceled: true,
            ..Default::default()
        }));
    }

    pub fn error(&self, watch_id: i64, err: &str) {
        self.send(Ok(WatchResponse {
            watch_id,
            err: err.to_string(),
            ..Default::default()
        }));
    }

    /// Fail the stream with a transport-level status.
    pub fn fail(&self, status: tonic::Status) {
        self.send(Err(status));
    }

    /// End the response stream gracefully.
    pub fn end(&mut self) {
        self.responses = None;
    }

    /// Stop accepting requests from the client.
    pub fn close_requests(&mut self) {
        self.requests = None;
    }

    /// Wait until the client stops reading responses.
    pub async fn client_hung_up(&self) {
        let responses = self.responses.as_ref().expect("response side already ended");
        tokio::time::timeout(PROMPT, responses.closed())
            .await
            .expect("client kept the watch stream open");
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn query(&self, packet: DnsPacket) -> Result<DnsPacket, tonic::Status> {
        self.state.queries.fetch_add(1, Ordering::SeqCst);

        if self.state.fail_queries.load(Ordering::SeqCst) {
            return Err(tonic::Status::unavailable("mock server unavailable"));
        }
        if self.state.corrupt_replies.load(Ordering::SeqCst) {
            return Ok(DnsPacket { msg: vec![0xde, 0xad] });
        }

        let request = packet
            .unpack()
            .map_err(|e| tonic::Status::invalid_argument(e.to_string()))?;

        let mut response = Message::new();
        response
            .set_id(request.id())
            .set_message_type(MessageType::Response)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(request.recursion_desired());

        let records = self.state.records.lock().unwrap().clone();
        for query in request.queries() {
            response.add_query(query.clone());
            for record in &records {
                if record.name() == query.name() && record.record_type() == query.query_type() {
                    response.add_answer(record.clone());
                }
            }
        }

        DnsPacket::pack(&response).map_err(|e| tonic::Status::internal(e.to_string()))
    }

    async fn watch(
        &self,
        requests: mpsc::UnboundedReceiver<WatchRequest>,
    ) -> Result<ResponseStream, tonic::Status> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.streams
            .send(ServerStream {
                requests: Some(requests),
                responses: Some(tx),
            })
            .map_err(|_| tonic::Status::unavailable("mock server gone"))?;
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}

/// An A record for `name`.
pub fn a_record(name: &str, addr: Ipv4Addr) -> Record {
    Record::from_rdata(Name::from_str(name).unwrap(), 300, RData::A(A(addr)))
}

/// Start a watch for `example.org A` and confirm it with `watch_id`.
pub async fn established_watch(
    client: &DnsClient<MockTransport>,
    server: &mut MockServer,
    watch_id: i64,
) -> (WatchSession, ServerStream) {
    let pending = {
        let client = client.clone();
        tokio::spawn(async move { client.watch_name_and_type("example.org", RecordType::A).await })
    };

    let mut stream = server.accept().await;
    stream.expect_create().await;
    stream.created(watch_id);

    let session = pending
        .await
        .expect("watch task panicked")
        .expect("watch was not established");
    (session, stream)
}
