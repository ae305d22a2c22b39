//! Watch sessions.
//!
//! A watch turns the server's push notifications into a pull-style sequence
//! of [`WatchResult`]s. The server only signals that something changed; the
//! session answers each signal by re-running the original query and handing
//! the fresh answer to the consumer.
//!
//! # Lifecycle
//!
//! ```text
//! watch() ──create──> server
//!         <─created── server          (session returned to caller)
//!
//! dispatch task:
//!   changed  ──> re-query ──> Resolved      (loop)
//!   err      ──> Error, close
//!   canceled ──> End, close
//!   created / stream error / end of stream ──> close
//! ```
//!
//! The result sequence has a single producer (the dispatch task) and is
//! closed exactly once, after the last result. [`WatchSession::stop`] only
//! asks the server to cancel; the sequence ends when the server's
//! acknowledgement comes back.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dnsgrpc_proto::{DnsPacket, ServerEvent, WatchRequest};
use futures::{Stream, StreamExt};
use hickory_proto::op::Message;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::client::DnsClient;
use crate::error::{ClientError, Result};
use crate::transport::{ResponseStream, Transport};

/// One item of a watch's result sequence.
#[derive(Debug, Clone)]
pub enum WatchResult {
    /// Answer to the watched query after a change notification.
    Resolved(Message),
    /// The server reported an error; nothing follows.
    Error(String),
    /// The server canceled the watch; nothing follows.
    End,
}

impl WatchResult {
    /// Returns the resolved message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&Message> {
        match self {
            Self::Resolved(message) => Some(message),
            _ => None,
        }
    }

    /// Returns true for the end marker.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }
}

/// An established watch.
///
/// Drain it with [`recv`](Self::recv) or [`results`](Self::results). A
/// sequence that closes without an [`WatchResult::End`] or
/// [`WatchResult::Error`] ended because of a transport or protocol failure;
/// those are logged, not returned.
pub struct WatchSession {
    id: i64,
    requests: mpsc::UnboundedSender<WatchRequest>,
    results: mpsc::UnboundedReceiver<WatchResult>,
    closed: Arc<AtomicBool>,
}

impl WatchSession {
    /// Open the stream, send the create request and wait for the server to
    /// confirm it. On success the dispatch task is running.
    pub(crate) async fn establish<T: Transport>(
        client: DnsClient<T>,
        query: Message,
    ) -> Result<Self> {
        let packet = DnsPacket::pack(&query)?;

        let (requests, outbound) = mpsc::unbounded_channel();
        // Queued before the stream opens; some servers hold back headers until it arrives
        requests
            .send(WatchRequest::create(packet))
            .map_err(|_| ClientError::StreamClosed("watch request channel closed".to_string()))?;

        let mut responses = client.transport().watch(outbound).await?;

        let response = match responses.next().await {
            Some(response) => response?,
            None => return Err(ClientError::Protocol("no response to create".to_string())),
        };
        let id = match ServerEvent::from(response.clone()) {
            ServerEvent::Created(id) => id,
            _ => {
                return Err(ClientError::Protocol(format!(
                    "unexpected response: {response:?}"
                )))
            }
        };
        debug!(watch_id = id, "Watch created");

        let (results_tx, results) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let dispatch = Dispatch {
            id,
            client,
            query,
            responses,
            results: results_tx,
            closed: Arc::clone(&closed),
        };
        tokio::spawn(dispatch.run());

        Ok(Self {
            id,
            requests,
            results,
            closed,
        })
    }

    /// Server-assigned watch id.
    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Wait for the next result; `None` once the sequence is closed.
    pub async fn recv(&mut self) -> Option<WatchResult> {
        self.results.recv().await
    }

    /// The result sequence as a stream, ending when the watch ends.
    pub fn results(&mut self) -> impl Stream<Item = WatchResult> + '_ {
        futures::stream::poll_fn(move |cx| self.results.poll_recv(cx))
    }

    /// Returns true once the dispatch task has exited.
    ///
    /// Results already queued can still be received.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Ask the server to cancel this watch.
    ///
    /// Does not close the sequence itself; the server's cancel acknowledgement
    /// does, after an [`WatchResult::End`]. Fails with
    /// [`ClientError::StreamClosed`] without sending anything if the watch has
    /// already ended.
    pub fn stop(&self) -> Result<()> {
        if self.is_closed() {
            return Err(ClientError::StreamClosed(format!(
                "watch {} has already ended",
                self.id
            )));
        }
        self.requests
            .send(WatchRequest::cancel(self.id))
            .map_err(|_| ClientError::StreamClosed(format!("watch {} stream is closed", self.id)))?;
        debug!(watch_id = self.id, "Sent watch cancel request");
        Ok(())
    }
}

impl fmt::Debug for WatchSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchSession")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Receive side of one watch stream, run as its own task.
struct Dispatch<T: Transport> {
    id: i64,
    client: DnsClient<T>,
    query: Message,
    responses: ResponseStream,
    results: mpsc::UnboundedSender<WatchResult>,
    closed: Arc<AtomicBool>,
}

impl<T: Transport> Dispatch<T> {
    async fn run(mut self) {
        let id = self.id;
        loop {
            let response = match self.responses.next().await {
                None => {
                    debug!(watch_id = id, "Watch stream ended");
                    break;
                }
                Some(Err(status)) => {
                    error!(watch_id = id, error = %status, "Failed to receive from watch stream");
                    break;
                }
                Some(Ok(response)) => response,
            };

            match ServerEvent::from(response) {
                ServerEvent::Error(err) => {
                    error!(watch_id = id, error = %err, "Server reported watch error");
                    self.emit(WatchResult::Error(err));
                    break;
                }
                ServerEvent::Created(created_id) => {
                    error!(
                        watch_id = id,
                        created_id, "Unexpected created response on established watch"
                    );
                    break;
                }
                ServerEvent::Canceled => {
                    info!(watch_id = id, "Watch canceled by server");
                    self.emit(WatchResult::End);
                    break;
                }
                ServerEvent::Changed => match self.client.query(&self.query).await {
                    Ok(message) => {
                        if !self.emit(WatchResult::Resolved(message)) {
                            debug!(watch_id = id, "Watch session dropped, stopping dispatch");
                            break;
                        }
                    }
                    Err(e) => {
                        error!(watch_id = id, error = %e, "Failed to query for changes");
                        break;
                    }
                },
            }
        }
        self.close();
    }

    /// Returns false if the session is gone.
    fn emit(&self, result: WatchResult) -> bool {
        self.results.send(result).is_ok()
    }

    fn close(self) {
        let Dispatch {
            results, closed, ..
        } = self;
        closed.store(true, Ordering::Release);
        drop(results);
    }
}
