//! Correlation of outbound requests with their replies.

use crate::error::{CoreError, CoreResult};
use crate::protocol::{MessageType, ProxyMessage};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;
use tracing::{debug, warn};

type ReplySender = oneshot::Sender<CoreResult<ProxyMessage>>;

struct Waiter {
    expected: MessageType,
    sender: ReplySender,
}

#[derive(Default)]
struct State {
    waiters: HashMap<u64, Waiter>,
    closed: bool,
}

/// Map from correlation id to the single waiter for that id.
///
/// Ids are issued in increasing order starting at 1. Any id below the next
/// unissued id that has no waiter was already resolved, which lets the map
/// detect double resolution without remembering finished ids.
pub struct PendingReplies {
    next_id: AtomicU64,
    state: Mutex<State>,
}

impl Default for PendingReplies {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingReplies {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            state: Mutex::new(State::default()),
        }
    }

    /// Issue a new correlation id for a request of the given type.
    pub fn register(&self, request_type: MessageType) -> CoreResult<PendingReply> {
        let expected = request_type.reply_type().ok_or_else(|| {
            CoreError::MalformedFrame(format!("{request_type} is not a request type"))
        })?;
        let (sender, receiver) = oneshot::channel();

        let mut state = self.state.lock();
        if state.closed {
            return Err(CoreError::ConnectionClosed);
        }
        let request_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        state.waiters.insert(request_id, Waiter { expected, sender });

        Ok(PendingReply {
            request_id,
            receiver,
        })
    }

    /// Deliver a reply to its waiter.
    ///
    /// A reply of the wrong type resolves the waiter with a mismatch error.
    pub fn resolve(&self, reply: ProxyMessage) -> CoreResult<()> {
        let request_id = reply.request_id;
        let waiter = self.state.lock().waiters.remove(&request_id);

        let Some(waiter) = waiter else {
            return Err(self.missing(request_id));
        };

        if reply.message_type != waiter.expected {
            let actual = reply.message_type;
            let _ = waiter.sender.send(Err(CoreError::ReplyTypeMismatch {
                request_id,
                expected: waiter.expected,
                actual,
            }));
            return Err(CoreError::ReplyTypeMismatch {
                request_id,
                expected: waiter.expected,
                actual,
            });
        }

        if waiter.sender.send(Ok(reply)).is_err() {
            debug!(request_id, "reply arrived after the caller stopped waiting");
        }
        Ok(())
    }

    /// Resolve a waiter locally with an error.
    pub fn fail(&self, request_id: u64, error: CoreError) -> CoreResult<()> {
        let waiter = self.state.lock().waiters.remove(&request_id);
        match waiter {
            Some(waiter) => {
                let _ = waiter.sender.send(Err(error));
                Ok(())
            }
            None => Err(self.missing(request_id)),
        }
    }

    /// Cancel a waiting request. Returns false if it was not waiting.
    pub fn cancel(&self, request_id: u64) -> bool {
        self.fail(request_id, CoreError::Cancelled(request_id)).is_ok()
    }

    /// Fail every waiter with a connection error and refuse new registrations.
    pub fn fail_all(&self) -> usize {
        let drained: Vec<(u64, Waiter)> = {
            let mut state = self.state.lock();
            state.closed = true;
            state.waiters.drain().collect()
        };
        let count = drained.len();
        for (request_id, waiter) in drained {
            debug!(request_id, "failing request on connection loss");
            let _ = waiter.sender.send(Err(CoreError::ConnectionClosed));
        }
        if count > 0 {
            warn!(count, "failed outstanding requests on connection loss");
        }
        count
    }

    pub fn outstanding(&self) -> usize {
        self.state.lock().waiters.len()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn missing(&self, request_id: u64) -> CoreError {
        if request_id != 0 && request_id < self.next_id.load(Ordering::SeqCst) {
            CoreError::AlreadyResolved(request_id)
        } else {
            CoreError::UnknownRequestId(request_id)
        }
    }
}

/// Handle for one outstanding request.
#[derive(Debug)]
pub struct PendingReply {
    request_id: u64,
    receiver: oneshot::Receiver<CoreResult<ProxyMessage>>,
}

impl PendingReply {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Wait for the reply or the terminal error.
    pub async fn wait(self) -> CoreResult<ProxyMessage> {
        self.receiver
            .await
            .map_err(|_| CoreError::ConnectionClosed)?
    }
}
