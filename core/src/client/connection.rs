//! Framed, correlated connection to the proxy.
//!
//! The connection is symmetric: either peer may originate requests. Replies
//! resolve the local [`PendingReplies`] map; inbound requests and events are
//! routed by message type to a registered [`InboundHandler`].

use super::correlation::{PendingReplies, PendingReply};
use crate::error::{CoreError, CoreResult};
use crate::protocol::{self, MessageKind, MessageType, ProxyMessage};
use crate::types::{ErrorType, ProxyError};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const OUTBOUND_CAPACITY: usize = 256;

/// How long the waiter of a CancelRequest is kept for the proxy's reply.
const CANCEL_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// Handles inbound requests and events of one message type.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    /// Handle one inbound message.
    ///
    /// For requests, the returned message is sent back as the reply after
    /// its request id is stamped. `None` sends an empty reply of the
    /// expected type. The return value of an event is ignored.
    async fn handle(&self, message: ProxyMessage) -> CoreResult<Option<ProxyMessage>>;
}

type HandlerMap = HashMap<MessageType, Arc<dyn InboundHandler>>;

/// One connection to the proxy process.
pub struct ProxyConnection {
    pending: Arc<PendingReplies>,
    outbound: mpsc::Sender<ProxyMessage>,
    handlers: Arc<RwLock<HandlerMap>>,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ProxyConnection {
    /// Start the receive loop and the writer task over a byte stream.
    pub fn open<T>(transport: T) -> Arc<Self>
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(transport);
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let pending = Arc::new(PendingReplies::new());
        let handlers: Arc<RwLock<HandlerMap>> = Arc::new(RwLock::new(HashMap::new()));
        let shutdown = CancellationToken::new();

        let writer_task = tokio::spawn(write_loop(
            writer,
            outbound_rx,
            Arc::clone(&pending),
            shutdown.clone(),
        ));
        let reader_task = tokio::spawn(receive_loop(
            reader,
            Arc::clone(&pending),
            Arc::clone(&handlers),
            outbound.clone(),
            shutdown.clone(),
        ));

        Arc::new(Self {
            pending,
            outbound,
            handlers,
            shutdown,
            tasks: Mutex::new(vec![writer_task, reader_task]),
        })
    }

    /// Route inbound messages of `message_type` to `handler`.
    pub fn register_handler(&self, message_type: MessageType, handler: Arc<dyn InboundHandler>) {
        self.handlers.write().insert(message_type, handler);
    }

    /// Send a request and return the handle that resolves with its reply.
    pub async fn send(&self, mut request: ProxyMessage) -> CoreResult<PendingReply> {
        let handle = self.pending.register(request.message_type)?;
        request.request_id = handle.request_id();
        debug!(
            request_id = request.request_id,
            message_type = %request.message_type,
            "sending request"
        );

        if self.outbound.send(request).await.is_err() {
            let _ = self
                .pending
                .fail(handle.request_id(), CoreError::ConnectionClosed);
        }
        Ok(handle)
    }

    /// Send a request and wait for its reply.
    pub async fn call(&self, request: ProxyMessage) -> CoreResult<ProxyMessage> {
        self.send(request).await?.wait().await
    }

    /// Send a fire-and-forget event.
    pub async fn notify(&self, mut event: ProxyMessage) -> CoreResult<()> {
        if event.kind() != MessageKind::Event {
            return Err(CoreError::MalformedFrame(format!(
                "{} is not an event type",
                event.message_type
            )));
        }
        event.request_id = 0;
        self.outbound
            .send(event)
            .await
            .map_err(|_| CoreError::ConnectionClosed)
    }

    /// Cancel an outstanding request locally and tell the proxy.
    ///
    /// Returns false if the request was no longer waiting.
    pub fn cancel(&self, request_id: u64) -> bool {
        if !self.pending.cancel(request_id) {
            return false;
        }
        if let Ok(handle) = self.pending.register(MessageType::CancelRequest) {
            let mut request = ProxyMessage::new(MessageType::CancelRequest);
            request.request_id = handle.request_id();
            request
                .properties
                .set_i64(protocol::names::TARGET_REQUEST_ID, request_id as i64);
            let cancel_id = handle.request_id();
            if self.outbound.try_send(request).is_err() {
                let _ = self.pending.fail(cancel_id, CoreError::ConnectionClosed);
            } else {
                self.release_after_timeout(handle);
            }
        }
        true
    }

    /// Drop a fire-and-forget waiter if its reply does not arrive in time.
    fn release_after_timeout(&self, handle: PendingReply) {
        let cancel_id = handle.request_id();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.pending.cancel(cancel_id);
            return;
        };
        let pending = Arc::clone(&self.pending);
        runtime.spawn(async move {
            if tokio::time::timeout(CANCEL_REPLY_TIMEOUT, handle.wait()).await.is_err() {
                debug!(request_id = cancel_id, "no reply to cancel request");
                pending.cancel(cancel_id);
            }
        });
    }

    pub fn is_open(&self) -> bool {
        !self.shutdown.is_cancelled()
    }

    pub fn outstanding(&self) -> usize {
        self.pending.outstanding()
    }

    /// Wait until the connection is closed by either side.
    pub async fn closed(&self) {
        self.shutdown.cancelled().await
    }

    /// Close the connection and fail every outstanding request.
    pub async fn close(&self) {
        if self.shutdown.is_cancelled() && self.pending.is_closed() {
            return;
        }
        self.shutdown.cancel();
        self.pending.fail_all();

        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "connection task ended abnormally");
                }
            }
        }
        info!("proxy connection closed");
    }
}

impl Drop for ProxyConnection {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.pending.fail_all();
    }
}

async fn write_loop<W>(
    mut writer: WriteHalf<W>,
    mut outbound: mpsc::Receiver<ProxyMessage>,
    pending: Arc<PendingReplies>,
    shutdown: CancellationToken,
) where
    W: AsyncWrite + Send,
{
    loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => break,
            message = outbound.recv() => message,
        };
        let Some(message) = message else { break };

        if let Err(e) = protocol::write_frame(&mut writer, &message).await {
            error!(
                error = %e,
                message_type = %message.message_type,
                "failed to write frame"
            );
            if message.message_type.kind() == MessageKind::Request {
                let _ = pending.fail(message.request_id, e);
            }
            break;
        }
    }

    let _ = writer.shutdown().await;
    shutdown.cancel();
    pending.fail_all();
}

async fn receive_loop<R>(
    mut reader: ReadHalf<R>,
    pending: Arc<PendingReplies>,
    handlers: Arc<RwLock<HandlerMap>>,
    outbound: mpsc::Sender<ProxyMessage>,
    shutdown: CancellationToken,
) where
    R: AsyncRead + Send,
{
    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => break,
            frame = protocol::read_frame(&mut reader) => frame,
        };

        match frame {
            Ok(Some(message)) => dispatch(message, &pending, &handlers, &outbound),
            Ok(None) => {
                info!("proxy closed the channel");
                break;
            }
            Err(e @ (CoreError::UnknownMessageType(_) | CoreError::MalformedFrame(_))) => {
                // The whole frame body was consumed, so the stream is still aligned.
                warn!(error = %e, "discarding frame");
            }
            Err(e) => {
                error!(error = %e, "receive loop failed");
                break;
            }
        }
    }

    shutdown.cancel();
    pending.fail_all();
}

fn dispatch(
    message: ProxyMessage,
    pending: &PendingReplies,
    handlers: &RwLock<HandlerMap>,
    outbound: &mpsc::Sender<ProxyMessage>,
) {
    if message.kind() == MessageKind::Reply {
        let request_id = message.request_id;
        let message_type = message.message_type;
        if let Err(e) = pending.resolve(message) {
            warn!(request_id, message_type = %message_type, error = %e, "discarding reply");
        }
        return;
    }

    let handler = handlers.read().get(&message.message_type).cloned();
    let outbound = outbound.clone();
    tokio::spawn(async move {
        let request_id = message.request_id;
        let message_type = message.message_type;
        let is_request = message.kind() == MessageKind::Request;

        let outcome = match handler {
            Some(handler) => handler.handle(message.clone()).await,
            None => Err(CoreError::InvalidConfiguration(format!(
                "no handler registered for {message_type}"
            ))),
        };

        if !is_request {
            if let Err(e) = outcome {
                warn!(message_type = %message_type, error = %e, "event handler failed");
            }
            return;
        }

        let reply = match outcome {
            Ok(Some(mut reply)) => {
                reply.request_id = request_id;
                Ok(reply)
            }
            Ok(None) => ProxyMessage::reply_to(&message),
            Err(e) => {
                warn!(request_id, message_type = %message_type, error = %e, "request handler failed");
                ProxyMessage::reply_to(&message)
                    .and_then(|reply| reply.with_error(&ProxyError::new(ErrorType::Generic, e.to_string())))
            }
        };

        match reply {
            Ok(reply) => {
                if outbound.send(reply).await.is_err() {
                    debug!(request_id, "connection closed before reply was sent");
                }
            }
            Err(e) => error!(request_id, error = %e, "failed to build reply"),
        }
    });
}
