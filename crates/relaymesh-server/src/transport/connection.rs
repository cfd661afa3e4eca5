//! Connection handle: bounded outbound queue + idempotent close.
//!
//! The handle is cheap to clone and is what handlers hold on to. Socket I/O
//! lives in the reader/writer tasks (`transport::tcp`); the handle only ever
//! enqueues, so `send` never suspends the caller.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::{mpsc, Notify};

use relaymesh_core::error::{RelayError, Result};
use relaymesh_core::protocol::{encode_package, Frame, FrameKind, MAX_PAYLOAD_LEN};

use crate::obs::ServerMetrics;

/// Default outbound queue capacity (frames).
pub const SEND_QUEUE_CAPACITY: usize = 16 << 10;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnInner>,
}

struct ConnInner {
    id: u64,
    peer: String,
    tx: mpsc::Sender<Frame>,
    closed: AtomicBool,
    close_notify: Notify,
    metrics: Option<Arc<ServerMetrics>>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.inner.id)
            .field("peer", &self.inner.peer)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Connection {
    /// Create a handle and the receiving end of its send queue.
    pub fn new(peer: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        Self::build(peer.into(), capacity, None)
    }

    pub fn with_metrics(
        peer: impl Into<String>,
        capacity: usize,
        metrics: Arc<ServerMetrics>,
    ) -> (Self, mpsc::Receiver<Frame>) {
        Self::build(peer.into(), capacity, Some(metrics))
    }

    fn build(
        peer: String,
        capacity: usize,
        metrics: Option<Arc<ServerMetrics>>,
    ) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let inner = ConnInner {
            id: NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed),
            peer,
            tx,
            closed: AtomicBool::new(false),
            close_notify: Notify::new(),
            metrics,
        };
        (Self { inner: Arc::new(inner) }, rx)
    }

    /// Process-unique identity.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Observed remote address (`host:port`).
    pub fn remote_addr(&self) -> &str {
        &self.inner.peer
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    pub fn same_as(&self, other: &Connection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Queue an already-encoded envelope as a Raw frame.
    pub fn send(&self, payload: impl Into<Bytes>) -> Result<()> {
        self.send_frame(Frame::raw(payload))
    }

    /// Non-blocking enqueue. Fails fast with `Backpressure` when the queue is full.
    pub fn send_frame(&self, frame: Frame) -> Result<()> {
        if self.is_closed() {
            return Err(RelayError::ConnectionClosed);
        }
        if frame.payload.len() >= MAX_PAYLOAD_LEN {
            return Err(RelayError::MessageTooLarge(frame.payload.len()));
        }
        match self.inner.tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                if let Some(m) = &self.inner.metrics {
                    m.send_backpressure.inc(&[]);
                }
                Err(RelayError::Backpressure)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(RelayError::ConnectionClosed),
        }
    }

    /// Encode `{Id, Body}` and queue it.
    pub fn write_json<T>(&self, id: &str, body: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let buf = encode_package(id, body)?;
        self.send(buf)
    }

    pub(crate) fn send_control(&self, kind: FrameKind) -> Result<()> {
        self.send_frame(Frame::control(kind))
    }

    /// Mark closed and release the send queue. Later calls are no-ops.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.close_notify.notify_one();
    }

    /// Resolves once `close` has been called.
    pub(crate) async fn closed(&self) {
        if self.is_closed() {
            return;
        }
        self.inner.close_notify.notified().await;
    }
}
