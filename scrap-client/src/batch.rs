//! Request-batching client.
//!
//! Every call is queued synchronously when it is made and answered through
//! its own [`ResponseFuture`]. The queue is sent as one batch when it reaches
//! `max_batch_size`, when the batching window of its first call elapses, or
//! on [`BatchClient::flush`]. With a zero window the queue is sent when one
//! of its futures is first polled: calls issued back to back before the
//! caller awaits share a batch on any runtime flavor. A zero-window call
//! whose future is dropped unpolled goes out with the next batch or flush.
//!
//! Calls must be made from within a Tokio runtime.

use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;

use scrap_contracts::{CallEnvelope, CallResult, ProcedureKind};
use scrap_core::config::BatchConfig;

use crate::error::{ClientError, TransportError};
use crate::transport::BatchTransport;

/// When a queued batch is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    /// Send as soon as this many calls are queued.
    pub max_batch_size: usize,
    /// How long the first queued call waits for company. Zero means until
    /// the caller first awaits one of the queued calls.
    pub max_wait: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self::from(&BatchConfig::default())
    }
}

impl From<&BatchConfig> for BatchSettings {
    fn from(config: &BatchConfig) -> Self {
        Self {
            max_batch_size: config.max_batch_size,
            max_wait: Duration::from_millis(config.max_wait_ms),
        }
    }
}

type Reply = oneshot::Sender<Result<Value, ClientError>>;

struct QueuedCall {
    envelope: CallEnvelope,
    reply: Reply,
}

#[derive(Default)]
struct Queue {
    calls: Vec<QueuedCall>,
    /// Bumped on every drain so a stale window timer can tell its batch
    /// already left.
    generation: u64,
}

impl Queue {
    fn drain(&mut self) -> Vec<QueuedCall> {
        self.generation = self.generation.wrapping_add(1);
        mem::take(&mut self.calls)
    }
}

struct Inner {
    transport: Arc<dyn BatchTransport>,
    settings: BatchSettings,
    queue: Mutex<Queue>,
    batches_sent: AtomicU64,
    calls_sent: AtomicU64,
}

/// Result of one queued call.
#[must_use = "the call is sent regardless, but its result is only observable by awaiting"]
pub struct ResponseFuture {
    rx: oneshot::Receiver<Result<Value, ClientError>>,
    /// Zero-window calls send their queue on first poll, if it is still the
    /// generation they joined.
    send_on_poll: Option<(Arc<Inner>, u64)>,
}

impl Future for ResponseFuture {
    type Output = Result<Value, ClientError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some((inner, generation)) = self.send_on_poll.take() {
            inner.drain_generation(generation);
        }
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(ClientError::Dropped)))
    }
}

/// Coalesces procedure calls into batch requests. Cheap to clone; clones
/// share one queue.
#[derive(Clone)]
pub struct BatchClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for BatchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchClient")
            .field("settings", &self.inner.settings)
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

impl BatchClient {
    pub fn new(transport: Arc<dyn BatchTransport>, settings: BatchSettings) -> Self {
        let settings = BatchSettings {
            max_batch_size: settings.max_batch_size.max(1),
            ..settings
        };
        Self {
            inner: Arc::new(Inner {
                transport,
                settings,
                queue: Mutex::new(Queue::default()),
                batches_sent: AtomicU64::new(0),
                calls_sent: AtomicU64::new(0),
            }),
        }
    }

    pub fn settings(&self) -> BatchSettings {
        self.inner.settings
    }

    /// Queue a call. The call is part of the outgoing batch even if the
    /// returned future is dropped.
    pub fn call(
        &self,
        kind: ProcedureKind,
        procedure: impl Into<String>,
        input: Value,
    ) -> ResponseFuture {
        Inner::enqueue(&self.inner, CallEnvelope::new(procedure, kind, input))
    }

    pub fn query(&self, procedure: impl Into<String>, input: Value) -> ResponseFuture {
        self.call(ProcedureKind::Query, procedure, input)
    }

    pub fn mutation(&self, procedure: impl Into<String>, input: Value) -> ResponseFuture {
        self.call(ProcedureKind::Mutation, procedure, input)
    }

    /// Queue a query now and decode its result into `T` when it arrives.
    pub fn query_as<T: DeserializeOwned>(
        &self,
        procedure: &str,
        input: Value,
    ) -> impl Future<Output = Result<T, ClientError>> + Send + use<T> {
        let response = self.query(procedure, input);
        let procedure = procedure.to_string();
        async move {
            let value = response.await?;
            serde_json::from_value(value).map_err(|e| ClientError::Decode {
                procedure,
                message: e.to_string(),
            })
        }
    }

    /// Send whatever is queued and wait for the exchange to finish.
    pub async fn flush(&self) {
        let batch = self.inner.queue.lock().drain();
        if !batch.is_empty() {
            Arc::clone(&self.inner).dispatch(batch).await;
        }
    }

    /// Calls queued and not yet sent.
    pub fn pending(&self) -> usize {
        self.inner.queue.lock().calls.len()
    }

    pub fn batches_sent(&self) -> u64 {
        self.inner.batches_sent.load(Ordering::Relaxed)
    }

    pub fn calls_sent(&self) -> u64 {
        self.inner.calls_sent.load(Ordering::Relaxed)
    }
}

impl Inner {
    fn enqueue(this: &Arc<Self>, envelope: CallEnvelope) -> ResponseFuture {
        let (reply, rx) = oneshot::channel();
        let mut queue = this.queue.lock();
        queue.calls.push(QueuedCall { envelope, reply });
        let generation = queue.generation;
        let mut send_on_poll = None;

        if queue.calls.len() >= this.settings.max_batch_size {
            let batch = queue.drain();
            drop(queue);
            tokio::spawn(Arc::clone(this).dispatch(batch));
        } else if this.settings.max_wait.is_zero() {
            send_on_poll = Some((Arc::clone(this), generation));
        } else if queue.calls.len() == 1 {
            drop(queue);
            tokio::spawn(Arc::clone(this).flush_after_window(generation));
        }
        ResponseFuture { rx, send_on_poll }
    }

    /// Send the queue if it still holds `generation`.
    fn drain_generation(self: Arc<Self>, generation: u64) {
        let batch = {
            let mut queue = self.queue.lock();
            if queue.generation != generation || queue.calls.is_empty() {
                return;
            }
            queue.drain()
        };
        tokio::spawn(self.dispatch(batch));
    }

    async fn flush_after_window(self: Arc<Self>, generation: u64) {
        tokio::time::sleep(self.settings.max_wait).await;
        let batch = {
            let mut queue = self.queue.lock();
            if queue.generation != generation || queue.calls.is_empty() {
                return;
            }
            queue.drain()
        };
        self.dispatch(batch).await;
    }

    async fn dispatch(self: Arc<Self>, batch: Vec<QueuedCall>) {
        let (envelopes, replies): (Vec<CallEnvelope>, Vec<Reply>) = batch
            .into_iter()
            .map(|call| (call.envelope, call.reply))
            .unzip();
        let procedures: Vec<String> = envelopes.iter().map(|e| e.procedure.clone()).collect();
        let expected = envelopes.len();

        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.calls_sent.fetch_add(expected as u64, Ordering::Relaxed);
        tracing::debug!(calls = expected, "sending batch");

        let results = match self.transport.send(envelopes).await {
            Ok(results) if results.len() == expected => results,
            Ok(results) => {
                let err = TransportError::LengthMismatch {
                    expected,
                    received: results.len(),
                };
                reject_all(replies, err);
                return;
            }
            Err(err) => {
                reject_all(replies, err);
                return;
            }
        };

        for ((reply, result), procedure) in replies.into_iter().zip(results).zip(procedures) {
            let _ = reply.send(into_call_outcome(procedure, result));
        }
    }
}

fn into_call_outcome(procedure: String, result: CallResult) -> Result<Value, ClientError> {
    result
        .into_result()
        .map_err(|error| ClientError::Procedure { procedure, error })
}

fn reject_all(replies: Vec<Reply>, err: TransportError) {
    tracing::warn!(calls = replies.len(), error = %err, "batch failed");
    for reply in replies {
        let _ = reply.send(Err(ClientError::Transport(err.clone())));
    }
}
