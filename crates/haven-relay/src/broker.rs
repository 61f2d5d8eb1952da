//! Message broker abstraction and an in-process implementation.
//!
//! A [`Broker`] carries opaque payloads between relay instances. Every
//! subscriber to a topic receives every payload published to it, including
//! payloads published by the same process. Alongside the feed the broker
//! keeps a last-value cache per topic so late joiners can catch up without
//! replaying history.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, RwLock};
use tracing::trace;

use crate::error::{RelayError, Result};

/// Capacity of the per-subscriber delivery queue.
const SUBSCRIBER_QUEUE: usize = 64;

/// Transport between relay instances.
///
/// Implementations must deliver each published payload to every live
/// subscription on the topic. Delivery order is per-publisher FIFO; no
/// ordering is guaranteed across publishers.
#[async_trait]
pub trait Broker: Send + Sync + 'static {
    /// Deliver `payload` to every subscriber of `topic`.
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()>;

    /// Open a subscription feed for `topic`.
    ///
    /// Payloads published after this call appear on the returned receiver.
    /// Dropping the receiver ends the subscription.
    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<Bytes>>;

    /// Record `payload` as the most recent value for `topic`.
    async fn put_last(&self, topic: &str, payload: Bytes) -> Result<()>;

    /// Fetch the most recent value recorded for `topic`, if any.
    async fn get_last(&self, topic: &str) -> Result<Option<Bytes>>;
}

#[async_trait]
impl<B: Broker> Broker for Arc<B> {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
        (**self).publish(topic, payload).await
    }

    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<Bytes>> {
        (**self).subscribe(topic).await
    }

    async fn put_last(&self, topic: &str, payload: Bytes) -> Result<()> {
        (**self).put_last(topic, payload).await
    }

    async fn get_last(&self, topic: &str) -> Result<Option<Bytes>> {
        (**self).get_last(topic).await
    }
}

#[derive(Default)]
struct BrokerState {
    subscribers: HashMap<String, Vec<mpsc::Sender<Bytes>>>,
    last: HashMap<String, Bytes>,
}

/// In-process broker backed by tokio channels.
///
/// Relay instances sharing one `MemoryBroker` see each other's publishes,
/// which makes multi-instance behavior testable without an external bus.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<RwLock<BrokerState>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions on `topic`.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        let state = self.state.read().await;
        state
            .subscribers
            .get(topic)
            .map(|subs| subs.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
        let mut state = self.state.write().await;
        let Some(subs) = state.subscribers.get_mut(topic) else {
            return Ok(());
        };
        subs.retain(|tx| !tx.is_closed());
        trace!(topic, subscribers = subs.len(), "broker publish");
        for tx in subs.iter() {
            if tx.send(payload.clone()).await.is_err() {
                // Receiver dropped mid-send; the retain above will reap it
                // on the next publish.
            }
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<Bytes>> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE);
        let mut state = self.state.write().await;
        state
            .subscribers
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }

    async fn put_last(&self, topic: &str, payload: Bytes) -> Result<()> {
        let mut state = self.state.write().await;
        state.last.insert(topic.to_string(), payload);
        Ok(())
    }

    async fn get_last(&self, topic: &str) -> Result<Option<Bytes>> {
        let state = self.state.read().await;
        Ok(state.last.get(topic).cloned())
    }
}

impl std::fmt::Debug for MemoryBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBroker").finish_non_exhaustive()
    }
}

// Broker failures in other backends map onto RelayError::Broker; keep the
// conversion here so backends outside this crate can reuse it.
impl From<mpsc::error::SendError<Bytes>> for RelayError {
    fn from(err: mpsc::error::SendError<Bytes>) -> Self {
        RelayError::Broker(err.to_string())
    }
}
