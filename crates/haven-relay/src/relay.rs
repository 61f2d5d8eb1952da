//! Per-process relay: connection registry, channel groups, and fan-out.
//!
//! A [`Relay`] sits between locally attached connections and a shared
//! [`Broker`]. Each subscribed channel gets exactly one broker subscription
//! per process; inbound broker payloads fan out to every local member of
//! the channel's group. Publishes go through the broker rather than
//! straight to local members, so all instances observe the same stream.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::broker::Broker;
use crate::error::{RelayError, Result};

/// Identifier handed out to each attached connection.
pub type ConnectionId = u64;

/// Capacity of a connection's outbound event queue.
const EVENT_QUEUE: usize = 64;

/// Events delivered to attached connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayEvent {
    /// Acknowledges a subscription; carries the channel's most recent
    /// payload when one exists, so late joiners start from current state.
    Subscribed {
        channel: String,
        last_value: Option<Bytes>,
    },
    /// A payload published to a channel this connection is a member of.
    Message { channel: String, payload: Bytes },
}

struct RelayState {
    /// Outbound event queue per attached connection.
    connections: HashMap<ConnectionId, mpsc::Sender<RelayEvent>>,
    /// Local membership per channel.
    groups: HashMap<String, HashSet<ConnectionId>>,
    /// Channels each connection has joined, for publish checks and teardown.
    joined: HashMap<ConnectionId, HashSet<String>>,
    /// One pump task per broker-subscribed channel.
    pumps: HashMap<String, JoinHandle<()>>,
    next_connection: ConnectionId,
    closed: bool,
}

/// Fan-out relay bound to a broker.
pub struct Relay<B: Broker> {
    broker: B,
    state: RwLock<RelayState>,
}

impl<B: Broker> Relay<B> {
    pub fn new(broker: B) -> Arc<Self> {
        Arc::new(Self {
            broker,
            state: RwLock::new(RelayState {
                connections: HashMap::new(),
                groups: HashMap::new(),
                joined: HashMap::new(),
                pumps: HashMap::new(),
                next_connection: 0,
                closed: false,
            }),
        })
    }

    /// Attach a connection and return its id plus event feed.
    pub async fn connect(&self) -> Result<(ConnectionId, mpsc::Receiver<RelayEvent>)> {
        let mut state = self.state.write().await;
        if state.closed {
            return Err(RelayError::Closed);
        }
        let id = state.next_connection;
        state.next_connection += 1;
        let (tx, rx) = mpsc::channel(EVENT_QUEUE);
        state.connections.insert(id, tx);
        state.joined.insert(id, HashSet::new());
        debug!(connection = id, "relay connect");
        Ok((id, rx))
    }

    /// Join `connection` to `channel`.
    ///
    /// The first local join of a channel opens the process-wide broker
    /// subscription; later joins reuse it. The joining connection receives
    /// a [`RelayEvent::Subscribed`] carrying the channel's cached last
    /// value, if any.
    pub async fn subscribe(self: &Arc<Self>, connection: ConnectionId, channel: &str) -> Result<()> {
        let tx = {
            let mut state = self.state.write().await;
            if state.closed {
                return Err(RelayError::Closed);
            }
            let tx = state
                .connections
                .get(&connection)
                .cloned()
                .ok_or(RelayError::UnknownConnection(connection))?;

            state
                .groups
                .entry(channel.to_string())
                .or_default()
                .insert(connection);
            if let Some(joined) = state.joined.get_mut(&connection) {
                joined.insert(channel.to_string());
            }

            if !state.pumps.contains_key(channel) {
                let feed = self.broker.subscribe(channel).await?;
                let pump = spawn_pump(Arc::downgrade(self), channel.to_string(), feed);
                state.pumps.insert(channel.to_string(), pump);
                debug!(channel, "opened broker subscription");
            }
            tx
        };

        let last_value = self.broker.get_last(channel).await?;
        let event = RelayEvent::Subscribed {
            channel: channel.to_string(),
            last_value,
        };
        if tx.send(event).await.is_err() {
            warn!(connection, channel, "connection dropped before subscribe ack");
        }
        Ok(())
    }

    /// Publish `payload` on `channel` on behalf of `connection`.
    ///
    /// The connection must have joined the channel first; this stops a
    /// client from injecting traffic into channels it never subscribed to.
    /// The payload also becomes the channel's cached last value.
    pub async fn publish(
        &self,
        connection: ConnectionId,
        channel: &str,
        payload: Bytes,
    ) -> Result<()> {
        {
            let state = self.state.read().await;
            if state.closed {
                return Err(RelayError::Closed);
            }
            let joined = state
                .joined
                .get(&connection)
                .ok_or(RelayError::UnknownConnection(connection))?;
            if !joined.contains(channel) {
                return Err(RelayError::NotSubscribed(channel.to_string()));
            }
        }
        self.broker.publish(channel, payload.clone()).await?;
        self.broker.put_last(channel, payload).await?;
        Ok(())
    }

    /// Remove `connection` from `channel`'s local group.
    ///
    /// The broker subscription stays open for the rest of the process.
    pub async fn unsubscribe(&self, connection: ConnectionId, channel: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(group) = state.groups.get_mut(channel) {
            group.remove(&connection);
        }
        if let Some(joined) = state.joined.get_mut(&connection) {
            joined.remove(channel);
        }
        Ok(())
    }

    /// Detach a connection from the relay and every group it joined.
    pub async fn disconnect(&self, connection: ConnectionId) -> Result<()> {
        let mut state = self.state.write().await;
        state.connections.remove(&connection);
        if let Some(joined) = state.joined.remove(&connection) {
            for channel in joined {
                if let Some(group) = state.groups.get_mut(&channel) {
                    group.remove(&connection);
                }
            }
        }
        debug!(connection, "relay disconnect");
        Ok(())
    }

    /// Stop all pump tasks and refuse further connections.
    pub async fn shutdown(&self) {
        let mut state = self.state.write().await;
        state.closed = true;
        state.connections.clear();
        state.groups.clear();
        state.joined.clear();
        for (channel, pump) in state.pumps.drain() {
            trace!(channel, "stopping pump");
            pump.abort();
        }
    }

    /// Deliver a broker payload to every local member of `channel`.
    async fn fan_out(&self, channel: &str, payload: Bytes) {
        let targets: Vec<mpsc::Sender<RelayEvent>> = {
            let state = self.state.read().await;
            let Some(group) = state.groups.get(channel) else {
                return;
            };
            group
                .iter()
                .filter_map(|id| state.connections.get(id).cloned())
                .collect()
        };
        trace!(channel, members = targets.len(), "fan out");
        for tx in targets {
            let event = RelayEvent::Message {
                channel: channel.to_string(),
                payload: payload.clone(),
            };
            if tx.send(event).await.is_err() {
                // Connection went away; disconnect() cleans up the group.
            }
        }
    }
}

fn spawn_pump<B: Broker>(
    relay: Weak<Relay<B>>,
    channel: String,
    mut feed: mpsc::Receiver<Bytes>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(payload) = feed.recv().await {
            let Some(relay) = relay.upgrade() else {
                return;
            };
            relay.fan_out(&channel, payload).await;
        }
        debug!(channel, "broker feed closed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::MemoryBroker;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn next_event(rx: &mut mpsc::Receiver<RelayEvent>) -> RelayEvent {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event stream closed")
    }

    #[tokio::test]
    async fn subscribe_acks_with_empty_cache() {
        let relay = Relay::new(MemoryBroker::new());
        let (conn, mut rx) = relay.connect().await.unwrap();
        relay.subscribe(conn, "general").await.unwrap();

        assert_eq!(
            next_event(&mut rx).await,
            RelayEvent::Subscribed {
                channel: "general".into(),
                last_value: None,
            }
        );
    }

    #[tokio::test]
    async fn publish_fans_out_to_group_members() {
        let relay = Relay::new(MemoryBroker::new());
        let (a, mut rx_a) = relay.connect().await.unwrap();
        let (b, mut rx_b) = relay.connect().await.unwrap();
        relay.subscribe(a, "general").await.unwrap();
        relay.subscribe(b, "general").await.unwrap();
        next_event(&mut rx_a).await;
        next_event(&mut rx_b).await;

        relay
            .publish(a, "general", Bytes::from_static(b"hi"))
            .await
            .unwrap();

        let expected = RelayEvent::Message {
            channel: "general".into(),
            payload: Bytes::from_static(b"hi"),
        };
        // Publishers are group members too, so both receive the message.
        assert_eq!(next_event(&mut rx_a).await, expected);
        assert_eq!(next_event(&mut rx_b).await, expected);
    }

    #[tokio::test]
    async fn publish_requires_membership() {
        let relay = Relay::new(MemoryBroker::new());
        let (conn, _rx) = relay.connect().await.unwrap();

        let err = relay
            .publish(conn, "general", Bytes::from_static(b"spoof"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::NotSubscribed(_)));
    }

    #[tokio::test]
    async fn late_joiner_receives_last_value() {
        let relay = Relay::new(MemoryBroker::new());
        let (a, mut rx_a) = relay.connect().await.unwrap();
        relay.subscribe(a, "general").await.unwrap();
        next_event(&mut rx_a).await;

        for n in 0..3u8 {
            relay
                .publish(a, "general", Bytes::copy_from_slice(&[n]))
                .await
                .unwrap();
            next_event(&mut rx_a).await;
        }

        let (b, mut rx_b) = relay.connect().await.unwrap();
        relay.subscribe(b, "general").await.unwrap();
        assert_eq!(
            next_event(&mut rx_b).await,
            RelayEvent::Subscribed {
                channel: "general".into(),
                last_value: Some(Bytes::from_static(&[2])),
            }
        );
    }

    #[tokio::test]
    async fn fan_out_crosses_relay_instances() {
        let broker = MemoryBroker::new();
        let left = Relay::new(broker.clone());
        let right = Relay::new(broker.clone());

        let (a, mut rx_a) = left.connect().await.unwrap();
        let (b, mut rx_b) = right.connect().await.unwrap();
        left.subscribe(a, "general").await.unwrap();
        right.subscribe(b, "general").await.unwrap();
        next_event(&mut rx_a).await;
        next_event(&mut rx_b).await;

        left.publish(a, "general", Bytes::from_static(b"cross"))
            .await
            .unwrap();

        assert_eq!(
            next_event(&mut rx_b).await,
            RelayEvent::Message {
                channel: "general".into(),
                payload: Bytes::from_static(b"cross"),
            }
        );
    }

    #[tokio::test]
    async fn one_broker_subscription_per_channel_per_process() {
        let broker = MemoryBroker::new();
        let relay = Relay::new(broker.clone());

        let (a, mut rx_a) = relay.connect().await.unwrap();
        let (b, mut rx_b) = relay.connect().await.unwrap();
        relay.subscribe(a, "general").await.unwrap();
        relay.subscribe(b, "general").await.unwrap();
        next_event(&mut rx_a).await;
        next_event(&mut rx_b).await;

        assert_eq!(broker.subscriber_count("general").await, 1);
    }

    #[tokio::test]
    async fn unsubscribe_stops_local_delivery() {
        let relay = Relay::new(MemoryBroker::new());
        let (a, mut rx_a) = relay.connect().await.unwrap();
        let (b, mut rx_b) = relay.connect().await.unwrap();
        relay.subscribe(a, "general").await.unwrap();
        relay.subscribe(b, "general").await.unwrap();
        next_event(&mut rx_a).await;
        next_event(&mut rx_b).await;

        relay.unsubscribe(b, "general").await.unwrap();
        relay
            .publish(a, "general", Bytes::from_static(b"x"))
            .await
            .unwrap();

        next_event(&mut rx_a).await;
        assert!(
            timeout(Duration::from_millis(100), rx_b.recv()).await.is_err(),
            "unsubscribed connection should not receive messages"
        );
    }

    #[tokio::test]
    async fn disconnect_leaves_all_groups() {
        let relay = Relay::new(MemoryBroker::new());
        let (a, mut rx_a) = relay.connect().await.unwrap();
        let (b, mut rx_b) = relay.connect().await.unwrap();
        relay.subscribe(a, "x").await.unwrap();
        relay.subscribe(a, "y").await.unwrap();
        relay.subscribe(b, "x").await.unwrap();
        next_event(&mut rx_a).await;
        next_event(&mut rx_a).await;
        next_event(&mut rx_b).await;

        relay.disconnect(a).await.unwrap();

        let err = relay
            .publish(a, "x", Bytes::from_static(b"gone"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::UnknownConnection(_)));

        relay
            .publish(b, "x", Bytes::from_static(b"still here"))
            .await
            .unwrap();
        assert_eq!(
            next_event(&mut rx_b).await,
            RelayEvent::Message {
                channel: "x".into(),
                payload: Bytes::from_static(b"still here"),
            }
        );
    }

    #[tokio::test]
    async fn shutdown_refuses_new_connections() {
        let relay = Relay::new(MemoryBroker::new());
        relay.shutdown().await;
        assert!(matches!(relay.connect().await, Err(RelayError::Closed)));
    }
}
