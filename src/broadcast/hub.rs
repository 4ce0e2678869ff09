//! An in-process, topic-based publish/subscribe hub.
//!
//! The hub owns one message queue per connected socket. Publishing to a
//! topic delivers to every socket currently subscribed to that topic, with
//! per-socket ordering matching publish order. There is no ordering across
//! publishers and no durability: sockets that subscribe later never see
//! earlier messages.

use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::broadcast::TransactionNotification;

/// A process-unique identifier for one hub connection.
///
/// Clients learn their own socket ID from the `connected` frame and echo it
/// in the `X-Socket-Id` request header so that writes they perform are not
/// broadcast back to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SocketId(u64);

impl SocketId {
    /// Reconstruct a socket ID from its integer form, e.g. from a request
    /// header.
    pub fn from_u64(id: u64) -> Self {
        Self(id)
    }

    /// Cast the socket ID to a 64 bit integer.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for SocketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "socket-{}", self.0)
    }
}

/// A frame sent from the server to a connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ServerFrame {
    /// The first frame on every connection, telling the client its own
    /// socket ID.
    #[serde(rename = "connected")]
    Connected {
        /// The ID assigned to this connection.
        socket_id: SocketId,
    },
    /// A new transaction was recorded by some client.
    #[serde(rename = "NewTransaction")]
    NewTransaction {
        /// The topic this frame was published to.
        channel: String,
        /// The notification payload.
        data: TransactionNotification,
    },
}

struct Connection {
    sender: mpsc::UnboundedSender<ServerFrame>,
    topics: HashSet<String>,
}

/// The hub holding every live connection and its topic subscriptions.
///
/// All methods take `&self`; the hub is intended to be shared behind an
/// `Arc` between the HTTP handlers and the WebSocket tasks.
#[derive(Default)]
pub struct BroadcastHub {
    next_socket_id: AtomicU64,
    connections: Mutex<HashMap<SocketId, Connection>>,
}

impl BroadcastHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection, returning its socket ID and the receiving
    /// end of its message queue.
    ///
    /// # Panics
    /// Panics if the connection table lock is poisoned.
    pub fn connect(&self) -> (SocketId, mpsc::UnboundedReceiver<ServerFrame>) {
        let socket_id = SocketId(self.next_socket_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (sender, receiver) = mpsc::unbounded_channel();

        self.connections.lock().unwrap().insert(
            socket_id,
            Connection {
                sender,
                topics: HashSet::new(),
            },
        );

        (socket_id, receiver)
    }

    /// Remove a connection and all of its subscriptions.
    ///
    /// Disconnecting an unknown socket is a no-op, so this is safe to call
    /// from every exit path.
    ///
    /// # Panics
    /// Panics if the connection table lock is poisoned.
    pub fn disconnect(&self, socket_id: SocketId) {
        self.connections.lock().unwrap().remove(&socket_id);
    }

    /// Subscribe `socket_id` to `topic`. No-op for unknown sockets.
    ///
    /// # Panics
    /// Panics if the connection table lock is poisoned.
    pub fn subscribe(&self, socket_id: SocketId, topic: &str) {
        if let Some(connection) = self.connections.lock().unwrap().get_mut(&socket_id) {
            connection.topics.insert(topic.to_owned());
        }
    }

    /// Unsubscribe `socket_id` from `topic`. No-op for unknown sockets.
    ///
    /// # Panics
    /// Panics if the connection table lock is poisoned.
    pub fn unsubscribe(&self, socket_id: SocketId, topic: &str) {
        if let Some(connection) = self.connections.lock().unwrap().get_mut(&socket_id) {
            connection.topics.remove(topic);
        }
    }

    /// Deliver `frame` to every socket subscribed to `topic`, except
    /// `exclude`.
    ///
    /// Returns the number of sockets the frame was queued for. Sockets whose
    /// receiving task has gone away are dropped from the hub.
    ///
    /// # Panics
    /// Panics if the connection table lock is poisoned.
    pub fn publish(&self, topic: &str, frame: ServerFrame, exclude: Option<SocketId>) -> usize {
        let mut connections = self.connections.lock().unwrap();
        let mut delivered = 0;
        let mut dead = Vec::new();

        for (socket_id, connection) in connections.iter() {
            if Some(*socket_id) == exclude || !connection.topics.contains(topic) {
                continue;
            }

            match connection.sender.send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => dead.push(*socket_id),
            }
        }

        for socket_id in dead {
            tracing::debug!(%socket_id, "dropping connection with closed receiver");
            connections.remove(&socket_id);
        }

        delivered
    }

    /// The number of live connections, for tests and diagnostics.
    ///
    /// # Panics
    /// Panics if the connection table lock is poisoned.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }
}

/// A scoped subscription to one topic.
///
/// Holds its own hub connection; dropping the subscription disconnects it,
/// so releasing on every exit path comes for free.
pub struct Subscription {
    hub: std::sync::Arc<BroadcastHub>,
    socket_id: SocketId,
    receiver: mpsc::UnboundedReceiver<ServerFrame>,
}

impl Subscription {
    /// Connect to `hub` and subscribe to `topic`.
    pub fn new(hub: std::sync::Arc<BroadcastHub>, topic: &str) -> Self {
        let (socket_id, receiver) = hub.connect();
        hub.subscribe(socket_id, topic);

        Self {
            hub,
            socket_id,
            receiver,
        }
    }

    /// The socket ID of this subscription's connection.
    pub fn socket_id(&self) -> SocketId {
        self.socket_id
    }

    /// Receive the next frame, or `None` once the hub has dropped this
    /// connection.
    pub async fn recv(&mut self) -> Option<ServerFrame> {
        self.receiver.recv().await
    }

    /// Receive a frame if one is already queued.
    pub fn try_recv(&mut self) -> Option<ServerFrame> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.disconnect(self.socket_id);
    }
}

#[cfg(test)]
mod hub_tests {
    use std::sync::Arc;

    use crate::broadcast::{
        BroadcastHub, ServerFrame, Subscription, TransactionNotification,
        hub::SocketId,
    };
    use crate::transaction::AccountType;

    fn notification(id: i64) -> ServerFrame {
        ServerFrame::NewTransaction {
            channel: "transactions".to_owned(),
            data: TransactionNotification {
                id,
                user: "Alice".to_owned(),
                amount: "1.00".to_owned(),
                description: "test".to_owned(),
                account_type: AccountType::Checking,
                created_at: "2026-08-30 12:00:00".to_owned(),
            },
        }
    }

    #[tokio::test]
    async fn publish_reaches_all_subscribers_of_the_topic() {
        let hub = BroadcastHub::new();
        let (id_a, mut rx_a) = hub.connect();
        let (id_b, mut rx_b) = hub.connect();
        let (_id_c, mut rx_c) = hub.connect();
        hub.subscribe(id_a, "transactions");
        hub.subscribe(id_b, "transactions");
        // C never subscribes.

        let delivered = hub.publish("transactions", notification(1), None);

        assert_eq!(delivered, 2);
        assert_eq!(rx_a.try_recv().ok(), Some(notification(1)));
        assert_eq!(rx_b.try_recv().ok(), Some(notification(1)));
        assert!(rx_c.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_excludes_the_writer_socket() {
        let hub = BroadcastHub::new();
        let (id_a, mut rx_a) = hub.connect();
        let (id_b, mut rx_b) = hub.connect();
        hub.subscribe(id_a, "transactions");
        hub.subscribe(id_b, "transactions");

        let delivered = hub.publish("transactions", notification(1), Some(id_a));

        assert_eq!(delivered, 1);
        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().ok(), Some(notification(1)));
    }

    #[tokio::test]
    async fn per_socket_delivery_preserves_publish_order() {
        let hub = BroadcastHub::new();
        let (id, mut rx) = hub.connect();
        hub.subscribe(id, "transactions");

        for i in 1..=3 {
            hub.publish("transactions", notification(i), None);
        }

        for i in 1..=3 {
            assert_eq!(rx.recv().await, Some(notification(i)));
        }
    }

    #[tokio::test]
    async fn unsubscribed_socket_stops_receiving() {
        let hub = BroadcastHub::new();
        let (id, mut rx) = hub.connect();
        hub.subscribe(id, "transactions");
        hub.publish("transactions", notification(1), None);
        hub.unsubscribe(id, "transactions");

        hub.publish("transactions", notification(2), None);

        assert_eq!(rx.try_recv().ok(), Some(notification(1)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn resubscribing_resumes_with_future_events_only() {
        let hub = BroadcastHub::new();
        hub.publish("transactions", notification(1), None);

        let (id, mut rx) = hub.connect();
        hub.subscribe(id, "transactions");
        hub.publish("transactions", notification(2), None);

        // Only the event published after subscribing arrives.
        assert_eq!(rx.try_recv().ok(), Some(notification(2)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_prunes_connections_with_dropped_receivers() {
        let hub = BroadcastHub::new();
        let (id, rx) = hub.connect();
        hub.subscribe(id, "transactions");
        drop(rx);

        let delivered = hub.publish("transactions", notification(1), None);

        assert_eq!(delivered, 0);
        assert_eq!(hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn dropping_a_subscription_disconnects_it() {
        let hub = Arc::new(BroadcastHub::new());

        {
            let _subscription = Subscription::new(hub.clone(), "transactions");
            assert_eq!(hub.connection_count(), 1);
        }

        assert_eq!(hub.connection_count(), 0);
        // Publishing after the guard is gone reaches nobody.
        assert_eq!(hub.publish("transactions", notification(1), None), 0);
    }

    #[test]
    fn socket_ids_are_unique_per_hub() {
        let hub = BroadcastHub::new();
        let (id_a, _rx_a) = hub.connect();
        let (id_b, _rx_b) = hub.connect();

        assert_ne!(id_a, id_b);
    }

    #[test]
    fn server_frame_wire_format() {
        let frame = ServerFrame::Connected {
            socket_id: SocketId::from_u64(7),
        };

        let json = serde_json::to_string(&frame).unwrap();

        assert_eq!(json, r#"{"event":"connected","socket_id":7}"#);
    }
}
