//! The transaction event fan-out subsystem.
//!
//! New transactions are published to an in-process topic hub which fans each
//! notification out to every subscribed WebSocket connection, optionally
//! excluding the connection that performed the write. Delivery is
//! best-effort: there is no durability and no replay, and consumers must
//! tolerate duplicates.

mod hub;
mod notification;
mod publisher;
mod socket_endpoint;

pub use hub::{BroadcastHub, ServerFrame, SocketId, Subscription};
pub use notification::TransactionNotification;
pub(crate) use notification::format_amount;
pub use publisher::{TRANSACTIONS_TOPIC, publish_new_transaction};
pub(crate) use socket_endpoint::websocket_endpoint;
