//! Publishes new-transaction notifications to the broadcast hub.

use crate::{
    broadcast::{BroadcastHub, ServerFrame, SocketId, TransactionNotification},
    transaction::Transaction,
};

/// The well-known topic that new-transaction notifications are published to.
pub const TRANSACTIONS_TOPIC: &str = "transactions";

/// Build and publish the notification for a freshly persisted `transaction`.
///
/// Publishing is fire-and-forget: the write has already committed, so any
/// failure here is logged and swallowed rather than surfaced to the caller,
/// and nothing is retried. `exclude_socket` is the writer's own connection,
/// which already holds the value locally ("broadcast to others").
pub fn publish_new_transaction(
    hub: &BroadcastHub,
    transaction: &Transaction,
    user_name: &str,
    exclude_socket: Option<SocketId>,
) {
    let notification = match TransactionNotification::from_transaction(transaction, user_name) {
        Ok(notification) => notification,
        Err(error) => {
            tracing::warn!(
                transaction_id = transaction.id,
                "could not build notification: {error}"
            );
            return;
        }
    };

    let delivered = hub.publish(
        TRANSACTIONS_TOPIC,
        ServerFrame::NewTransaction {
            channel: TRANSACTIONS_TOPIC.to_owned(),
            data: notification,
        },
        exclude_socket,
    );

    tracing::debug!(
        transaction_id = transaction.id,
        delivered,
        "published new-transaction notification"
    );
}

#[cfg(test)]
mod publisher_tests {
    use time::macros::datetime;

    use crate::{
        broadcast::{BroadcastHub, ServerFrame, TRANSACTIONS_TOPIC, publish_new_transaction},
        transaction::{AccountType, Transaction},
        user::UserID,
    };

    fn sample_transaction() -> Transaction {
        Transaction {
            id: 1,
            user_id: UserID::new(1),
            amount: 100.5,
            description: "Grocery shopping".to_owned(),
            account_type: AccountType::Checking,
            created_at: datetime!(2026-08-30 17:45:03 UTC),
        }
    }

    #[tokio::test]
    async fn publishes_once_to_the_transactions_topic() {
        let hub = BroadcastHub::new();
        let (socket_id, mut receiver) = hub.connect();
        hub.subscribe(socket_id, TRANSACTIONS_TOPIC);

        publish_new_transaction(&hub, &sample_transaction(), "Alice", None);

        let Some(ServerFrame::NewTransaction { channel, data }) = receiver.try_recv().ok() else {
            panic!("expected a NewTransaction frame");
        };
        assert_eq!(channel, "transactions");
        assert_eq!(data.user, "Alice");
        assert_eq!(data.amount, "100.50");
        assert!(receiver.try_recv().is_err(), "expected exactly one frame");
    }

    #[tokio::test]
    async fn excludes_the_writer_connection() {
        let hub = BroadcastHub::new();
        let (writer_socket, mut writer_receiver) = hub.connect();
        hub.subscribe(writer_socket, TRANSACTIONS_TOPIC);
        let (other_socket, mut other_receiver) = hub.connect();
        hub.subscribe(other_socket, TRANSACTIONS_TOPIC);

        publish_new_transaction(&hub, &sample_transaction(), "Alice", Some(writer_socket));

        assert!(writer_receiver.try_recv().is_err());
        assert!(other_receiver.try_recv().is_ok());
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_is_a_no_op() {
        let hub = BroadcastHub::new();

        // Must not panic or error; delivery is best-effort.
        publish_new_transaction(&hub, &sample_transaction(), "Alice", None);
    }
}
