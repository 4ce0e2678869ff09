//! The task that owns a feed's subscription and serializes its updates.

use tokio::sync::{mpsc, watch};

use crate::{
    broadcast::{ServerFrame, Subscription, TransactionNotification},
    feed::FeedState,
    transaction::AccountType,
};

/// A request for the feed task, sent from whoever holds the [FeedHandle].
enum FeedCommand {
    SetFilter(Option<AccountType>),
    LoadPage(Vec<TransactionNotification>),
}

/// A handle to a running feed task.
///
/// Commands and incoming notifications are applied one at a time by a
/// single task, so a merge can never interleave with a filter change.
/// Dropping the handle stops the task, which drops its subscription and
/// releases the hub connection.
pub struct FeedHandle {
    commands: mpsc::UnboundedSender<FeedCommand>,
    snapshot: watch::Receiver<FeedState>,
}

impl FeedHandle {
    /// Replace the active filter. The list is cleared; follow with a
    /// [FeedHandle::load_page] of freshly fetched rows.
    pub fn set_filter(&self, filter: Option<AccountType>) {
        let _ = self.commands.send(FeedCommand::SetFilter(filter));
    }

    /// Append a page of rows fetched from the list endpoint.
    pub fn load_page(&self, page: Vec<TransactionNotification>) {
        let _ = self.commands.send(FeedCommand::LoadPage(page));
    }

    /// The state after the most recent update.
    pub fn snapshot(&self) -> FeedState {
        self.snapshot.borrow().clone()
    }

    /// Wait until the state changes, then return it.
    ///
    /// Returns `None` once the feed task has stopped.
    pub async fn changed(&mut self) -> Option<FeedState> {
        self.snapshot.changed().await.ok()?;

        Some(self.snapshot.borrow_and_update().clone())
    }
}

/// Run a [FeedState] fed by `subscription` on its own task.
///
/// The task exits when the handle is dropped or the hub drops the
/// connection; either way the subscription guard is released.
pub fn spawn_feed(subscription: Subscription, filter: Option<AccountType>) -> FeedHandle {
    let (command_sender, command_receiver) = mpsc::unbounded_channel();
    let (snapshot_sender, snapshot_receiver) = watch::channel(FeedState::new(filter));

    tokio::spawn(run_feed(
        subscription,
        FeedState::new(filter),
        command_receiver,
        snapshot_sender,
    ));

    FeedHandle {
        commands: command_sender,
        snapshot: snapshot_receiver,
    }
}

async fn run_feed(
    mut subscription: Subscription,
    mut state: FeedState,
    mut commands: mpsc::UnboundedReceiver<FeedCommand>,
    snapshot: watch::Sender<FeedState>,
) {
    loop {
        let changed = tokio::select! {
            frame = subscription.recv() => match frame {
                Some(ServerFrame::NewTransaction { data, .. }) => state.merge(data),
                Some(_) => false,
                None => break,
            },
            command = commands.recv() => match command {
                Some(FeedCommand::SetFilter(filter)) => {
                    state.set_filter(filter);
                    true
                }
                Some(FeedCommand::LoadPage(page)) => {
                    state.load_page(page);
                    true
                }
                None => break,
            },
        };

        if changed {
            snapshot.send_replace(state.clone());
        }
    }
}
