//! A client-side live view of the transaction list.
//!
//! [FeedState] holds the merge policy: a newest-first list of display rows
//! plus the active account-type filter, with every mutation going through
//! its methods. [spawn_feed] runs a [FeedState] inside a single task that
//! owns a hub subscription, so merges from notifications and filter or
//! page changes from the user never race.

mod state;
mod worker;

pub use state::FeedState;
pub use worker::{FeedHandle, spawn_feed};
