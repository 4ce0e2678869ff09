//! The merge policy for a live, filtered transaction list.

use crate::{broadcast::TransactionNotification, transaction::AccountType};

/// A newest-first list of transaction display rows and its active filter.
///
/// Rows carry pre-formatted display strings and are never edited after
/// insertion. The list is mutated only through this type's methods, so a
/// single owner of a `FeedState` gets a single conceptual mutation queue
/// for page loads, filter changes, and live notifications.
#[derive(Debug, Clone, Default)]
pub struct FeedState {
    rows: Vec<TransactionNotification>,
    filter: Option<AccountType>,
}

impl FeedState {
    /// Create an empty list with the given filter.
    pub fn new(filter: Option<AccountType>) -> Self {
        Self {
            rows: Vec::new(),
            filter,
        }
    }

    /// The rows currently in view, newest first.
    pub fn rows(&self) -> &[TransactionNotification] {
        &self.rows
    }

    /// The active account-type filter, if any.
    pub fn filter(&self) -> Option<AccountType> {
        self.filter
    }

    /// Merge a live notification into the list.
    ///
    /// The notification is dropped when the active filter rejects it, and
    /// when a row with the same ID is already present (the hub may deliver
    /// duplicates). Otherwise it is prepended, keeping the list ordered by
    /// merge order, newest first. Returns whether the list changed.
    pub fn merge(&mut self, notification: TransactionNotification) -> bool {
        if !self.matches_filter(&notification) {
            return false;
        }

        if self.contains(notification.id) {
            return false;
        }

        self.rows.insert(0, notification);
        true
    }

    /// Change the active filter.
    ///
    /// Rows loaded under the old filter may not satisfy the new one, so the
    /// list is cleared; the owner is expected to load a fresh page next.
    pub fn set_filter(&mut self, filter: Option<AccountType>) {
        self.filter = filter;
        self.rows.clear();
    }

    /// Append a page of rows fetched from the list endpoint.
    ///
    /// Pages are older than everything already in view, so rows go to the
    /// back. A row whose ID is already present is skipped: a notification
    /// merged moments ago can also appear in a freshly fetched page.
    pub fn load_page(&mut self, page: Vec<TransactionNotification>) {
        for row in page {
            if self.matches_filter(&row) && !self.contains(row.id) {
                self.rows.push(row);
            }
        }
    }

    fn matches_filter(&self, row: &TransactionNotification) -> bool {
        match self.filter {
            Some(account_type) => row.account_type == account_type,
            None => true,
        }
    }

    fn contains(&self, id: crate::transaction::TransactionId) -> bool {
        self.rows.iter().any(|row| row.id == id)
    }
}
