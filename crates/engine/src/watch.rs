//! Change notification feed.
//!
//! Every committed mutation publishes a [`ChangeEvent`] describing which
//! collection changed and for whom. Subscribers do not receive payload diffs;
//! the contract is refetch-on-any-event: a view that sees an event re-issues
//! its full list query. [`RefetchBridge`] implements that contract with a
//! short debounce so bursts of events coalesce into a single refetch.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::EngineError;

/// Collections observable through the feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Users,
    Families,
    HouseholdTransactions,
    HouseholdCategories,
    Orders,
    OrderExpenses,
    Debts,
    DebtPayments,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Families => "families",
            Self::HouseholdTransactions => "household_transactions",
            Self::HouseholdCategories => "household_categories",
            Self::Orders => "orders",
            Self::OrderExpenses => "order_expenses",
            Self::Debts => "debts",
            Self::DebtPayments => "debt_payments",
        }
    }
}

impl TryFrom<&str> for Collection {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "users" => Ok(Self::Users),
            "families" => Ok(Self::Families),
            "household_transactions" => Ok(Self::HouseholdTransactions),
            "household_categories" => Ok(Self::HouseholdCategories),
            "orders" => Ok(Self::Orders),
            "order_expenses" => Ok(Self::OrderExpenses),
            "debts" => Ok(Self::Debts),
            "debt_payments" => Ok(Self::DebtPayments),
            other => Err(EngineError::NotFound(format!(
                "unknown collection: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// A single store mutation, delivered at-least-once to matching watchers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub kind: ChangeKind,
    pub record_id: Uuid,
    /// Family the changed row belonged to at mutation time, if any.
    pub family_id: Option<Uuid>,
    /// Owning (or affected) user, if any.
    pub user_id: Option<Uuid>,
}

/// What a watcher is interested in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchScope {
    /// Events tagged with this family id.
    Family(Uuid),
    /// Events tagged with this user id (solo mode, no family).
    Solo(Uuid),
}

impl WatchScope {
    fn matches(self, event: &ChangeEvent) -> bool {
        match self {
            Self::Family(family_id) => event.family_id == Some(family_id),
            Self::Solo(user_id) => event.user_id == Some(user_id),
        }
    }
}

/// Messages surfaced by [`FamilyWatcher::recv`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WatchMessage {
    Event(ChangeEvent),
    /// The watcher fell behind and missed events. Consumers must refetch;
    /// a missed event may never starve consistency.
    Lagged,
}

/// Broadcast hub owned by the engine.
#[derive(Debug)]
pub(crate) struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub(crate) fn publish(&self, event: ChangeEvent) {
        // A send error only means nobody is listening right now.
        if self.tx.send(event.clone()).is_err() {
            tracing::trace!(collection = event.collection.as_str(), "change event dropped (no subscribers)");
        }
    }

    pub(crate) fn watch(&self, scope: WatchScope) -> FamilyWatcher {
        FamilyWatcher {
            scope,
            rx: self.tx.subscribe(),
        }
    }
}

/// A registration on the change feed, filtered by scope.
///
/// Dropping the watcher releases the registration; nothing leaks for the
/// life of the process.
#[derive(Debug)]
pub struct FamilyWatcher {
    scope: WatchScope,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl FamilyWatcher {
    pub fn scope(&self) -> WatchScope {
        self.scope
    }

    /// Waits for the next in-scope message. Returns `None` once the feed is
    /// closed (engine dropped).
    pub async fn recv(&mut self) -> Option<WatchMessage> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.scope.matches(&event) => {
                    return Some(WatchMessage::Event(event));
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => return Some(WatchMessage::Lagged),
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Discards everything currently queued, returning how many in-scope
    /// events were dropped. Used to coalesce bursts before a refetch.
    pub fn drain(&mut self) -> usize {
        let mut dropped = 0;
        loop {
            match self.rx.try_recv() {
                Ok(event) if self.scope.matches(&event) => dropped += 1,
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(_)) => dropped += 1,
                Err(_) => return dropped,
            }
        }
    }
}

/// Refetch-on-any-event driver.
///
/// On each wake the bridge sleeps out the debounce window, drains whatever
/// else arrived meanwhile, and runs the full refetch once. The debounce also
/// gives a lagging read path time to catch up with a just-committed write;
/// that part is best-effort, not a guarantee.
#[derive(Clone, Copy, Debug)]
pub struct RefetchBridge {
    debounce: Duration,
}

impl Default for RefetchBridge {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1200),
        }
    }
}

impl RefetchBridge {
    pub fn new(debounce: Duration) -> Self {
        Self { debounce }
    }

    /// Drives `refetch` until the feed closes. Every burst of events within
    /// the debounce window produces exactly one refetch.
    pub async fn drive<F, Fut>(&self, mut watcher: FamilyWatcher, mut refetch: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        while watcher.recv().await.is_some() {
            tokio::time::sleep(self.debounce).await;
            watcher.drain();
            refetch().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(family_id: Option<Uuid>, user_id: Option<Uuid>) -> ChangeEvent {
        ChangeEvent {
            collection: Collection::HouseholdTransactions,
            kind: ChangeKind::Insert,
            record_id: Uuid::new_v4(),
            family_id,
            user_id,
        }
    }

    #[test]
    fn family_scope_matches_family_events_only() {
        let family_id = Uuid::new_v4();
        let scope = WatchScope::Family(family_id);

        assert!(scope.matches(&event(Some(family_id), None)));
        assert!(!scope.matches(&event(Some(Uuid::new_v4()), None)));
        assert!(!scope.matches(&event(None, Some(Uuid::new_v4()))));
    }

    #[test]
    fn solo_scope_matches_on_user() {
        let user_id = Uuid::new_v4();
        let scope = WatchScope::Solo(user_id);

        assert!(scope.matches(&event(None, Some(user_id))));
        assert!(!scope.matches(&event(None, Some(Uuid::new_v4()))));
    }

    #[tokio::test]
    async fn watcher_filters_out_of_scope_events() {
        let feed = ChangeFeed::new(16);
        let family_id = Uuid::new_v4();
        let mut watcher = feed.watch(WatchScope::Family(family_id));

        feed.publish(event(Some(Uuid::new_v4()), None));
        let mine = event(Some(family_id), None);
        feed.publish(mine.clone());

        assert_eq!(watcher.recv().await, Some(WatchMessage::Event(mine)));
    }

    #[tokio::test(start_paused = true)]
    async fn bridge_coalesces_bursts_into_one_refetch() {
        let feed = ChangeFeed::new(16);
        let family_id = Uuid::new_v4();
        let watcher = feed.watch(WatchScope::Family(family_id));

        for _ in 0..5 {
            feed.publish(event(Some(family_id), None));
        }
        drop(feed);

        let refetches = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = refetches.clone();
        RefetchBridge::new(Duration::from_millis(1200))
            .drive(watcher, move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                }
            })
            .await;

        assert_eq!(refetches.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
