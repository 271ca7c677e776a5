use std::time::Duration;

use base64::Engine as _;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    watch::{ChangeFeed, FamilyWatcher, WatchScope},
};

mod access;
mod categories;
mod debts;
mod families;
mod history;
mod household;
mod orders;
mod profiles;

pub use debts::{DebtPatch, NewDebt};
pub use household::{HouseholdPatch, HouseholdSummary, NewHouseholdTransaction};
pub use orders::{NewOrder, OrderPatch};
pub use profiles::{Profile, ProfilePatch};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: $crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Bounded retry with exponential backoff, shared by the operations that the
/// design marks as retryable.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub(crate) fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1 << attempt.min(16))
    }
}

/// Opaque pagination cursor for newest-first ledger listings.
///
/// Pagination is newest → older by `(at DESC, id DESC)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct PageCursor {
    pub at: DateTime<Utc>,
    pub id: Uuid,
}

impl PageCursor {
    pub(crate) fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid page cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    pub(crate) fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid page cursor".to_string()))?;
        serde_json::from_slice(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid page cursor".to_string()))
    }
}

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    feed: ChangeFeed,
    profile_timeout: Duration,
    retry: RetryPolicy,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Registers interest in every change affecting `family_id`.
    ///
    /// Each call is an independent registration; dropping the returned
    /// watcher releases it.
    pub fn subscribe_family(&self, family_id: Uuid) -> FamilyWatcher {
        self.feed.watch(WatchScope::Family(family_id))
    }

    /// Solo-mode registration for a user without a family.
    pub fn subscribe_user(&self, user_id: Uuid) -> FamilyWatcher {
        self.feed.watch(WatchScope::Solo(user_id))
    }

    /// Emits a change event for a committed mutation.
    pub(super) fn publish(&self, event: crate::watch::ChangeEvent) {
        self.feed.publish(event);
    }
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    profile_timeout: Duration,
    retry: RetryPolicy,
    feed_capacity: usize,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            profile_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
            feed_capacity: 256,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Upper bound on the profile resolver's primary read.
    pub fn profile_timeout(mut self, timeout: Duration) -> EngineBuilder {
        self.profile_timeout = timeout;
        self
    }

    /// Retry policy for refresh-style operations.
    pub fn retry(mut self, retry: RetryPolicy) -> EngineBuilder {
        self.retry = retry;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            feed: ChangeFeed::new(self.feed_capacity),
            profile_timeout: self.profile_timeout,
            retry: self.retry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trip() {
        let cursor = PageCursor {
            at: Utc::now(),
            id: Uuid::new_v4(),
        };
        let encoded = cursor.encode().unwrap();
        let decoded = PageCursor::decode(&encoded).unwrap();
        assert_eq!(decoded.id, cursor.id);
        assert_eq!(decoded.at, cursor.at);
    }

    #[test]
    fn garbage_cursor_is_rejected() {
        assert_eq!(
            PageCursor::decode("not-a-cursor").unwrap_err(),
            EngineError::InvalidCursor("invalid page cursor".to_string())
        );
    }

    #[test]
    fn retry_delays_double() {
        let retry = RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(retry.delay_for(0), Duration::from_millis(100));
        assert_eq!(retry.delay_for(1), Duration::from_millis(200));
        assert_eq!(retry.delay_for(2), Duration::from_millis(400));
    }
}
