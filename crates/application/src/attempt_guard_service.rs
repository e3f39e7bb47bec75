//! Attempt guard ports and application service.
//!
//! Tracks consecutive failures per key and blocks keys that reach the
//! configured threshold. Blocks expire lazily: no scheduler is required, an
//! elapsed block simply reads as clear on the next check.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use bastion_core::AppResult;
use bastion_domain::{AttemptCounter, AttemptKey, AttemptPolicy, AttemptState};

use crate::Clock;

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Repository port for attempt counter persistence.
///
/// `record_failure` and `record_success` must be atomic read-modify-write
/// operations: concurrent failures for one key must never under-count.
#[async_trait]
pub trait AttemptCounterRepository: Send + Sync {
    /// Applies a failed attempt and returns the updated counter.
    ///
    /// Creates the counter on first failure. A key that is still blocked at
    /// `now` is returned unchanged.
    async fn record_failure(
        &self,
        key: &AttemptKey,
        policy: &AttemptPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<AttemptCounter>;

    /// Zeroes the failure count and clears any block.
    async fn record_success(&self, key: &AttemptKey, now: DateTime<Utc>) -> AppResult<()>;

    /// Finds the counter for a key.
    async fn find(&self, key: &AttemptKey) -> AppResult<Option<AttemptCounter>>;

    /// Lists counters blocked at `now`, soonest expiry first.
    async fn list_blocked(&self, now: DateTime<Utc>) -> AppResult<Vec<AttemptCounter>>;

    /// Aggregates counters at `now`.
    async fn stats(&self, now: DateTime<Utc>) -> AppResult<GuardStats>;

    /// Removes clear counters and counters whose block elapsed before `now`.
    async fn delete_sweepable(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

/// Aggregate view of the attempt counter store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuardStats {
    /// Number of stored counters.
    pub tracked_keys: u64,
    /// Counters with failures below the threshold.
    pub counting_keys: u64,
    /// Counters currently blocked.
    pub blocked_keys: u64,
    /// Sum of outstanding failures across all counters.
    pub total_failures: u64,
}

impl GuardStats {
    /// Folds one counter into the aggregate.
    pub fn observe(&mut self, counter: &AttemptCounter, now: DateTime<Utc>) {
        self.tracked_keys += 1;
        match counter.state_at(now) {
            AttemptState::Clear => {}
            AttemptState::Counting { failed_count } => {
                self.counting_keys += 1;
                self.total_failures += u64::from(failed_count);
            }
            AttemptState::Blocked { .. } => {
                self.blocked_keys += 1;
                self.total_failures += u64::from(counter.failed_count);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Application service for brute-force protection.
#[derive(Clone)]
pub struct AttemptGuardService {
    repository: Arc<dyn AttemptCounterRepository>,
    policy: AttemptPolicy,
    clock: Arc<dyn Clock>,
}

impl AttemptGuardService {
    /// Creates a new attempt guard service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn AttemptCounterRepository>,
        policy: AttemptPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            policy,
            clock,
        }
    }

    /// Returns the active policy.
    #[must_use]
    pub fn policy(&self) -> AttemptPolicy {
        self.policy
    }

    /// Records a failed attempt for the key.
    pub async fn record_failure(&self, key: &AttemptKey) -> AppResult<AttemptCounter> {
        let now = self.clock.now();
        let counter = self.repository.record_failure(key, &self.policy, now).await?;

        match counter.state_at(now) {
            AttemptState::Blocked { until } => {
                warn!(
                    key = %key,
                    failed_count = counter.failed_count,
                    blocked_until = %until,
                    "attempt key blocked"
                );
            }
            AttemptState::Counting { failed_count } => {
                info!(key = %key, failed_count, "failed attempt recorded");
            }
            AttemptState::Clear => {}
        }

        Ok(counter)
    }

    /// Records a successful attempt for the key, resetting it to clear.
    pub async fn record_success(&self, key: &AttemptKey) -> AppResult<()> {
        self.repository.record_success(key, self.clock.now()).await
    }

    /// Returns whether the key is blocked right now. Never mutates state.
    pub async fn is_blocked(&self, key: &AttemptKey) -> AppResult<bool> {
        let now = self.clock.now();
        Ok(self
            .repository
            .find(key)
            .await?
            .is_some_and(|counter| counter.is_blocked_at(now)))
    }

    /// Returns the stored counter for the key, if any.
    pub async fn counter(&self, key: &AttemptKey) -> AppResult<Option<AttemptCounter>> {
        self.repository.find(key).await
    }

    /// Aggregates the counter store.
    pub async fn stats(&self) -> AppResult<GuardStats> {
        self.repository.stats(self.clock.now()).await
    }

    /// Lists currently blocked keys.
    pub async fn list_blocked(&self) -> AppResult<Vec<AttemptCounter>> {
        self.repository.list_blocked(self.clock.now()).await
    }

    /// Removes counters that no longer carry state. Intended for periodic cleanup.
    pub async fn sweep(&self) -> AppResult<u64> {
        let removed = self.repository.delete_sweepable(self.clock.now()).await?;
        if removed > 0 {
            info!(removed, "swept attempt counters");
        }
        Ok(removed)
    }
}
