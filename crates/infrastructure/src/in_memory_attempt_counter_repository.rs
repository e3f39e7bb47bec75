use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use bastion_application::{AttemptCounterRepository, GuardStats};
use bastion_core::AppResult;
use bastion_domain::{AttemptCounter, AttemptKey, AttemptPolicy};

/// In-memory attempt counter store.
///
/// One mutex guards the whole map so each read-modify-write is atomic.
#[derive(Default)]
pub struct InMemoryAttemptCounterRepository {
    counters: Mutex<HashMap<AttemptKey, AttemptCounter>>,
}

impl InMemoryAttemptCounterRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttemptCounterRepository for InMemoryAttemptCounterRepository {
    async fn record_failure(
        &self,
        key: &AttemptKey,
        policy: &AttemptPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<AttemptCounter> {
        let mut counters = self.counters.lock().await;
        let counter = counters
            .entry(key.clone())
            .or_insert_with(|| AttemptCounter::new(key.clone(), now));
        counter.register_failure(now, policy);

        Ok(counter.clone())
    }

    async fn record_success(&self, key: &AttemptKey, now: DateTime<Utc>) -> AppResult<()> {
        if let Some(counter) = self.counters.lock().await.get_mut(key) {
            counter.register_success(now);
        }

        Ok(())
    }

    async fn find(&self, key: &AttemptKey) -> AppResult<Option<AttemptCounter>> {
        Ok(self.counters.lock().await.get(key).cloned())
    }

    async fn list_blocked(&self, now: DateTime<Utc>) -> AppResult<Vec<AttemptCounter>> {
        let mut blocked: Vec<AttemptCounter> = self
            .counters
            .lock()
            .await
            .values()
            .filter(|counter| counter.is_blocked_at(now))
            .cloned()
            .collect();
        blocked.sort_by(|left, right| {
            left.blocked_until
                .cmp(&right.blocked_until)
                .then_with(|| left.key.cmp(&right.key))
        });

        Ok(blocked)
    }

    async fn stats(&self, now: DateTime<Utc>) -> AppResult<GuardStats> {
        let mut stats = GuardStats::default();
        for counter in self.counters.lock().await.values() {
            stats.observe(counter, now);
        }

        Ok(stats)
    }

    async fn delete_sweepable(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut counters = self.counters.lock().await;
        let before = counters.len();
        counters.retain(|_, counter| !counter.is_sweepable_at(now));

        Ok(u64::try_from(before.saturating_sub(counters.len())).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bastion_application::AttemptCounterRepository;
    use bastion_core::SubjectId;
    use bastion_domain::{AttemptKey, AttemptPolicy};
    use chrono::{TimeDelta, Utc};

    use super::InMemoryAttemptCounterRepository;

    fn key(value: &str) -> AttemptKey {
        AttemptKey::subject(&SubjectId::new(value).unwrap_or_else(|_| unreachable!()))
    }

    #[tokio::test]
    async fn concurrent_failures_are_not_lost() {
        let repository = Arc::new(InMemoryAttemptCounterRepository::new());
        let policy = AttemptPolicy::new(1_000, TimeDelta::minutes(1))
            .unwrap_or_else(|_| unreachable!());
        let now = Utc::now();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let repository = repository.clone();
            handles.push(tokio::spawn(async move {
                repository.record_failure(&key("emp-1"), &policy, now).await
            }));
        }
        for handle in handles {
            assert!(handle.await.is_ok_and(|result| result.is_ok()));
        }

        let counter = repository.find(&key("emp-1")).await.ok().flatten();
        assert_eq!(counter.map(|counter| counter.failed_count), Some(50));
    }

    #[tokio::test]
    async fn blocked_listing_is_ordered_by_expiry() {
        let repository = InMemoryAttemptCounterRepository::new();
        let policy =
            AttemptPolicy::new(1, TimeDelta::minutes(10)).unwrap_or_else(|_| unreachable!());
        let now = Utc::now();

        let late = repository
            .record_failure(&key("late"), &policy, now + TimeDelta::minutes(1))
            .await;
        let early = repository.record_failure(&key("early"), &policy, now).await;
        assert!(late.is_ok() && early.is_ok());

        let blocked = repository
            .list_blocked(now + TimeDelta::minutes(2))
            .await
            .unwrap_or_default();
        let keys: Vec<&str> = blocked.iter().map(|counter| counter.key.as_str()).collect();
        assert_eq!(keys, vec!["subject:early", "subject:late"]);
    }

    #[tokio::test]
    async fn success_on_unknown_key_is_a_no_op() {
        let repository = InMemoryAttemptCounterRepository::new();
        assert!(repository.record_success(&key("emp-9"), Utc::now()).await.is_ok());
        assert!(repository.find(&key("emp-9")).await.ok().flatten().is_none());
    }
}
