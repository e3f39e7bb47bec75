use std::sync::Arc;

use tracing::info;

use bastion_core::AppResult;

use crate::{AttemptGuardService, Clock, RevocationRepository};

/// Counts from one cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JanitorReport {
    /// Attempt counters removed.
    pub swept_counters: u64,
    /// Revocation entries removed.
    pub purged_revocations: u64,
}

/// Periodic cleanup of state that no longer affects any decision.
///
/// Optional: blocks expire lazily and revocation lookups ignore lapsed
/// entries, so skipping this only costs storage.
#[derive(Clone)]
pub struct JanitorService {
    attempt_guard: AttemptGuardService,
    revocations: Arc<dyn RevocationRepository>,
    clock: Arc<dyn Clock>,
}

impl JanitorService {
    /// Creates a new janitor service.
    #[must_use]
    pub fn new(
        attempt_guard: AttemptGuardService,
        revocations: Arc<dyn RevocationRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            attempt_guard,
            revocations,
            clock,
        }
    }

    /// Runs one cleanup pass.
    pub async fn run_once(&self) -> AppResult<JanitorReport> {
        let swept_counters = self.attempt_guard.sweep().await?;
        let purged_revocations = self.revocations.delete_expired(self.clock.now()).await?;
        if purged_revocations > 0 {
            info!(purged_revocations, "purged expired revocations");
        }

        Ok(JanitorReport {
            swept_counters,
            purged_revocations,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeDelta;

    use bastion_domain::{AttemptKey, AttemptPolicy, TokenId};

    use super::{JanitorReport, JanitorService};
    use crate::test_support::{
        FakeAttemptCounterRepository, FakeRevocationRepository, ManualClock, start, subject,
    };
    use crate::{AttemptGuardService, RevocationRepository};

    #[tokio::test]
    async fn pass_removes_only_lapsed_state() {
        let clock = Arc::new(ManualClock::starting_at(start()));
        let revocations = Arc::new(FakeRevocationRepository::default());
        let guard = AttemptGuardService::new(
            Arc::new(FakeAttemptCounterRepository::default()),
            AttemptPolicy::default(),
            clock.clone(),
        );
        let janitor = JanitorService::new(guard.clone(), revocations.clone(), clock.clone());

        let blocked = AttemptKey::subject(&subject("emp-1"));
        for _ in 0..3 {
            assert!(guard.record_failure(&blocked).await.is_ok());
        }
        let short = revocations.revoke(TokenId::new(), start() + TimeDelta::minutes(10)).await;
        let long = revocations.revoke(TokenId::new(), start() + TimeDelta::hours(2)).await;
        assert!(short.is_ok() && long.is_ok());

        assert_eq!(janitor.run_once().await.ok(), Some(JanitorReport::default()));

        clock.advance(TimeDelta::minutes(20));
        assert_eq!(
            janitor.run_once().await.ok(),
            Some(JanitorReport {
                swept_counters: 1,
                purged_revocations: 1,
            })
        );
        assert_eq!(revocations.len().await, 1);
    }
}
