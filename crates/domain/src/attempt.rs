use std::fmt::{Display, Formatter};

use bastion_core::{AppError, AppResult, SubjectId};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

const SUBJECT_KEY_PREFIX: &str = "subject:";
const FALLBACK_KEY_PREFIX: &str = "fallback:";

/// Key an attempt counter is tracked under.
///
/// Subjects are keyed by their identifier. Tokens that cannot be parsed are
/// keyed by a caller-supplied fallback such as the client IP.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptKey(String);

impl AttemptKey {
    /// Key for a known subject.
    #[must_use]
    pub fn subject(subject: &SubjectId) -> Self {
        Self(format!("{SUBJECT_KEY_PREFIX}{subject}"))
    }

    /// Key for an anonymous caller.
    #[must_use]
    pub fn fallback(identifier: &str) -> Self {
        let identifier = identifier.trim();
        let identifier = if identifier.is_empty() {
            "unknown"
        } else {
            identifier
        };
        Self(format!("{FALLBACK_KEY_PREFIX}{identifier}"))
    }

    /// Restores a key read back from storage.
    pub fn from_storage(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if !value.starts_with(SUBJECT_KEY_PREFIX) && !value.starts_with(FALLBACK_KEY_PREFIX) {
            return Err(AppError::Validation(format!(
                "invalid attempt key '{value}'"
            )));
        }

        Ok(Self(value))
    }

    /// Returns the storage value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the subject this key tracks, if it is a subject key.
    #[must_use]
    pub fn subject_id(&self) -> Option<SubjectId> {
        self.0
            .strip_prefix(SUBJECT_KEY_PREFIX)
            .and_then(|value| SubjectId::new(value).ok())
    }
}

impl Display for AttemptKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Threshold and block duration applied by the attempt guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptPolicy {
    failure_threshold: u32,
    block_duration: TimeDelta,
}

impl AttemptPolicy {
    /// Failures after which a key is blocked.
    pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
    /// Block length in seconds.
    pub const DEFAULT_BLOCK_SECONDS: i64 = 15 * 60;
    /// Longest accepted block, in seconds.
    pub const MAX_BLOCK_SECONDS: i64 = 366 * 24 * 60 * 60;

    /// Creates a policy, rejecting a zero threshold or a duration outside
    /// `1..=MAX_BLOCK_SECONDS`.
    pub fn new(failure_threshold: u32, block_duration: TimeDelta) -> AppResult<Self> {
        if failure_threshold == 0 {
            return Err(AppError::Validation(
                "failure threshold must be greater than zero".to_owned(),
            ));
        }
        if block_duration <= TimeDelta::zero() {
            return Err(AppError::Validation(
                "block duration must be greater than zero".to_owned(),
            ));
        }
        if block_duration > TimeDelta::seconds(Self::MAX_BLOCK_SECONDS) {
            return Err(AppError::Validation(format!(
                "block duration must not exceed {} seconds",
                Self::MAX_BLOCK_SECONDS
            )));
        }

        Ok(Self {
            failure_threshold,
            block_duration,
        })
    }

    /// Returns the failure threshold.
    #[must_use]
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// Returns the block duration.
    #[must_use]
    pub fn block_duration(&self) -> TimeDelta {
        self.block_duration
    }
}

impl Default for AttemptPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: Self::DEFAULT_FAILURE_THRESHOLD,
            block_duration: TimeDelta::seconds(Self::DEFAULT_BLOCK_SECONDS),
        }
    }
}

/// Observable state of an attempt counter at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// No outstanding failures.
    Clear,
    /// Failures recorded, threshold not reached.
    Counting {
        /// Consecutive failures so far.
        failed_count: u32,
    },
    /// Attempts fail fast until the instant passes.
    Blocked {
        /// End of the block.
        until: DateTime<Utc>,
    },
}

/// Per-key abuse tracking record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptCounter {
    /// Tracked key.
    pub key: AttemptKey,
    /// Consecutive failures since the last success or expired block.
    pub failed_count: u32,
    /// Time of the most recent recorded attempt.
    pub last_attempt_at: DateTime<Utc>,
    /// End of the active block, if one was set.
    pub blocked_until: Option<DateTime<Utc>>,
}

impl AttemptCounter {
    /// Creates a counter in the clear state.
    #[must_use]
    pub fn new(key: AttemptKey, now: DateTime<Utc>) -> Self {
        Self {
            key,
            failed_count: 0,
            last_attempt_at: now,
            blocked_until: None,
        }
    }

    /// Returns whether attempts must fail fast at `now`.
    #[must_use]
    pub fn is_blocked_at(&self, now: DateTime<Utc>) -> bool {
        self.blocked_until.is_some_and(|until| now < until)
    }

    /// Returns the state at `now`. An elapsed block reads as clear.
    #[must_use]
    pub fn state_at(&self, now: DateTime<Utc>) -> AttemptState {
        match self.blocked_until {
            Some(until) if now < until => AttemptState::Blocked { until },
            Some(_) => AttemptState::Clear,
            None if self.failed_count == 0 => AttemptState::Clear,
            None => AttemptState::Counting {
                failed_count: self.failed_count,
            },
        }
    }

    /// Applies a failed attempt.
    ///
    /// A failure while blocked leaves the block untouched. A failure after an
    /// elapsed block starts counting again from one.
    pub fn register_failure(&mut self, now: DateTime<Utc>, policy: &AttemptPolicy) -> AttemptState {
        if self.is_blocked_at(now) {
            return self.state_at(now);
        }

        if self.blocked_until.take().is_some() {
            self.failed_count = 0;
        }

        self.failed_count = self.failed_count.saturating_add(1);
        self.last_attempt_at = now;

        if self.failed_count >= policy.failure_threshold() {
            self.blocked_until = Some(now + policy.block_duration());
        }

        self.state_at(now)
    }

    /// Applies a successful attempt.
    pub fn register_success(&mut self, now: DateTime<Utc>) {
        self.failed_count = 0;
        self.blocked_until = None;
        self.last_attempt_at = now;
    }

    /// Returns whether the record carries no information worth keeping.
    #[must_use]
    pub fn is_sweepable_at(&self, now: DateTime<Utc>) -> bool {
        match self.blocked_until {
            Some(until) => until <= now,
            None => self.failed_count == 0,
        }
    }
}
