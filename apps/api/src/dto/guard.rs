use bastion_application::GuardStats;
use bastion_core::{AppResult, SubjectId};
use bastion_domain::{AttemptCounter, AttemptPolicy, AttemptState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Incoming payload reporting a failed credential check.
#[derive(Debug, Deserialize)]
pub struct RecordFailureRequest {
    pub subject_id: String,
}

impl RecordFailureRequest {
    pub fn subject(&self) -> AppResult<SubjectId> {
        SubjectId::new(self.subject_id.as_str())
    }
}

/// API representation of an attempt counter.
#[derive(Debug, Serialize)]
pub struct AttemptCounterResponse {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    pub state: &'static str,
    pub failed_count: u32,
    pub last_attempt_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_until: Option<String>,
}

impl AttemptCounterResponse {
    pub fn at(counter: AttemptCounter, now: DateTime<Utc>) -> Self {
        let state = match counter.state_at(now) {
            AttemptState::Clear => "clear",
            AttemptState::Counting { .. } => "counting",
            AttemptState::Blocked { .. } => "blocked",
        };

        Self {
            key: counter.key.to_string(),
            subject_id: counter.key.subject_id().map(|subject| subject.to_string()),
            state,
            failed_count: counter.failed_count,
            last_attempt_at: counter.last_attempt_at.to_rfc3339(),
            blocked_until: counter.blocked_until.map(|until| until.to_rfc3339()),
        }
    }
}

/// Attempt guard counters and the active policy.
#[derive(Debug, Serialize)]
pub struct GuardStatsResponse {
    pub tracked_keys: u64,
    pub counting_keys: u64,
    pub blocked_keys: u64,
    pub total_failures: u64,
    pub failure_threshold: u32,
    pub block_seconds: i64,
}

impl GuardStatsResponse {
    pub fn new(stats: GuardStats, policy: AttemptPolicy) -> Self {
        Self {
            tracked_keys: stats.tracked_keys,
            counting_keys: stats.counting_keys,
            blocked_keys: stats.blocked_keys,
            total_failures: stats.total_failures,
            failure_threshold: policy.failure_threshold(),
            block_seconds: policy.block_duration().num_seconds(),
        }
    }
}
