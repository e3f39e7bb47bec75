//! In-memory fakes shared by application service tests.

use std::collections::HashMap;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tokio::sync::Mutex;

use bastion_core::{AppError, AppResult, SubjectId};
use bastion_domain::{AttemptCounter, AttemptKey, AttemptPolicy, TokenClaims, TokenId};

use crate::{
    AccessConfigurationRepository, AttemptCounterRepository, AuthEvent, AuthEventOutcome,
    AuthEventRepository, Clock, GuardStats, RevocationRepository, TokenCodec, TokenDecodeError,
};

pub(crate) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0)
        .single()
        .unwrap_or_else(|| unreachable!())
}

pub(crate) fn subject(value: &str) -> SubjectId {
    SubjectId::new(value).unwrap_or_else(|_| unreachable!())
}

pub(crate) struct ManualClock {
    now: StdMutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(crate) fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now: StdMutex::new(now),
        }
    }

    pub(crate) fn advance(&self, delta: TimeDelta) {
        if let Ok(mut now) = self.now.lock() {
            *now += delta;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
            .lock()
            .map(|now| *now)
            .unwrap_or_else(|_| Utc::now())
    }
}

#[derive(Default)]
pub(crate) struct FakeAttemptCounterRepository {
    counters: Mutex<HashMap<AttemptKey, AttemptCounter>>,
}

#[async_trait]
impl AttemptCounterRepository for FakeAttemptCounterRepository {
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
        Ok(self
            .counters
            .lock()
            .await
            .values()
            .filter(|counter| counter.is_blocked_at(now))
            .cloned()
            .collect())
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
        Ok(u64::try_from(before - counters.len()).unwrap_or(u64::MAX))
    }
}

#[derive(Default)]
pub(crate) struct FakeRevocationRepository {
    entries: Mutex<HashMap<TokenId, DateTime<Utc>>>,
}

impl FakeRevocationRepository {
    pub(crate) async fn expiry_of(&self, token_id: TokenId) -> Option<DateTime<Utc>> {
        self.entries.lock().await.get(&token_id).copied()
    }

    pub(crate) async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl RevocationRepository for FakeRevocationRepository {
    async fn revoke(&self, token_id: TokenId, expires_at: DateTime<Utc>) -> AppResult<bool> {
        let mut entries = self.entries.lock().await;
        match entries.get_mut(&token_id) {
            Some(existing) => {
                *existing = (*existing).max(expires_at);
                Ok(false)
            }
            None => {
                entries.insert(token_id, expires_at);
                Ok(true)
            }
        }
    }

    async fn is_revoked(&self, token_id: TokenId, now: DateTime<Utc>) -> AppResult<bool> {
        Ok(self
            .entries
            .lock()
            .await
            .get(&token_id)
            .is_some_and(|expires_at| now < *expires_at))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, expires_at| now < *expires_at);
        Ok(u64::try_from(before - entries.len()).unwrap_or(u64::MAX))
    }
}

#[derive(Default)]
pub(crate) struct FakeAccessDocuments {
    documents: Mutex<HashMap<SubjectId, serde_json::Value>>,
}

impl FakeAccessDocuments {
    pub(crate) async fn set(&self, subject: &SubjectId, document: serde_json::Value) {
        self.documents.lock().await.insert(subject.clone(), document);
    }
}

#[async_trait]
impl AccessConfigurationRepository for FakeAccessDocuments {
    async fn find_document(&self, subject: &SubjectId) -> AppResult<Option<serde_json::Value>> {
        Ok(self.documents.lock().await.get(subject).cloned())
    }
}

#[derive(Default)]
pub(crate) struct RecordingAuthEvents {
    events: Mutex<Vec<AuthEvent>>,
}

impl RecordingAuthEvents {
    pub(crate) async fn outcomes(&self) -> Vec<(&'static str, AuthEventOutcome)> {
        self.events
            .lock()
            .await
            .iter()
            .map(|event| (event.kind.as_str(), event.outcome))
            .collect()
    }
}

#[async_trait]
impl AuthEventRepository for RecordingAuthEvents {
    async fn append_event(&self, event: AuthEvent) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

const FAKE_SIGNATURE: &str = "signed";

/// Codec that "signs" by appending a fixed suffix to the JSON claims.
pub(crate) struct FakeTokenCodec;

impl FakeTokenCodec {
    pub(crate) fn forge(token: &str) -> String {
        match token.rsplit_once('.') {
            Some((payload, _)) => format!("{payload}.forged"),
            None => format!("{token}.forged"),
        }
    }
}

impl TokenCodec for FakeTokenCodec {
    fn encode(&self, claims: &TokenClaims) -> AppResult<String> {
        let payload = serde_json::to_string(claims)
            .map_err(|error| AppError::Internal(format!("failed to encode claims: {error}")))?;
        Ok(format!("{payload}.{FAKE_SIGNATURE}"))
    }

    fn peek_subject(&self, token: &str) -> Option<SubjectId> {
        let (payload, _) = token.rsplit_once('.')?;
        let value: serde_json::Value = serde_json::from_str(payload).ok()?;
        SubjectId::new(value.get("sub")?.as_str()?).ok()
    }

    fn decode(&self, token: &str) -> Result<TokenClaims, TokenDecodeError> {
        let (payload, signature) = token.rsplit_once('.').ok_or(TokenDecodeError::Malformed)?;
        let claims: TokenClaims =
            serde_json::from_str(payload).map_err(|_| TokenDecodeError::Malformed)?;
        if signature != FAKE_SIGNATURE {
            return Err(TokenDecodeError::InvalidSignature);
        }
        Ok(claims)
    }
}
