use std::collections::HashMap;
use std::collections::hash_map::Entry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use bastion_application::RevocationRepository;
use bastion_core::AppResult;
use bastion_domain::TokenId;

/// In-memory revocation set with per-entry expiry.
#[derive(Default)]
pub struct InMemoryRevocationRepository {
    entries: RwLock<HashMap<TokenId, DateTime<Utc>>>,
}

impl InMemoryRevocationRepository {
    /// Creates an empty revocation set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevocationRepository for InMemoryRevocationRepository {
    async fn revoke(&self, token_id: TokenId, expires_at: DateTime<Utc>) -> AppResult<bool> {
        let mut entries = self.entries.write().await;
        match entries.entry(token_id) {
            Entry::Occupied(mut entry) => {
                let retained = (*entry.get()).max(expires_at);
                entry.insert(retained);
                Ok(false)
            }
            Entry::Vacant(entry) => {
                entry.insert(expires_at);
                Ok(true)
            }
        }
    }

    async fn is_revoked(&self, token_id: TokenId, now: DateTime<Utc>) -> AppResult<bool> {
        {
            let entries = self.entries.read().await;
            match entries.get(&token_id) {
                Some(expires_at) if now < *expires_at => return Ok(true),
                Some(_) => {}
                None => return Ok(false),
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(&token_id)
            .is_some_and(|expires_at| *expires_at <= now)
        {
            entries.remove(&token_id);
        }

        Ok(false)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, expires_at| now < *expires_at);

        Ok(u64::try_from(before.saturating_sub(entries.len())).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use bastion_application::RevocationRepository;
    use bastion_domain::TokenId;
    use chrono::{TimeDelta, Utc};

    use super::InMemoryRevocationRepository;

    #[tokio::test]
    async fn entries_lapse_at_expiry() {
        let repository = InMemoryRevocationRepository::new();
        let token_id = TokenId::new();
        let now = Utc::now();

        let revoked = repository.revoke(token_id, now + TimeDelta::minutes(5)).await;
        assert!(revoked.is_ok());
        assert_eq!(repository.is_revoked(token_id, now).await.ok(), Some(true));
        assert_eq!(
            repository
                .is_revoked(token_id, now + TimeDelta::minutes(5))
                .await
                .ok(),
            Some(false)
        );
        assert_eq!(
            repository.delete_expired(now + TimeDelta::minutes(6)).await.ok(),
            Some(0)
        );
    }

    #[tokio::test]
    async fn revoking_again_never_shortens_retention() {
        let repository = InMemoryRevocationRepository::new();
        let token_id = TokenId::new();
        let now = Utc::now();

        let first = repository.revoke(token_id, now + TimeDelta::hours(1)).await;
        let second = repository.revoke(token_id, now + TimeDelta::minutes(1)).await;
        assert_eq!(first.ok(), Some(true));
        assert_eq!(second.ok(), Some(false));
        assert_eq!(
            repository
                .is_revoked(token_id, now + TimeDelta::minutes(30))
                .await
                .ok(),
            Some(true)
        );
    }

    #[tokio::test]
    async fn delete_expired_counts_removed_entries() {
        let repository = InMemoryRevocationRepository::new();
        let now = Utc::now();
        let lapsed = repository
            .revoke(TokenId::new(), now - TimeDelta::seconds(1))
            .await;
        let live = repository.revoke(TokenId::new(), now + TimeDelta::hours(1)).await;
        assert!(lapsed.is_ok() && live.is_ok());

        assert_eq!(repository.delete_expired(now).await.ok(), Some(1));
    }
}
