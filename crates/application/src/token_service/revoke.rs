use super::*;

impl TokenService {
    /// Adds a token to the revocation set.
    ///
    /// Idempotent. Revoking an unverifiable or already expired token succeeds
    /// without storing anything. A caller-supplied expiry for a bare token id
    /// is capped at one token lifetime from now.
    pub async fn revoke(&self, target: RevocationTarget, caller: &CallerContext) -> AppResult<()> {
        let now = self.clock.now();
        let (token_id, subject, expires_at) = match target {
            RevocationTarget::Token(token) => match self.codec.decode(&token) {
                Ok(claims) => {
                    let expires_at = claims.expires_at();
                    (claims.jti, Some(claims.sub), expires_at)
                }
                Err(error) => {
                    debug!(?error, "ignoring revocation of unverifiable token");
                    return Ok(());
                }
            },
            RevocationTarget::TokenId {
                token_id,
                expires_at,
            } => {
                let longest = now + self.policy.ttl;
                (token_id, None, expires_at.map_or(longest, |at| at.min(longest)))
            }
        };

        let retain_until = expires_at + self.policy.refresh_grace;
        if retain_until <= now {
            debug!(token_id = %token_id, "ignoring revocation of expired token");
            return Ok(());
        }

        let newly_revoked = self.revocations.revoke(token_id, retain_until).await?;
        self.record(
            AuthEventKind::TokenRevoked,
            subject.as_ref(),
            AuthEventOutcome::Success,
            caller,
        )
        .await?;

        info!(token_id = %token_id, newly_revoked, "token revoked");
        Ok(())
    }
}
