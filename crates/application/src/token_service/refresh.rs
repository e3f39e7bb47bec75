use super::*;

impl TokenService {
    /// Exchanges a valid token for a new one.
    ///
    /// A token that expired less than the grace window ago is still accepted.
    /// The new token carries the subject's current access configuration, not
    /// the presented snapshot.
    pub async fn refresh(
        &self,
        token: &str,
        caller: &CallerContext,
    ) -> AppResult<RefreshOutcome> {
        let claims = match self.inspect(token, caller, self.policy.refresh_grace).await? {
            Inspection::Accepted(claims) => claims,
            Inspection::Rejected { rejection, subject } => {
                debug!(reason = %rejection, "refresh rejected");
                self.record(
                    AuthEventKind::TokenRefreshed,
                    subject.as_ref(),
                    AuthEventOutcome::Rejected(rejection),
                    caller,
                )
                .await?;
                return Ok(RefreshOutcome::Rejected(rejection));
            }
        };

        let now = self.clock.now();
        if self.policy.revoke_on_refresh {
            // Covers the grace window so the old token cannot be refreshed twice.
            let first_use = self
                .revocations
                .revoke(claims.jti, claims.expires_at() + self.policy.refresh_grace)
                .await?;
            if !first_use {
                debug!(token_id = %claims.jti, "token already consumed by a concurrent refresh");
                self.record(
                    AuthEventKind::TokenRefreshed,
                    Some(&claims.sub),
                    AuthEventOutcome::Rejected(TokenRejection::Revoked),
                    caller,
                )
                .await?;
                return Ok(RefreshOutcome::Rejected(TokenRejection::Revoked));
            }
        }

        let issued = self.sign(claims.sub.clone(), now).await?;
        self.record(
            AuthEventKind::TokenRefreshed,
            Some(&claims.sub),
            AuthEventOutcome::Success,
            caller,
        )
        .await?;

        info!(
            subject = %claims.sub,
            previous_token_id = %claims.jti,
            token_id = %issued.token_id,
            "token refreshed"
        );
        Ok(RefreshOutcome::Refreshed(issued))
    }
}
