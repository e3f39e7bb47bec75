use bastion_domain::AttemptCounter;

use super::*;

impl TokenService {
    /// Issues a token carrying the subject's current access configuration.
    ///
    /// Call only after the external credential check succeeded. Resets the
    /// subject's attempt counter. A blocked subject is refused without signing.
    pub async fn issue(
        &self,
        subject: &SubjectId,
        caller: &CallerContext,
    ) -> AppResult<IssuedToken> {
        let key = AttemptKey::subject(subject);
        if self.attempt_guard.is_blocked(&key).await? {
            self.record(
                AuthEventKind::TokenIssued,
                Some(subject),
                AuthEventOutcome::Rejected(TokenRejection::Blocked),
                caller,
            )
            .await?;
            return Err(AppError::RateLimited(format!(
                "subject '{subject}' is temporarily blocked"
            )));
        }

        let issued = self.sign(subject.clone(), self.clock.now()).await?;
        self.attempt_guard.record_success(&key).await?;
        self.record(
            AuthEventKind::TokenIssued,
            Some(subject),
            AuthEventOutcome::Success,
            caller,
        )
        .await?;

        info!(
            subject = %subject,
            token_id = %issued.token_id,
            expires_at = %issued.expires_at,
            "token issued"
        );
        Ok(issued)
    }

    /// Records a failed credential check reported by the identity store.
    ///
    /// Shares the subject's counter with token validation, so repeated bad
    /// passwords block token use and the other way round.
    pub async fn record_login_failure(
        &self,
        subject: &SubjectId,
        caller: &CallerContext,
    ) -> AppResult<AttemptCounter> {
        let counter = self
            .attempt_guard
            .record_failure(&AttemptKey::subject(subject))
            .await?;
        self.record(
            AuthEventKind::LoginFailed,
            Some(subject),
            AuthEventOutcome::InvalidCredentials,
            caller,
        )
        .await?;

        Ok(counter)
    }
}
