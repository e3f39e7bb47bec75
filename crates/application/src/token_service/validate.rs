use super::*;

impl TokenService {
    /// Validates a presented token.
    ///
    /// Rejections are values, not errors. `Err` is reserved for storage
    /// failures.
    pub async fn validate(
        &self,
        token: &str,
        caller: &CallerContext,
    ) -> AppResult<TokenValidation> {
        match self.inspect(token, caller, TimeDelta::zero()).await? {
            Inspection::Accepted(claims) => {
                self.record(
                    AuthEventKind::TokenValidated,
                    Some(&claims.sub),
                    AuthEventOutcome::Success,
                    caller,
                )
                .await?;
                Ok(TokenValidation::Valid(ValidatedToken::from(claims)))
            }
            Inspection::Rejected { rejection, subject } => {
                debug!(reason = %rejection, "token rejected");
                self.record(
                    AuthEventKind::TokenValidated,
                    subject.as_ref(),
                    AuthEventOutcome::Rejected(rejection),
                    caller,
                )
                .await?;
                Ok(TokenValidation::Rejected(rejection))
            }
        }
    }
}
