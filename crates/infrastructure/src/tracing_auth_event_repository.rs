use async_trait::async_trait;
use tracing::info;

use bastion_application::{AuthEvent, AuthEventRepository};
use bastion_core::AppResult;

/// Writes auth events to the log instead of a table.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuthEventRepository;

#[async_trait]
impl AuthEventRepository for TracingAuthEventRepository {
    async fn append_event(&self, event: AuthEvent) -> AppResult<()> {
        info!(
            target: "bastion::auth_events",
            subject = event.subject.as_ref().map(|subject| subject.as_str()),
            event_type = event.kind.as_str(),
            outcome = event.outcome.as_str(),
            reason = event.outcome.reason(),
            ip_address = event.ip_address.as_deref(),
            user_agent = event.user_agent.as_deref(),
            "auth event"
        );

        Ok(())
    }
}
