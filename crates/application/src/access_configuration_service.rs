use std::sync::Arc;

use tracing::warn;

use bastion_core::{AppResult, SubjectId};
use bastion_domain::AccessConfiguration;

use crate::AccessConfigurationRepository;

/// Resolves the current access configuration for a subject.
///
/// A missing or malformed document resolves to the deny-all configuration.
/// Storage failures are propagated.
#[derive(Clone)]
pub struct AccessConfigurationService {
    repository: Arc<dyn AccessConfigurationRepository>,
}

impl AccessConfigurationService {
    /// Creates a service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AccessConfigurationRepository>) -> Self {
        Self { repository }
    }

    /// Returns the subject's current configuration.
    pub async fn resolve(&self, subject: &SubjectId) -> AppResult<AccessConfiguration> {
        let Some(document) = self.repository.find_document(subject).await? else {
            warn!(subject = %subject, "no access configuration stored, denying all");
            return Ok(AccessConfiguration::deny_all());
        };

        Ok(
            AccessConfiguration::from_document(&document).unwrap_or_else(|error| {
                warn!(
                    subject = %subject,
                    error = %error,
                    "malformed access configuration, denying all"
                );
                AccessConfiguration::deny_all()
            }),
        )
    }
}
