use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use bastion_application::AccessConfigurationRepository;
use bastion_core::{AppResult, SubjectId};

/// In-memory access document store for local runs and tests.
#[derive(Default)]
pub struct InMemoryAccessConfigurationRepository {
    documents: RwLock<HashMap<SubjectId, serde_json::Value>>,
}

impl InMemoryAccessConfigurationRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with documents.
    #[must_use]
    pub fn with_documents(
        documents: impl IntoIterator<Item = (SubjectId, serde_json::Value)>,
    ) -> Self {
        Self {
            documents: RwLock::new(documents.into_iter().collect()),
        }
    }

    /// Stores or replaces a subject's document.
    pub async fn put(&self, subject: SubjectId, document: serde_json::Value) {
        self.documents.write().await.insert(subject, document);
    }
}

#[async_trait]
impl AccessConfigurationRepository for InMemoryAccessConfigurationRepository {
    async fn find_document(&self, subject: &SubjectId) -> AppResult<Option<serde_json::Value>> {
        Ok(self.documents.read().await.get(subject).cloned())
    }
}
