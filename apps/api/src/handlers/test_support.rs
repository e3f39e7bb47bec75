use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ConnectInfo;

use bastion_application::{SystemClock, TokenPolicy};
use bastion_core::SubjectId;
use bastion_domain::AttemptPolicy;
use bastion_infrastructure::InMemoryAccessConfigurationRepository;

use crate::api_config::SecuritySettings;
use crate::api_services::{Adapters, assemble_app_state};
use crate::state::AppState;

const SECRET: &str = "test-signing-secret-0123456789abcdef";

pub(crate) fn peer() -> ConnectInfo<SocketAddr> {
    ConnectInfo(SocketAddr::from(([10, 1, 2, 3], 52_000)))
}

pub(crate) fn subject(value: &str) -> SubjectId {
    SubjectId::new(value).unwrap_or_else(|_| unreachable!())
}

/// Maintenance lead allowed to view and update assets in their branches.
pub(crate) fn maintenance_lead_document() -> serde_json::Value {
    serde_json::json!({
        "modules": {
            "assets": { "scope": "branch", "permissions": { "view": true, "update": true } }
        },
        "departments": {
            "maintenance": { "department_lead": true }
        }
    })
}

pub(crate) fn in_memory_state(documents: Vec<(&str, serde_json::Value)>) -> AppState {
    let access_configurations = InMemoryAccessConfigurationRepository::with_documents(
        documents
            .into_iter()
            .map(|(subject_id, document)| (subject(subject_id), document)),
    );
    let adapters =
        Adapters::in_memory().with_access_configurations(Arc::new(access_configurations));
    let security = SecuritySettings {
        signing_secret: SECRET.to_owned(),
        token_policy: TokenPolicy::default(),
        attempt_policy: AttemptPolicy::default(),
    };

    assemble_app_state(adapters, &security, Arc::new(SystemClock), None, None)
        .unwrap_or_else(|_| unreachable!())
}
