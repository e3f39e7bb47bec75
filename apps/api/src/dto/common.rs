use serde::Serialize;

/// Status of one backing store.
#[derive(Debug, Serialize)]
pub struct HealthDependencyStatus {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Health response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ready: bool,
    pub postgres: HealthDependencyStatus,
    pub redis: HealthDependencyStatus,
}

/// Acknowledgement for operations without a result body.
#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}
