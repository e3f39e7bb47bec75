use bastion_core::{AppError, AppResult};
use bastion_domain::{
    Action, BranchId, Capability, Department, Module, PermissionCheckRequest, PermissionDecision,
    Position, TargetScope,
};
use serde::{Deserialize, Serialize};

/// Scope of the targeted resource.
#[derive(Debug, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum TargetScopeRequest {
    Organization,
    Branch { branch_id: String },
}

impl TargetScopeRequest {
    fn into_domain(self) -> AppResult<TargetScope> {
        match self {
            Self::Organization => Ok(TargetScope::Organization),
            Self::Branch { branch_id } => BranchId::new(branch_id).map(TargetScope::Branch),
        }
    }
}

/// Incoming payload for a permission check against the bearer token.
///
/// Carries either `module` and `action` (with an optional `target`) or
/// `department` and `position`. Unknown keys are rejected.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckPermissionRequest {
    #[serde(default)]
    pub module: Option<Module>,
    #[serde(default)]
    pub action: Option<Action>,
    #[serde(default)]
    pub target: Option<TargetScopeRequest>,
    #[serde(default)]
    pub department: Option<Department>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub entitled_branches: Vec<String>,
}

impl CheckPermissionRequest {
    pub fn into_domain(self) -> AppResult<PermissionCheckRequest> {
        let capability = match (self.module, self.action, self.department, self.position) {
            (Some(module), Some(action), None, None) => Capability::Module {
                module,
                action,
                target: self.target.map(TargetScopeRequest::into_domain).transpose()?,
            },
            (None, None, Some(department), Some(position)) if self.target.is_none() => {
                Capability::Department {
                    department,
                    position,
                }
            }
            _ => {
                return Err(AppError::Validation(
                    "expected either module and action or department and position".to_owned(),
                ));
            }
        };

        let entitled_branches = self
            .entitled_branches
            .into_iter()
            .map(BranchId::new)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PermissionCheckRequest::new(capability).with_entitled_branches(entitled_branches))
    }
}

/// Result of a permission check.
#[derive(Debug, Serialize)]
pub struct PermissionCheckResponse {
    pub granted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl From<PermissionDecision> for PermissionCheckResponse {
    fn from(value: PermissionDecision) -> Self {
        Self {
            granted: value.is_granted(),
            reason: value.denial_reason().map(|reason| reason.as_str()),
        }
    }
}
