//! Permission evaluation over an [`AccessConfiguration`].
//!
//! Evaluation is a pure, total function: no I/O, no shared state and no
//! allocation, so it can run concurrently from any number of request tasks.
//!
//! Module and department checks are independent primitives. A caller needing
//! "maintenance lead may update assets in this branch" composes both checks
//! with a logical AND, for example through [`evaluate_all`].

use std::fmt::{Display, Formatter};

use bastion_core::{AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::{AccessConfiguration, Action, Department, Module, Position, Scope};

/// Identifier of a branch, supplied by the caller's resource lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchId(String);

impl BranchId {
    /// Creates a branch identifier, rejecting empty values.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = NonEmptyString::new(value)?;
        Ok(Self(value.into()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for BranchId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

impl TryFrom<String> for BranchId {
    type Error = bastion_core::AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BranchId> for String {
    fn from(value: BranchId) -> Self {
        value.0
    }
}

/// Scope of the resource a request targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetScope {
    /// Organization-wide resource or listing.
    Organization,
    /// Resource owned by one branch.
    Branch(BranchId),
}

/// A single-axis capability being requested.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Module action, optionally against a target resource scope.
    ///
    /// Without a target only organization-scoped access is granted; branch
    /// scope always needs a branch the caller is entitled to.
    Module {
        /// Module being accessed.
        module: Module,
        /// Requested action.
        action: Action,
        /// Scope of the targeted resource.
        target: Option<TargetScope>,
    },
    /// Department position requirement.
    Department {
        /// Department being checked.
        department: Department,
        /// Position required inside the department.
        position: Position,
    },
}

/// Why a capability was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// Module missing or the action flag is not set.
    ModuleDenied,
    /// Configured scope does not cover the targeted resource.
    ScopeMismatch,
    /// Department missing or the position is not held.
    DepartmentDenied,
}

impl DenialReason {
    /// Returns a stable transport code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ModuleDenied => "module_denied",
            Self::ScopeMismatch => "scope_mismatch",
            Self::DepartmentDenied => "department_denied",
        }
    }
}

/// Outcome of a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    /// Capability granted.
    Granted,
    /// Capability denied.
    Denied(DenialReason),
}

impl PermissionDecision {
    /// Returns whether the capability was granted.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }

    /// Returns the denial reason, if denied.
    #[must_use]
    pub fn denial_reason(&self) -> Option<DenialReason> {
        match self {
            Self::Granted => None,
            Self::Denied(reason) => Some(*reason),
        }
    }
}

/// Capability request together with the caller-supplied branch entitlements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionCheckRequest {
    /// Requested capability.
    pub capability: Capability,
    /// Branches the subject is entitled to, as resolved by the caller.
    pub entitled_branches: Vec<BranchId>,
}

impl PermissionCheckRequest {
    /// Creates a request without branch entitlements.
    #[must_use]
    pub fn new(capability: Capability) -> Self {
        Self {
            capability,
            entitled_branches: Vec::new(),
        }
    }

    /// Returns a copy carrying the given branch entitlements.
    #[must_use]
    pub fn with_entitled_branches(mut self, entitled_branches: Vec<BranchId>) -> Self {
        self.entitled_branches = entitled_branches;
        self
    }

    /// Evaluates the request against a configuration.
    #[must_use]
    pub fn evaluate(&self, config: &AccessConfiguration) -> PermissionDecision {
        evaluate(config, &self.capability, &self.entitled_branches)
    }
}

/// Returns whether the request is granted.
#[must_use]
pub fn check(config: &AccessConfiguration, request: &PermissionCheckRequest) -> bool {
    request.evaluate(config).is_granted()
}

/// Evaluates one capability.
#[must_use]
pub fn evaluate(
    config: &AccessConfiguration,
    capability: &Capability,
    entitled_branches: &[BranchId],
) -> PermissionDecision {
    match capability {
        Capability::Department {
            department,
            position,
        } => match config.department_positions(*department) {
            Some(positions) if positions.holds(*position) => PermissionDecision::Granted,
            _ => PermissionDecision::Denied(DenialReason::DepartmentDenied),
        },
        Capability::Module {
            module,
            action,
            target,
        } => {
            let Some(access) = config.module_access(*module) else {
                return PermissionDecision::Denied(DenialReason::ModuleDenied);
            };

            if !access.permissions.allows(*action) {
                return PermissionDecision::Denied(DenialReason::ModuleDenied);
            }

            match (access.scope, target) {
                (Scope::Organization, _) => PermissionDecision::Granted,
                (Scope::Branch, None | Some(TargetScope::Organization)) => {
                    PermissionDecision::Denied(DenialReason::ScopeMismatch)
                }
                (Scope::Branch, Some(TargetScope::Branch(branch_id))) => {
                    if entitled_branches.contains(branch_id) {
                        PermissionDecision::Granted
                    } else {
                        PermissionDecision::Denied(DenialReason::ScopeMismatch)
                    }
                }
            }
        }
    }
}

/// Evaluates every capability and returns the first denial, if any.
#[must_use]
pub fn evaluate_all(
    config: &AccessConfiguration,
    capabilities: &[Capability],
    entitled_branches: &[BranchId],
) -> PermissionDecision {
    capabilities
        .iter()
        .map(|capability| evaluate(config, capability, entitled_branches))
        .find(|decision| !decision.is_granted())
        .unwrap_or(PermissionDecision::Granted)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{
        BranchId, Capability, DenialReason, PermissionCheckRequest, PermissionDecision,
        TargetScope, check, evaluate, evaluate_all,
    };
    use crate::{
        AccessConfiguration, Action, Department, DepartmentPositions, Module, ModuleAccess,
        ModulePermissions, Position, Scope,
    };

    fn branch(value: &str) -> BranchId {
        BranchId::new(value).unwrap_or_else(|_| unreachable!())
    }

    fn module_request(module: Module, action: Action, target: Option<TargetScope>) -> Capability {
        Capability::Module {
            module,
            action,
            target,
        }
    }

    fn scenario_config() -> AccessConfiguration {
        AccessConfiguration::deny_all()
            .with_department(
                Department::Maintenance,
                DepartmentPositions::default().with(Position::DepartmentLead),
            )
            .with_module(
                Module::Assets,
                ModuleAccess::new(
                    Scope::Branch,
                    ModulePermissions::none()
                        .with(Action::View)
                        .with(Action::Update),
                ),
            )
    }

    #[test]
    fn maintenance_lead_scenario() {
        let config = scenario_config();

        let lead = PermissionCheckRequest::new(Capability::Department {
            department: Department::Maintenance,
            position: Position::DepartmentLead,
        });
        assert!(check(&config, &lead));

        let delete =
            PermissionCheckRequest::new(module_request(Module::Assets, Action::Delete, None));
        assert!(!check(&config, &delete));

        let update_branch_42 = PermissionCheckRequest::new(module_request(
            Module::Assets,
            Action::Update,
            Some(TargetScope::Branch(branch("branch-42"))),
        ));
        assert!(check(
            &config,
            &update_branch_42
                .clone()
                .with_entitled_branches(vec![branch("branch-42")])
        ));
        assert!(!check(
            &config,
            &update_branch_42.with_entitled_branches(vec![branch("branch-7")])
        ));
    }

    #[test]
    fn organization_scope_grants_view_at_any_branch_and_never_create() {
        let config = AccessConfiguration::deny_all().with_module(
            Module::Documents,
            ModuleAccess::new(
                Scope::Organization,
                ModulePermissions::none().with(Action::View),
            ),
        );

        for target in [
            None,
            Some(TargetScope::Organization),
            Some(TargetScope::Branch(branch("branch-1"))),
            Some(TargetScope::Branch(branch("branch-99"))),
        ] {
            let view = module_request(Module::Documents, Action::View, target.clone());
            assert!(evaluate(&config, &view, &[]).is_granted());

            let create = module_request(Module::Documents, Action::Create, target);
            assert_eq!(
                evaluate(&config, &create, &[]),
                PermissionDecision::Denied(DenialReason::ModuleDenied)
            );
        }
    }

    #[test]
    fn branch_scope_denies_other_branches_and_organization_targets() {
        let config = AccessConfiguration::deny_all().with_module(
            Module::Branches,
            ModuleAccess::new(Scope::Branch, ModulePermissions::none().with(Action::View)),
        );
        let entitled = [branch("branch-7")];
        let view_at = |target: TargetScope| {
            evaluate(
                &config,
                &module_request(Module::Branches, Action::View, Some(target)),
                &entitled,
            )
        };

        assert_eq!(
            view_at(TargetScope::Branch(branch("branch-8"))),
            PermissionDecision::Denied(DenialReason::ScopeMismatch)
        );
        assert_eq!(
            view_at(TargetScope::Organization),
            PermissionDecision::Denied(DenialReason::ScopeMismatch)
        );
        assert!(view_at(TargetScope::Branch(branch("branch-7"))).is_granted());
    }

    #[test]
    fn branch_scope_without_target_is_a_scope_mismatch() {
        let config = scenario_config();
        let update = module_request(Module::Assets, Action::Update, None);

        for entitled in [Vec::new(), vec![branch("branch-42")]] {
            assert_eq!(
                evaluate(&config, &update, &entitled),
                PermissionDecision::Denied(DenialReason::ScopeMismatch)
            );
        }
    }

    #[test]
    fn present_module_with_all_false_flags_denies_everything() {
        let config = AccessConfiguration::deny_all().with_module(
            Module::Policy,
            ModuleAccess::new(Scope::Organization, ModulePermissions::none()),
        );

        for action in [Action::View, Action::Create, Action::Update, Action::Delete] {
            assert_eq!(
                evaluate(&config, &module_request(Module::Policy, action, None), &[]),
                PermissionDecision::Denied(DenialReason::ModuleDenied)
            );
        }
    }

    #[test]
    fn update_does_not_imply_view() {
        let config = AccessConfiguration::deny_all().with_module(
            Module::Employee,
            ModuleAccess::new(
                Scope::Organization,
                ModulePermissions::none().with(Action::Update),
            ),
        );

        let update = module_request(Module::Employee, Action::Update, None);
        let view = module_request(Module::Employee, Action::View, None);
        assert!(evaluate(&config, &update, &[]).is_granted());
        assert!(!evaluate(&config, &view, &[]).is_granted());
    }

    #[test]
    fn department_with_missing_position_key_denies_both_positions() {
        let document = serde_json::json!({
            "departments": { "maintenance": { "department_lead": false } }
        });
        let config = AccessConfiguration::from_document(&document).unwrap_or_default();

        for position in [Position::DepartmentLead, Position::DepartmentTechnician] {
            assert_eq!(
                evaluate(
                    &config,
                    &Capability::Department {
                        department: Department::Maintenance,
                        position,
                    },
                    &[],
                ),
                PermissionDecision::Denied(DenialReason::DepartmentDenied)
            );
        }
    }

    #[test]
    fn absent_department_is_denied() {
        let config = scenario_config();
        let decision = evaluate(
            &config,
            &Capability::Department {
                department: Department::Management,
                position: Position::DepartmentLead,
            },
            &[],
        );

        assert_eq!(decision.denial_reason(), Some(DenialReason::DepartmentDenied));
    }

    #[test]
    fn evaluate_all_requires_every_capability() {
        let config = scenario_config();
        let entitled = [branch("branch-42")];
        let update_asset = module_request(
            Module::Assets,
            Action::Update,
            Some(TargetScope::Branch(branch("branch-42"))),
        );

        let as_lead = [
            Capability::Department {
                department: Department::Maintenance,
                position: Position::DepartmentLead,
            },
            update_asset.clone(),
        ];
        assert!(evaluate_all(&config, &as_lead, &entitled).is_granted());

        let as_technician = [
            Capability::Department {
                department: Department::Maintenance,
                position: Position::DepartmentTechnician,
            },
            update_asset,
        ];
        assert_eq!(
            evaluate_all(&config, &as_technician, &entitled),
            PermissionDecision::Denied(DenialReason::DepartmentDenied)
        );
    }

    fn any_action() -> impl Strategy<Value = Action> {
        prop_oneof![
            Just(Action::View),
            Just(Action::Create),
            Just(Action::Update),
            Just(Action::Delete),
        ]
    }

    fn any_module() -> impl Strategy<Value = Module> {
        proptest::sample::select(Module::all().to_vec())
    }

    proptest! {
        #[test]
        fn deny_all_configuration_never_grants(
            module in any_module(),
            action in any_action(),
            branch_suffix in 0_u32..100,
        ) {
            let config = AccessConfiguration::deny_all();
            let target = Some(TargetScope::Branch(branch(&format!("branch-{branch_suffix}"))));
            let request = module_request(module, action, target);
            prop_assert!(!evaluate(&config, &request, &[]).is_granted());
        }

        #[test]
        fn branch_scope_needs_a_branch_target(
            module in any_module(),
            action in any_action(),
        ) {
            let config = AccessConfiguration::deny_all().with_module(
                module,
                ModuleAccess::new(Scope::Branch, ModulePermissions::none().with(action)),
            );
            for target in [None, Some(TargetScope::Organization)] {
                let request = module_request(module, action, target);
                let decision = evaluate(&config, &request, &[branch("branch-1")]);
                prop_assert_eq!(decision, PermissionDecision::Denied(DenialReason::ScopeMismatch));
            }
        }

        #[test]
        fn granting_one_action_never_grants_another(
            module in any_module(),
            granted in any_action(),
            requested in any_action(),
        ) {
            let config = AccessConfiguration::deny_all().with_module(
                module,
                ModuleAccess::new(Scope::Organization, ModulePermissions::none().with(granted)),
            );
            let decision = evaluate(&config, &module_request(module, requested, None), &[]);
            prop_assert_eq!(decision.is_granted(), granted == requested);
        }
    }
}
