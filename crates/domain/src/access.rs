use std::collections::BTreeMap;
use std::str::FromStr;

use bastion_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Functional areas of the protected system gated by view/create/update/delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    /// Asset register.
    Assets,
    /// Branch directory.
    Branches,
    /// Position catalogue.
    Positions,
    /// Dashboard widgets.
    Dashboard,
    /// Document library.
    Documents,
    /// Policy documents.
    Policy,
    /// External service providers.
    ServiceProvider,
    /// Employee records.
    Employee,
}

impl Module {
    /// Returns a stable storage value for this module.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assets => "assets",
            Self::Branches => "branches",
            Self::Positions => "positions",
            Self::Dashboard => "dashboard",
            Self::Documents => "documents",
            Self::Policy => "policy",
            Self::ServiceProvider => "service_provider",
            Self::Employee => "employee",
        }
    }

    /// Returns all known modules.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Module] = &[
            Module::Assets,
            Module::Branches,
            Module::Positions,
            Module::Dashboard,
            Module::Documents,
            Module::Policy,
            Module::ServiceProvider,
            Module::Employee,
        ];

        ALL
    }
}

impl FromStr for Module {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|module| module.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown module '{value}'")))
    }
}

/// Organizational departments with position-gated capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Department {
    /// Maintenance department.
    Maintenance,
    /// Management department.
    Management,
}

impl Department {
    /// Returns a stable storage value for this department.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Maintenance => "maintenance",
            Self::Management => "management",
        }
    }

    /// Returns all known departments.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[Self::Maintenance, Self::Management]
    }
}

impl FromStr for Department {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "maintenance" => Ok(Self::Maintenance),
            "management" => Ok(Self::Management),
            _ => Err(AppError::Validation(format!(
                "unknown department '{value}'"
            ))),
        }
    }
}

/// Named positions a subject may hold inside a department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    /// Head of the department.
    DepartmentLead,
    /// Technician within the department.
    DepartmentTechnician,
}

impl Position {
    /// Returns a stable storage value for this position.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DepartmentLead => "department_lead",
            Self::DepartmentTechnician => "department_technician",
        }
    }
}

impl FromStr for Position {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "department_lead" => Ok(Self::DepartmentLead),
            "department_technician" => Ok(Self::DepartmentTechnician),
            _ => Err(AppError::Validation(format!("unknown position '{value}'"))),
        }
    }
}

/// Breadth at which a module's permissions apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Permissions apply across the whole organization.
    Organization,
    /// Permissions apply only to branches the subject is entitled to.
    Branch,
}

impl Scope {
    /// Returns a stable storage value for this scope.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Branch => "branch",
        }
    }
}

/// Actions gated per module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Read access.
    View,
    /// Create access.
    Create,
    /// Update access.
    Update,
    /// Delete access.
    Delete,
}

impl Action {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "view" => Ok(Self::View),
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(AppError::Validation(format!("unknown action '{value}'"))),
        }
    }
}

/// Independent action flags for one module. Missing flags are `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModulePermissions {
    /// Read access.
    #[serde(default)]
    pub view: bool,
    /// Create access.
    #[serde(default)]
    pub create: bool,
    /// Update access.
    #[serde(default)]
    pub update: bool,
    /// Delete access.
    #[serde(default)]
    pub delete: bool,
}

impl ModulePermissions {
    /// Returns a permission set with every flag cleared.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Returns a copy with the given action granted.
    #[must_use]
    pub fn with(mut self, action: Action) -> Self {
        match action {
            Action::View => self.view = true,
            Action::Create => self.create = true,
            Action::Update => self.update = true,
            Action::Delete => self.delete = true,
        }
        self
    }

    /// Returns whether the action flag is set. Flags never imply each other.
    #[must_use]
    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::View => self.view,
            Action::Create => self.create,
            Action::Update => self.update,
            Action::Delete => self.delete,
        }
    }
}

/// Scope and action flags configured for a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleAccess {
    /// Breadth the flags apply to.
    pub scope: Scope,
    /// Action flags.
    #[serde(default)]
    pub permissions: ModulePermissions,
}

impl ModuleAccess {
    /// Creates a module entry.
    #[must_use]
    pub fn new(scope: Scope, permissions: ModulePermissions) -> Self {
        Self { scope, permissions }
    }

    /// Implicit entry used for modules absent from a configuration.
    #[must_use]
    pub fn denied() -> Self {
        Self::new(Scope::Branch, ModulePermissions::none())
    }
}

/// Positions held inside one department. Missing keys are `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DepartmentPositions {
    /// Holds the lead position.
    #[serde(default)]
    pub department_lead: bool,
    /// Holds the technician position.
    #[serde(default)]
    pub department_technician: bool,
}

impl DepartmentPositions {
    /// Returns a copy with the given position held.
    #[must_use]
    pub fn with(mut self, position: Position) -> Self {
        match position {
            Position::DepartmentLead => self.department_lead = true,
            Position::DepartmentTechnician => self.department_technician = true,
        }
        self
    }

    /// Returns whether the position is held.
    #[must_use]
    pub fn holds(&self, position: Position) -> bool {
        match position {
            Position::DepartmentLead => self.department_lead,
            Position::DepartmentTechnician => self.department_technician,
        }
    }
}

/// Permission document bound to a subject.
///
/// Owned by the external identity/positions store. Unknown module, department,
/// position or flag names are rejected when the document is parsed so a typo
/// can never be silently ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessConfiguration {
    #[serde(default)]
    modules: BTreeMap<Module, ModuleAccess>,
    #[serde(default)]
    departments: BTreeMap<Department, DepartmentPositions>,
}

impl AccessConfiguration {
    /// Returns a configuration that grants nothing.
    #[must_use]
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// Parses and validates a stored JSON document.
    pub fn from_document(document: &serde_json::Value) -> AppResult<Self> {
        if !document.is_object() {
            return Err(AppError::Validation(
                "access configuration must be a JSON object".to_owned(),
            ));
        }

        Self::deserialize(document).map_err(|error| {
            AppError::Validation(format!("invalid access configuration: {error}"))
        })
    }

    /// Returns a copy with the module entry replaced.
    #[must_use]
    pub fn with_module(mut self, module: Module, access: ModuleAccess) -> Self {
        self.modules.insert(module, access);
        self
    }

    /// Returns a copy with the department entry replaced.
    #[must_use]
    pub fn with_department(
        mut self,
        department: Department,
        positions: DepartmentPositions,
    ) -> Self {
        self.departments.insert(department, positions);
        self
    }

    /// Returns the explicitly configured module entry.
    #[must_use]
    pub fn module_access(&self, module: Module) -> Option<&ModuleAccess> {
        self.modules.get(&module)
    }

    /// Returns the module entry, treating an absent module as all-false.
    #[must_use]
    pub fn effective_module_access(&self, module: Module) -> ModuleAccess {
        self.module_access(module)
            .copied()
            .unwrap_or_else(ModuleAccess::denied)
    }

    /// Returns the explicitly configured department entry.
    #[must_use]
    pub fn department_positions(&self, department: Department) -> Option<&DepartmentPositions> {
        self.departments.get(&department)
    }

    /// Returns a copy where every known module is present.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut normalized = self.clone();
        for module in Module::all() {
            normalized
                .modules
                .entry(*module)
                .or_insert_with(ModuleAccess::denied);
        }
        normalized
    }

    /// Returns a SHA-256 hex digest of the effective grants.
    ///
    /// Absent modules and explicit all-false modules hash identically.
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();

        for module in Module::all() {
            let access = self.effective_module_access(*module);
            hasher.update(
                format!(
                    "m:{}:{}:{}{}{}{};",
                    module.as_str(),
                    access.scope.as_str(),
                    u8::from(access.permissions.view),
                    u8::from(access.permissions.create),
                    u8::from(access.permissions.update),
                    u8::from(access.permissions.delete),
                )
                .as_bytes(),
            );
        }

        for department in Department::all() {
            let positions = self
                .department_positions(*department)
                .copied()
                .unwrap_or_default();
            hasher.update(
                format!(
                    "d:{}:{}{};",
                    department.as_str(),
                    u8::from(positions.department_lead),
                    u8::from(positions.department_technician),
                )
                .as_bytes(),
            );
        }

        hex::encode(hasher.finalize())
    }
}
