//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod access;
mod attempt;
mod permission;
mod token;

pub use access::{
    AccessConfiguration, Action, Department, DepartmentPositions, Module, ModuleAccess,
    ModulePermissions, Position, Scope,
};
pub use attempt::{AttemptCounter, AttemptKey, AttemptPolicy, AttemptState};
pub use permission::{
    BranchId, Capability, DenialReason, PermissionCheckRequest, PermissionDecision, TargetScope,
    check, evaluate, evaluate_all,
};
pub use token::{IssuedToken, TokenClaims, TokenId, TokenRejection};
