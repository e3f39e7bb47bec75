//! Application services and ports.

#![forbid(unsafe_code)]

mod access_configuration_service;
mod attempt_guard_service;
mod auth_event_service;
mod clock;
mod janitor_service;
mod token_ports;
mod token_service;

#[cfg(test)]
mod test_support;

pub use access_configuration_service::AccessConfigurationService;
pub use attempt_guard_service::{AttemptCounterRepository, AttemptGuardService, GuardStats};
pub use auth_event_service::{
    AuthEvent, AuthEventKind, AuthEventOutcome, AuthEventRepository, AuthEventService,
};
pub use clock::{Clock, SystemClock};
pub use janitor_service::{JanitorReport, JanitorService};
pub use token_ports::{
    AccessConfigurationRepository, RevocationRepository, TokenCodec, TokenDecodeError,
};
pub use token_service::{
    CallerContext, RefreshOutcome, RevocationTarget, TokenPolicy, TokenService, TokenValidation,
    ValidatedToken,
};
