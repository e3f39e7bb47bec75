mod database;
mod janitor;
mod redis;
mod state_builder;

pub use database::connect_and_migrate;
pub use janitor::spawn_janitor;
pub use state_builder::build_app_state;
#[cfg(test)]
pub use state_builder::{Adapters, assemble_app_state};
