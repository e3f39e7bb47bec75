pub mod guard;
pub mod health;
pub mod permissions;
pub mod token;

#[cfg(test)]
mod test_support;
