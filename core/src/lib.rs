pub mod access;
pub mod config;
pub mod db;
pub mod entitlement;
pub mod error;
pub mod ids;
pub mod membership;
pub mod notification;
pub mod user;
pub mod workspace;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{CoreError, CoreResult};
