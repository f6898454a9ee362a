pub mod auth;
pub mod error;
pub mod handlers;
pub mod observability;
pub mod router;
pub mod state;
pub mod types;

pub use error::AppError;
pub use state::{AppState, ServerMetadata, build_state};

#[cfg(test)]
pub(crate) mod test_support;
