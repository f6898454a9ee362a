pub mod connection;
pub mod notification_center;
pub mod user_repo;
pub mod workspace_repo;
