use std::env;

use crewspace_core::{
    db::Database,
    membership::MembershipStore,
    notification::{NotificationEmitter, NotificationInbox},
    user::UserStore,
    workspace::WorkspaceStore,
};
use serde::Serialize;

#[derive(Clone)]
pub struct AppState {
    pub user_store: UserStore,
    pub workspace_store: WorkspaceStore,
    pub membership_store: MembershipStore,
    pub notification_inbox: NotificationInbox,
    pub metadata: ServerMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerMetadata {
    pub version: String,
    pub message: String,
}

impl ServerMetadata {
    pub fn load() -> Self {
        let version = env!("CARGO_PKG_VERSION").to_string();
        let message = env::var("CREWSPACE_SERVER_MESSAGE")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| format!("Crewspace {version} Server"));

        Self { version, message }
    }
}

pub fn build_state(database: &Database) -> AppState {
    let notification_center = database.repositories().notification_center();

    AppState {
        user_store: UserStore::new(database),
        workspace_store: WorkspaceStore::new(database),
        membership_store: MembershipStore::new(
            database,
            NotificationEmitter::new(notification_center.clone()),
        ),
        notification_inbox: NotificationInbox::new(notification_center),
        metadata: ServerMetadata::load(),
    }
}
