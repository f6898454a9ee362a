use axum::http::{HeaderMap, HeaderValue};
use crewspace_core::{
    config::AppConfig,
    db::Database,
    ids::UserId,
    user::{NewUser, SubscriptionTier, UserRecord},
    workspace::{NewWorkspace, WorkspaceRecord},
};
use tempfile::TempDir;

use crate::{
    auth::USER_ID_HEADER,
    state::{AppState, build_state},
};

pub(crate) async fn setup_state() -> (TempDir, Database, AppState) {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let config = AppConfig {
        database_path: temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .into_owned(),
        ..AppConfig::default()
    };

    let database = Database::connect(&config).await.expect("connect database");
    let state = build_state(&database);
    (temp_dir, database, state)
}

/// Registers a user whose first name is the email's local part.
pub(crate) async fn seed_user(state: &AppState, email: &str, tier: &str) -> UserRecord {
    let tier: SubscriptionTier = tier.parse().expect("known tier");
    let first_name = email.split('@').next().unwrap_or(email);
    state
        .user_store
        .register(NewUser {
            email,
            first_name,
            last_name: "Tester",
            subscription_tier: Some(tier),
        })
        .await
        .expect("register user")
}

pub(crate) async fn seed_workspace(
    state: &AppState,
    creator_id: &UserId,
    contact_email: &str,
    member_limit: i64,
) -> WorkspaceRecord {
    state
        .workspace_store
        .create(
            creator_id,
            NewWorkspace {
                name: "Engines",
                contact_email,
                member_limit,
                plan: "basic",
            },
        )
        .await
        .expect("create workspace")
}

pub(crate) fn auth_headers(user_id: &UserId) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_ID_HEADER,
        HeaderValue::from_str(user_id.as_str()).expect("header value"),
    );
    headers
}
