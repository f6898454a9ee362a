use tempfile::TempDir;

use crate::{
    config::AppConfig,
    db::Database,
    ids::UserId,
    membership::MembershipStore,
    notification::NotificationEmitter,
    user::{NewUser, SubscriptionTier, UserRecord, UserStore},
    workspace::{NewWorkspace, WorkspaceRecord, WorkspaceStore},
};

pub(crate) async fn setup_database() -> (TempDir, Database) {
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
    (temp_dir, database)
}

pub(crate) async fn seed_user(
    database: &Database,
    email: &str,
    tier: SubscriptionTier,
) -> UserRecord {
    let local = email.split('@').next().unwrap_or(email);
    UserStore::new(database)
        .register(NewUser {
            email,
            first_name: local,
            last_name: "Tester",
            subscription_tier: Some(tier),
        })
        .await
        .expect("seed user")
}

pub(crate) async fn create_workspace(
    database: &Database,
    creator_id: &UserId,
    contact_email: &str,
    member_limit: i64,
) -> WorkspaceRecord {
    WorkspaceStore::new(database)
        .create(
            creator_id,
            NewWorkspace {
                name: "Acme",
                contact_email,
                member_limit,
                plan: "basic",
            },
        )
        .await
        .expect("create workspace")
}

pub(crate) fn membership_store(database: &Database) -> MembershipStore {
    MembershipStore::new(
        database,
        NotificationEmitter::new(database.repositories().notification_center()),
    )
}
