use std::{fmt, str::FromStr};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    access::{AccessControl, AccessLevel},
    db::{
        Database,
        errors::is_unique_violation,
        workspace_repo::{
            CreateWorkspaceOutcome, CreateWorkspaceParams, UpdateWorkspaceParams,
            WorkspaceRepositoryRef,
        },
    },
    error::{CoreError, CoreResult},
    ids::{UserId, WorkspaceId},
    membership::MemberRole,
    user::{UserStore, normalize_email},
};

/// Billing plan of a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspacePlan {
    #[default]
    Basic,
    Premium,
    Enterprise,
}

impl WorkspacePlan {
    pub const ALL: [WorkspacePlan; 3] = [Self::Basic, Self::Premium, Self::Enterprise];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Premium => "premium",
            Self::Enterprise => "enterprise",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|plan| plan.as_str() == normalized)
    }
}

impl fmt::Display for WorkspacePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkspacePlan {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            CoreError::validation(format!(
                "workspace plan '{}' is not available. Choose between basic, premium, and enterprise",
                s.trim()
            ))
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceRecord {
    pub id: WorkspaceId,
    pub name: String,
    pub contact_email: String,
    pub plan: WorkspacePlan,
    pub member_limit: i64,
    pub member_count: i64,
    pub creator_id: UserId,
    pub created_at: i64,
}

impl WorkspaceRecord {
    pub fn is_full(&self) -> bool {
        self.member_count >= self.member_limit
    }
}

/// A workspace seen from one of its members.
#[derive(Debug, Clone, Serialize)]
pub struct UserWorkspaceMembership {
    pub workspace: WorkspaceRecord,
    pub role: MemberRole,
    pub joined_at: i64,
}

pub struct NewWorkspace<'a> {
    pub name: &'a str,
    pub contact_email: &'a str,
    pub member_limit: i64,
    pub plan: &'a str,
}

/// Field patch for [`WorkspaceStore::update`]. Member count and creator are
/// not patchable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkspacePatch {
    pub name: Option<String>,
    pub contact_email: Option<String>,
    pub member_limit: Option<i64>,
    pub plan: Option<String>,
}

impl WorkspacePatch {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.contact_email.is_none()
            && self.member_limit.is_none()
            && self.plan.is_none()
    }
}

#[derive(Clone)]
pub struct WorkspaceStore {
    workspace_repo: WorkspaceRepositoryRef,
    users: UserStore,
    access: AccessControl,
}

impl WorkspaceStore {
    pub fn new(database: &Database) -> Self {
        Self {
            workspace_repo: database.repositories().workspace_repo(),
            users: UserStore::new(database),
            access: AccessControl::new(database),
        }
    }

    /// Create a workspace together with its creator's editor membership.
    pub async fn create(
        &self,
        creator_id: &UserId,
        new_workspace: NewWorkspace<'_>,
    ) -> CoreResult<WorkspaceRecord> {
        let name = required_name(new_workspace.name)?;
        let contact_email = normalize_email(new_workspace.contact_email)?;
        let plan: WorkspacePlan = new_workspace.plan.parse()?;
        let member_limit = validate_member_limit(new_workspace.member_limit, 1)?;

        let creator = self.users.require(creator_id).await?;
        self.ensure_contact_email_available(&contact_email, None)
            .await?;

        let params = CreateWorkspaceParams {
            id: WorkspaceId::generate(),
            name,
            contact_email,
            plan,
            member_limit,
            creator_id: creator.id.clone(),
            creator_tier: creator.subscription_tier,
            created_at: Utc::now().timestamp(),
        };

        let outcome = match self.workspace_repo.create_workspace(params).await {
            Ok(outcome) => outcome,
            Err(err) if is_unique_violation(&err) => return Err(contact_email_in_use()),
            Err(err) => return Err(err.into()),
        };

        match outcome {
            CreateWorkspaceOutcome::Created(workspace) => {
                info!(
                    workspace_id = %workspace.id,
                    creator_id = %workspace.creator_id,
                    plan = %workspace.plan,
                    member_limit = workspace.member_limit,
                    "created workspace"
                );
                Ok(workspace)
            }
            CreateWorkspaceOutcome::QuotaExceeded(denial) => {
                info!(user_id = %creator.id, %denial, "workspace creation denied by entitlement");
                Err(CoreError::QuotaExceeded(denial))
            }
        }
    }

    pub async fn get(&self, id: &WorkspaceId) -> CoreResult<WorkspaceRecord> {
        self.workspace_repo
            .fetch_workspace(id)
            .await?
            .ok_or_else(|| CoreError::WorkspaceNotFound(id.clone()))
    }

    pub async fn list_for_user(&self, user_id: &UserId) -> CoreResult<Vec<UserWorkspaceMembership>> {
        Ok(self.workspace_repo.list_memberships_for_user(user_id).await?)
    }

    pub async fn update(
        &self,
        acting: &UserId,
        id: &WorkspaceId,
        patch: WorkspacePatch,
    ) -> CoreResult<WorkspaceRecord> {
        let workspace = self.get(id).await?;
        self.access
            .ensure(acting, &workspace, AccessLevel::Write)
            .await?;

        if patch.is_empty() {
            return Ok(workspace);
        }

        let name = patch.name.as_deref().map(required_name).transpose()?;
        let contact_email = patch
            .contact_email
            .as_deref()
            .map(normalize_email)
            .transpose()?;
        let plan = patch
            .plan
            .as_deref()
            .map(str::parse::<WorkspacePlan>)
            .transpose()?;
        let member_limit = patch
            .member_limit
            .map(|limit| validate_member_limit(limit, workspace.member_count.max(1)))
            .transpose()?;

        if let Some(email) = contact_email.as_deref() {
            self.ensure_contact_email_available(email, Some(id)).await?;
        }

        self.apply_update(UpdateWorkspaceParams {
            id: id.clone(),
            name,
            contact_email,
            plan,
            member_limit,
        })
        .await
    }

    pub async fn update_plan(
        &self,
        acting: &UserId,
        id: &WorkspaceId,
        plan: &str,
    ) -> CoreResult<WorkspaceRecord> {
        let plan: WorkspacePlan = plan.parse()?;
        let workspace = self.get(id).await?;
        self.access
            .ensure(acting, &workspace, AccessLevel::Write)
            .await?;

        if workspace.plan == plan {
            return Ok(workspace);
        }

        let updated = self
            .apply_update(UpdateWorkspaceParams {
                plan: Some(plan),
                ..UpdateWorkspaceParams::new(id.clone())
            })
            .await?;
        info!(workspace_id = %id, plan = %plan, "updated workspace plan");
        Ok(updated)
    }

    /// Delete the workspace; its memberships go with it.
    pub async fn delete(&self, acting: &UserId, id: &WorkspaceId) -> CoreResult<()> {
        let workspace = self.get(id).await?;
        self.access
            .ensure(acting, &workspace, AccessLevel::Write)
            .await?;

        if !self.workspace_repo.delete_workspace(id).await? {
            return Err(CoreError::WorkspaceNotFound(id.clone()));
        }

        info!(workspace_id = %id, user_id = %acting, "deleted workspace");
        Ok(())
    }

    async fn apply_update(&self, params: UpdateWorkspaceParams) -> CoreResult<WorkspaceRecord> {
        let id = params.id.clone();
        let lowered_limit = params.member_limit;
        let updated = match self.workspace_repo.update_workspace(params).await {
            Ok(updated) => updated,
            Err(err) if is_unique_violation(&err) => return Err(contact_email_in_use()),
            Err(err) => return Err(err.into()),
        };

        let current = self.get(&id).await?;
        if !updated {
            // The row exists, so the guarded limit lost a race with an add.
            warn!(workspace_id = %id, ?lowered_limit, "member limit update rejected");
            return Err(CoreError::validation(format!(
                "member limit cannot be lower than the current member count ({})",
                current.member_count
            )));
        }

        Ok(current)
    }

    async fn ensure_contact_email_available(
        &self,
        email: &str,
        exclude: Option<&WorkspaceId>,
    ) -> CoreResult<()> {
        let existing = self
            .workspace_repo
            .fetch_workspace_by_contact_email(email)
            .await?;
        match existing {
            Some(workspace) if Some(&workspace.id) != exclude => Err(contact_email_in_use()),
            _ => Ok(()),
        }
    }
}

fn contact_email_in_use() -> CoreError {
    CoreError::Conflict("this email is in use by another workspace".to_owned())
}

fn required_name(raw: &str) -> CoreResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(CoreError::validation("workspace name must not be empty"))
    } else {
        Ok(trimmed.to_owned())
    }
}

fn validate_member_limit(limit: i64, minimum: i64) -> CoreResult<i64> {
    if limit < minimum {
        Err(CoreError::validation(format!(
            "member limit must be at least {minimum}"
        )))
    } else {
        Ok(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_support::{create_workspace, membership_store, seed_user, setup_database},
        user::SubscriptionTier,
    };

    #[test]
    fn plans_and_tiers_are_separate_vocabularies() {
        assert_eq!(WorkspacePlan::parse("Premium"), Some(WorkspacePlan::Premium));
        assert_eq!(WorkspacePlan::parse("starter"), None);
        assert!(matches!(
            "gold".parse::<WorkspacePlan>(),
            Err(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn create_adds_creator_as_editor() {
        let (_temp_dir, database) = setup_database().await;
        let owner = seed_user(&database, "owner@example.com", SubscriptionTier::Pro).await;
        let workspace = create_workspace(&database, &owner.id, "team@acme.test", 2).await;

        assert_eq!(workspace.member_count, 1);
        assert_eq!(workspace.creator_id, owner.id);

        let members = membership_store(&database)
            .list_members(&workspace.id)
            .await
            .unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_id, owner.id);
        assert_eq!(members[0].role, MemberRole::Editor);
    }

    #[tokio::test]
    async fn create_validates_input() {
        let (_temp_dir, database) = setup_database().await;
        let owner = seed_user(&database, "owner@example.com", SubscriptionTier::Pro).await;
        let store = WorkspaceStore::new(&database);

        for new_workspace in [
            NewWorkspace {
                name: "Acme",
                contact_email: "team@acme.test",
                member_limit: 2,
                plan: "gold",
            },
            NewWorkspace {
                name: "  ",
                contact_email: "team@acme.test",
                member_limit: 2,
                plan: "basic",
            },
            NewWorkspace {
                name: "Acme",
                contact_email: "not-an-email",
                member_limit: 2,
                plan: "basic",
            },
            NewWorkspace {
                name: "Acme",
                contact_email: "team@acme.test",
                member_limit: 0,
                plan: "basic",
            },
        ] {
            let err = store.create(&owner.id, new_workspace).await.unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)), "got {err:?}");
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_contact_email() {
        let (_temp_dir, database) = setup_database().await;
        let owner = seed_user(&database, "owner@example.com", SubscriptionTier::Ultimate).await;
        create_workspace(&database, &owner.id, "team@acme.test", 2).await;

        let err = WorkspaceStore::new(&database)
            .create(
                &owner.id,
                NewWorkspace {
                    name: "Acme Two",
                    contact_email: "TEAM@acme.test",
                    member_limit: 2,
                    plan: "premium",
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn starter_creator_cannot_create_second_workspace() {
        let (_temp_dir, database) = setup_database().await;
        let owner = seed_user(&database, "owner@example.com", SubscriptionTier::Starter).await;
        create_workspace(&database, &owner.id, "one@acme.test", 2).await;

        let err = WorkspaceStore::new(&database)
            .create(
                &owner.id,
                NewWorkspace {
                    name: "Second",
                    contact_email: "two@acme.test",
                    member_limit: 2,
                    plan: "basic",
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::QuotaExceeded(denial) if denial.cap == 1));

        let listed = WorkspaceStore::new(&database)
            .list_for_user(&owner.id)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1, "denied creation must leave no workspace behind");
    }

    #[tokio::test]
    async fn create_for_unknown_creator_is_not_found() {
        let (_temp_dir, database) = setup_database().await;
        let err = WorkspaceStore::new(&database)
            .create(
                &UserId::from("ghost"),
                NewWorkspace {
                    name: "Acme",
                    contact_email: "team@acme.test",
                    member_limit: 2,
                    plan: "basic",
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn get_is_idempotent_and_reports_missing() {
        let (_temp_dir, database) = setup_database().await;
        let owner = seed_user(&database, "owner@example.com", SubscriptionTier::Pro).await;
        let workspace = create_workspace(&database, &owner.id, "team@acme.test", 2).await;
        let store = WorkspaceStore::new(&database);

        let first = store.get(&workspace.id).await.unwrap();
        let second = store.get(&workspace.id).await.unwrap();
        assert_eq!(first.member_count, second.member_count);
        assert_eq!(first.name, second.name);

        let err = store.get(&WorkspaceId::from("missing")).await.unwrap_err();
        assert!(matches!(err, CoreError::WorkspaceNotFound(_)));
    }

    #[tokio::test]
    async fn update_patches_fields_and_guards_member_limit() {
        let (_temp_dir, database) = setup_database().await;
        let owner = seed_user(&database, "owner@example.com", SubscriptionTier::Pro).await;
        let workspace = create_workspace(&database, &owner.id, "team@acme.test", 3).await;
        let store = WorkspaceStore::new(&database);

        let updated = store
            .update(
                &owner.id,
                &workspace.id,
                WorkspacePatch {
                    name: Some("Renamed".into()),
                    member_limit: Some(5),
                    ..WorkspacePatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.member_limit, 5);
        assert_eq!(updated.member_count, 1);
        assert_eq!(updated.creator_id, owner.id);

        let err = store
            .update(
                &owner.id,
                &workspace.id,
                WorkspacePatch {
                    member_limit: Some(0),
                    ..WorkspacePatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn update_rejects_contact_email_of_another_workspace() {
        let (_temp_dir, database) = setup_database().await;
        let owner = seed_user(&database, "owner@example.com", SubscriptionTier::Ultimate).await;
        create_workspace(&database, &owner.id, "taken@acme.test", 2).await;
        let workspace = create_workspace(&database, &owner.id, "mine@acme.test", 2).await;

        let err = WorkspaceStore::new(&database)
            .update(
                &owner.id,
                &workspace.id,
                WorkspacePatch {
                    contact_email: Some("taken@acme.test".into()),
                    ..WorkspacePatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn non_members_cannot_update_or_delete() {
        let (_temp_dir, database) = setup_database().await;
        let owner = seed_user(&database, "owner@example.com", SubscriptionTier::Pro).await;
        let stranger = seed_user(&database, "stranger@example.com", SubscriptionTier::Pro).await;
        let workspace = create_workspace(&database, &owner.id, "team@acme.test", 2).await;
        let store = WorkspaceStore::new(&database);

        let err = store
            .update_plan(&stranger.id, &workspace.id, "enterprise")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        let err = store.delete(&stranger.id, &workspace.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }

    #[tokio::test]
    async fn update_plan_validates_and_persists() {
        let (_temp_dir, database) = setup_database().await;
        let owner = seed_user(&database, "owner@example.com", SubscriptionTier::Pro).await;
        let workspace = create_workspace(&database, &owner.id, "team@acme.test", 2).await;
        let store = WorkspaceStore::new(&database);

        let err = store
            .update_plan(&owner.id, &workspace.id, "ultimate")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let updated = store
            .update_plan(&owner.id, &workspace.id, "enterprise")
            .await
            .unwrap();
        assert_eq!(updated.plan, WorkspacePlan::Enterprise);
        assert_eq!(
            store.get(&workspace.id).await.unwrap().plan,
            WorkspacePlan::Enterprise
        );
    }

    #[tokio::test]
    async fn delete_cascades_memberships() {
        let (_temp_dir, database) = setup_database().await;
        let owner = seed_user(&database, "owner@example.com", SubscriptionTier::Starter).await;
        let workspace = create_workspace(&database, &owner.id, "team@acme.test", 2).await;
        let store = WorkspaceStore::new(&database);

        store.delete(&owner.id, &workspace.id).await.unwrap();

        let err = store.get(&workspace.id).await.unwrap_err();
        assert!(matches!(err, CoreError::WorkspaceNotFound(_)));
        assert!(store.list_for_user(&owner.id).await.unwrap().is_empty());

        // The starter quota is free again once the membership is gone.
        create_workspace(&database, &owner.id, "again@acme.test", 2).await;

        let err = store.delete(&owner.id, &workspace.id).await.unwrap_err();
        assert!(matches!(err, CoreError::WorkspaceNotFound(_)));
    }
}
