use std::{fmt, str::FromStr};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    access::{AccessControl, AccessLevel},
    db::{
        Database,
        workspace_repo::{AddMemberOutcome, AddMemberParams, RemoveMemberOutcome, WorkspaceRepositoryRef},
    },
    error::{CoreError, CoreResult},
    ids::{MemberId, UserId, WorkspaceId},
    notification::{
        NotificationEmitter, member_added_message, member_removed_message, role_updated_message,
    },
    user::UserStore,
    workspace::WorkspaceRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Editor,
    #[default]
    Member,
}

impl MemberRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Editor => "editor",
            Self::Member => "member",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "editor" => Some(Self::Editor),
            "member" => Some(Self::Member),
            _ => None,
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            CoreError::validation(format!(
                "unknown role '{}'. Choose between editor and member",
                s.trim()
            ))
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MembershipRecord {
    pub id: MemberId,
    pub workspace_id: WorkspaceId,
    pub user_id: UserId,
    pub role: MemberRole,
    pub joined_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberWithUser {
    #[serde(flatten)]
    pub member: MembershipRecord,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Clone)]
pub struct MembershipStore {
    workspace_repo: WorkspaceRepositoryRef,
    users: UserStore,
    access: AccessControl,
    notifications: NotificationEmitter,
}

impl MembershipStore {
    pub fn new(database: &Database, notifications: NotificationEmitter) -> Self {
        Self {
            workspace_repo: database.repositories().workspace_repo(),
            users: UserStore::new(database),
            access: AccessControl::new(database),
            notifications,
        }
    }

    /// Add `user_id` to the workspace. Quota, capacity and duplicate checks
    /// run inside the insert transaction.
    pub async fn add_member(
        &self,
        acting: &UserId,
        workspace_id: &WorkspaceId,
        user_id: &UserId,
        role: MemberRole,
    ) -> CoreResult<MembershipRecord> {
        let workspace = self.writable_workspace(acting, workspace_id).await?;
        let target = self.users.require(user_id).await?;

        let params = AddMemberParams {
            id: MemberId::generate(),
            workspace_id: workspace.id.clone(),
            user_id: target.id.clone(),
            user_tier: target.subscription_tier,
            role,
            joined_at: Utc::now().timestamp(),
        };

        let (member, workspace) = match self.workspace_repo.add_member(params).await? {
            AddMemberOutcome::Added { member, workspace } => (member, workspace),
            AddMemberOutcome::WorkspaceMissing => {
                return Err(CoreError::WorkspaceNotFound(workspace_id.clone()));
            }
            AddMemberOutcome::QuotaExceeded(denial) => {
                info!(user_id = %target.id, %denial, "membership denied by entitlement");
                return Err(CoreError::QuotaExceeded(denial));
            }
            AddMemberOutcome::WorkspaceFull { member_limit } => {
                return Err(CoreError::WorkspaceFull {
                    workspace_id: workspace_id.clone(),
                    member_limit,
                });
            }
            AddMemberOutcome::AlreadyMember => {
                return Err(CoreError::AlreadyMember {
                    workspace_id: workspace_id.clone(),
                    user_id: target.id,
                });
            }
        };

        info!(
            workspace_id = %workspace.id,
            user_id = %member.user_id,
            member_id = %member.id,
            role = %member.role,
            member_count = workspace.member_count,
            "added workspace member"
        );

        self.notifications
            .emit(acting, &member.user_id, member_added_message(&workspace.name))
            .await;

        Ok(member)
    }

    pub async fn remove_member(
        &self,
        acting: &UserId,
        workspace_id: &WorkspaceId,
        member_id: &MemberId,
    ) -> CoreResult<()> {
        self.writable_workspace(acting, workspace_id).await?;
        let member = self.find_member(workspace_id, member_id).await?;
        if member.user_id == *acting {
            return Err(CoreError::SelfRemoval);
        }

        let (member, workspace) = match self
            .workspace_repo
            .remove_member(workspace_id, member_id)
            .await?
        {
            RemoveMemberOutcome::Removed { member, workspace } => (member, workspace),
            RemoveMemberOutcome::WorkspaceMissing => {
                return Err(CoreError::WorkspaceNotFound(workspace_id.clone()));
            }
            RemoveMemberOutcome::MemberMissing => {
                return Err(member_not_found(workspace_id, member_id));
            }
        };

        info!(
            workspace_id = %workspace.id,
            user_id = %member.user_id,
            member_id = %member.id,
            member_count = workspace.member_count,
            "removed workspace member"
        );

        self.notifications
            .emit(acting, &member.user_id, member_removed_message(&workspace.name))
            .await;

        Ok(())
    }

    pub async fn update_role(
        &self,
        acting: &UserId,
        workspace_id: &WorkspaceId,
        member_id: &MemberId,
        role: MemberRole,
    ) -> CoreResult<MembershipRecord> {
        let workspace = self.writable_workspace(acting, workspace_id).await?;
        let member = self.find_member(workspace_id, member_id).await?;
        if member.user_id == *acting {
            return Err(CoreError::SelfRoleChange);
        }

        let updated = self
            .workspace_repo
            .update_member_role(workspace_id, member_id, role)
            .await?
            .ok_or_else(|| member_not_found(workspace_id, member_id))?;

        info!(
            workspace_id = %workspace_id,
            member_id = %member_id,
            user_id = %updated.user_id,
            role = %updated.role,
            "updated workspace member role"
        );

        self.notifications
            .emit(
                acting,
                &updated.user_id,
                role_updated_message(&workspace.name, updated.role.as_str()),
            )
            .await;

        Ok(updated)
    }

    /// Members in join order.
    pub async fn list_members(&self, workspace_id: &WorkspaceId) -> CoreResult<Vec<MembershipRecord>> {
        self.require_workspace(workspace_id).await?;
        Ok(self.workspace_repo.list_members(workspace_id).await?)
    }

    pub async fn list_members_with_users(
        &self,
        workspace_id: &WorkspaceId,
    ) -> CoreResult<Vec<MemberWithUser>> {
        self.require_workspace(workspace_id).await?;
        Ok(self
            .workspace_repo
            .list_members_with_users(workspace_id)
            .await?)
    }

    pub async fn find_member(
        &self,
        workspace_id: &WorkspaceId,
        member_id: &MemberId,
    ) -> CoreResult<MembershipRecord> {
        self.workspace_repo
            .find_member(workspace_id, member_id)
            .await?
            .ok_or_else(|| member_not_found(workspace_id, member_id))
    }

    /// Membership of `user_id` in the workspace, if any. Subsystems scoped to
    /// a workspace use this to check that a candidate belongs to it.
    pub async fn member_for_user(
        &self,
        workspace_id: &WorkspaceId,
        user_id: &UserId,
    ) -> CoreResult<Option<MembershipRecord>> {
        Ok(self
            .workspace_repo
            .find_member_by_user(workspace_id, user_id)
            .await?)
    }

    async fn require_workspace(&self, workspace_id: &WorkspaceId) -> CoreResult<WorkspaceRecord> {
        self.workspace_repo
            .fetch_workspace(workspace_id)
            .await?
            .ok_or_else(|| CoreError::WorkspaceNotFound(workspace_id.clone()))
    }

    async fn writable_workspace(
        &self,
        acting: &UserId,
        workspace_id: &WorkspaceId,
    ) -> CoreResult<WorkspaceRecord> {
        let workspace = self.require_workspace(workspace_id).await?;
        self.access
            .ensure(acting, &workspace, AccessLevel::Write)
            .await?;
        Ok(workspace)
    }
}

fn member_not_found(workspace_id: &WorkspaceId, member_id: &MemberId) -> CoreError {
    CoreError::MemberNotFound {
        workspace_id: workspace_id.clone(),
        member_id: member_id.clone(),
    }
}
