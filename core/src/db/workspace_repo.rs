use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    entitlement::EntitlementDenial,
    ids::{MemberId, UserId, WorkspaceId},
    membership::{MemberRole, MemberWithUser, MembershipRecord},
    user::SubscriptionTier,
    workspace::{UserWorkspaceMembership, WorkspacePlan, WorkspaceRecord},
};

#[derive(Debug, Clone)]
pub struct CreateWorkspaceParams {
    pub id: WorkspaceId,
    pub name: String,
    pub contact_email: String,
    pub plan: WorkspacePlan,
    pub member_limit: i64,
    pub creator_id: UserId,
    pub creator_tier: SubscriptionTier,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub enum CreateWorkspaceOutcome {
    Created(WorkspaceRecord),
    QuotaExceeded(EntitlementDenial),
}

#[derive(Debug, Clone)]
pub struct UpdateWorkspaceParams {
    pub id: WorkspaceId,
    pub name: Option<String>,
    pub contact_email: Option<String>,
    pub plan: Option<WorkspacePlan>,
    /// Applied only while the current member count still fits.
    pub member_limit: Option<i64>,
}

impl UpdateWorkspaceParams {
    pub fn new(id: WorkspaceId) -> Self {
        Self {
            id,
            name: None,
            contact_email: None,
            plan: None,
            member_limit: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AddMemberParams {
    pub id: MemberId,
    pub workspace_id: WorkspaceId,
    pub user_id: UserId,
    pub user_tier: SubscriptionTier,
    pub role: MemberRole,
    pub joined_at: i64,
}

#[derive(Debug, Clone)]
pub enum AddMemberOutcome {
    Added {
        member: MembershipRecord,
        workspace: WorkspaceRecord,
    },
    WorkspaceMissing,
    QuotaExceeded(EntitlementDenial),
    WorkspaceFull {
        member_limit: i64,
    },
    AlreadyMember,
}

#[derive(Debug, Clone)]
pub enum RemoveMemberOutcome {
    Removed {
        member: MembershipRecord,
        workspace: WorkspaceRecord,
    },
    WorkspaceMissing,
    MemberMissing,
}

/// Workspace rows and the membership rows they own.
///
/// Every method that inserts or deletes a membership keeps
/// `workspaces.member_count` equal to the number of membership rows within the
/// same transaction.
#[async_trait]
pub trait WorkspaceRepository: Send + Sync {
    /// Insert the workspace and the creator's editor membership atomically,
    /// subject to the creator's entitlement.
    async fn create_workspace(&self, params: CreateWorkspaceParams)
    -> Result<CreateWorkspaceOutcome>;

    async fn fetch_workspace(&self, id: &WorkspaceId) -> Result<Option<WorkspaceRecord>>;

    async fn fetch_workspace_by_contact_email(
        &self,
        contact_email: &str,
    ) -> Result<Option<WorkspaceRecord>>;

    /// `false` when the workspace is missing or the new member limit would
    /// fall below the current member count.
    async fn update_workspace(&self, params: UpdateWorkspaceParams) -> Result<bool>;

    async fn delete_workspace(&self, id: &WorkspaceId) -> Result<bool>;

    async fn list_memberships_for_user(&self, user_id: &UserId)
    -> Result<Vec<UserWorkspaceMembership>>;

    async fn add_member(&self, params: AddMemberParams) -> Result<AddMemberOutcome>;

    async fn remove_member(
        &self,
        workspace_id: &WorkspaceId,
        member_id: &MemberId,
    ) -> Result<RemoveMemberOutcome>;

    async fn update_member_role(
        &self,
        workspace_id: &WorkspaceId,
        member_id: &MemberId,
        role: MemberRole,
    ) -> Result<Option<MembershipRecord>>;

    async fn find_member(
        &self,
        workspace_id: &WorkspaceId,
        member_id: &MemberId,
    ) -> Result<Option<MembershipRecord>>;

    async fn find_member_by_user(
        &self,
        workspace_id: &WorkspaceId,
        user_id: &UserId,
    ) -> Result<Option<MembershipRecord>>;

    async fn list_members(&self, workspace_id: &WorkspaceId) -> Result<Vec<MembershipRecord>>;

    async fn list_members_with_users(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<MemberWithUser>>;
}

pub type WorkspaceRepositoryRef = Arc<dyn WorkspaceRepository>;
