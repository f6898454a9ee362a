// Request and response types for REST API handlers

use chrono::{DateTime, Utc};
use crewspace_core::{
    ids::{MemberId, NotificationId, UserId, WorkspaceId},
    membership::{MemberRole, MemberWithUser, MembershipRecord},
    notification::NotificationRecord,
    user::{SubscriptionTier, UserRecord},
    workspace::{UserWorkspaceMembership, WorkspacePatch, WorkspacePlan, WorkspaceRecord},
};
use serde::{Deserialize, Serialize};

// ========== Request Types ==========

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateUserRequest {
    pub(crate) email: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    #[serde(default)]
    pub(crate) subscription_tier: Option<String>,
}

#[derive(Deserialize, Default)]
pub(crate) struct UserSearchQuery {
    #[serde(default)]
    pub(crate) search: Option<String>,
    #[serde(default)]
    pub(crate) offset: Option<i64>,
    #[serde(default)]
    pub(crate) limit: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateSubscriptionRequest {
    pub(crate) subscription_tier: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateWorkspaceRequest {
    pub(crate) name: String,
    pub(crate) contact_email: String,
    pub(crate) member_limit: i64,
    #[serde(default)]
    pub(crate) plan: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateWorkspaceRequest {
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) contact_email: Option<String>,
    #[serde(default)]
    pub(crate) member_limit: Option<i64>,
    #[serde(default)]
    pub(crate) plan: Option<String>,
}

impl From<UpdateWorkspaceRequest> for WorkspacePatch {
    fn from(request: UpdateWorkspaceRequest) -> Self {
        WorkspacePatch {
            name: request.name,
            contact_email: request.contact_email,
            member_limit: request.member_limit,
            plan: request.plan,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct UpdatePlanRequest {
    pub(crate) plan: String,
}

#[derive(Deserialize, Default)]
pub(crate) struct AddMemberRequest {
    #[serde(default)]
    pub(crate) role: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct UpdateRoleRequest {
    pub(crate) role: String,
}

#[derive(Deserialize, Default)]
pub(crate) struct PaginationQuery {
    #[serde(default)]
    pub(crate) offset: Option<i64>,
    #[serde(default)]
    pub(crate) limit: Option<i64>,
}

// ========== Response Types ==========

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserResponse {
    pub(crate) id: UserId,
    pub(crate) email: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) display_name: String,
    pub(crate) subscription_tier: SubscriptionTier,
}

impl From<UserRecord> for UserResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            display_name: user.display_name(),
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            subscription_tier: user.subscription_tier,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WorkspaceResponse {
    pub(crate) id: WorkspaceId,
    pub(crate) name: String,
    pub(crate) contact_email: String,
    pub(crate) plan: WorkspacePlan,
    pub(crate) member_limit: i64,
    pub(crate) member_count: i64,
    pub(crate) creator_id: UserId,
    pub(crate) created_at: i64,
}

impl From<WorkspaceRecord> for WorkspaceResponse {
    fn from(workspace: WorkspaceRecord) -> Self {
        Self {
            id: workspace.id,
            name: workspace.name,
            contact_email: workspace.contact_email,
            plan: workspace.plan,
            member_limit: workspace.member_limit,
            member_count: workspace.member_count,
            creator_id: workspace.creator_id,
            created_at: workspace.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserWorkspaceResponse {
    #[serde(flatten)]
    pub(crate) workspace: WorkspaceResponse,
    pub(crate) role: MemberRole,
    pub(crate) joined_at: i64,
}

impl From<UserWorkspaceMembership> for UserWorkspaceResponse {
    fn from(membership: UserWorkspaceMembership) -> Self {
        Self {
            workspace: membership.workspace.into(),
            role: membership.role,
            joined_at: membership.joined_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MemberResponse {
    pub(crate) id: MemberId,
    pub(crate) workspace_id: WorkspaceId,
    pub(crate) user_id: UserId,
    pub(crate) role: MemberRole,
    pub(crate) joined_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<String>,
}

impl From<MembershipRecord> for MemberResponse {
    fn from(member: MembershipRecord) -> Self {
        Self {
            id: member.id,
            workspace_id: member.workspace_id,
            user_id: member.user_id,
            role: member.role,
            joined_at: member.joined_at,
            email: None,
            name: None,
        }
    }
}

impl From<MemberWithUser> for MemberResponse {
    fn from(detail: MemberWithUser) -> Self {
        let name = format!("{} {}", detail.first_name, detail.last_name)
            .trim()
            .to_owned();
        Self {
            email: Some(detail.email),
            name: Some(name),
            ..MemberResponse::from(detail.member)
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NotificationResponse {
    pub(crate) id: NotificationId,
    pub(crate) sender_id: UserId,
    pub(crate) message: String,
    pub(crate) read: bool,
    pub(crate) created_at: DateTime<Utc>,
}

impl From<NotificationRecord> for NotificationResponse {
    fn from(record: NotificationRecord) -> Self {
        Self {
            id: record.id,
            sender_id: record.sender_id,
            message: record.message,
            read: record.read,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NotificationListResponse {
    pub(crate) unread_count: i64,
    pub(crate) notifications: Vec<NotificationResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MarkAllReadResponse {
    pub(crate) updated: u64,
}
