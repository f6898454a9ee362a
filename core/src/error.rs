use thiserror::Error;

use crate::{
    entitlement::EntitlementDenial,
    ids::{MemberId, NotificationId, UserId, WorkspaceId},
};

/// Failures surfaced by the workspace and membership operations.
///
/// Every variant except `Storage` is a caller-input or policy violation and is
/// never retried.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("workspace {0} not found")]
    WorkspaceNotFound(WorkspaceId),
    #[error("user {0} not found")]
    UserNotFound(UserId),
    #[error("member {member_id} not found in workspace {workspace_id}")]
    MemberNotFound {
        workspace_id: WorkspaceId,
        member_id: MemberId,
    },
    #[error("notification {0} not found")]
    NotificationNotFound(NotificationId),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    QuotaExceeded(EntitlementDenial),
    #[error("workspace {workspace_id} is full ({member_limit} members allowed)")]
    WorkspaceFull {
        workspace_id: WorkspaceId,
        member_limit: i64,
    },
    #[error("user {user_id} is already a member of workspace {workspace_id}")]
    AlreadyMember {
        workspace_id: WorkspaceId,
        user_id: UserId,
    },
    #[error("you cannot remove yourself from the workspace")]
    SelfRemoval,
    #[error("you cannot edit your own role")]
    SelfRoleChange,
    #[error(
        "you are not authorized to make changes to workspace {0} as you are not its creator or an editor"
    )]
    Forbidden(WorkspaceId),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::WorkspaceNotFound(_)
                | Self::UserNotFound(_)
                | Self::MemberNotFound { .. }
                | Self::NotificationNotFound(_)
        )
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
