//! Owner/editor/read-only authorization shared by every subsystem that
//! mutates workspace-scoped state.

use tracing::debug;

use crate::{
    db::{Database, workspace_repo::WorkspaceRepositoryRef},
    error::{CoreError, CoreResult},
    ids::UserId,
    membership::MemberRole,
    workspace::WorkspaceRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    Read,
    Write,
}

/// Reads are unrestricted. Writes need an active membership and either the
/// creator identity or the editor role.
pub fn authorize(
    acting: &UserId,
    workspace: &WorkspaceRecord,
    acting_role: Option<MemberRole>,
    level: AccessLevel,
) -> bool {
    match level {
        AccessLevel::Read => true,
        AccessLevel::Write => match acting_role {
            None => false,
            Some(role) => workspace.creator_id == *acting || role == MemberRole::Editor,
        },
    }
}

#[derive(Clone)]
pub struct AccessControl {
    workspace_repo: WorkspaceRepositoryRef,
}

impl AccessControl {
    pub fn new(database: &Database) -> Self {
        Self {
            workspace_repo: database.repositories().workspace_repo(),
        }
    }

    pub async fn permits(
        &self,
        acting: &UserId,
        workspace: &WorkspaceRecord,
        level: AccessLevel,
    ) -> CoreResult<bool> {
        if level == AccessLevel::Read {
            return Ok(true);
        }

        let role = self
            .workspace_repo
            .find_member_by_user(&workspace.id, acting)
            .await?
            .map(|member| member.role);

        Ok(authorize(acting, workspace, role, level))
    }

    pub async fn ensure(
        &self,
        acting: &UserId,
        workspace: &WorkspaceRecord,
        level: AccessLevel,
    ) -> CoreResult<()> {
        if self.permits(acting, workspace, level).await? {
            Ok(())
        } else {
            debug!(
                workspace_id = %workspace.id,
                user_id = %acting,
                ?level,
                "workspace access denied"
            );
            Err(CoreError::Forbidden(workspace.id.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ids::WorkspaceId,
        test_support::{seed_user, setup_database},
        user::SubscriptionTier,
        workspace::{NewWorkspace, WorkspacePlan, WorkspaceStore},
    };

    fn workspace_created_by(creator: &str) -> WorkspaceRecord {
        WorkspaceRecord {
            id: WorkspaceId::from("ws"),
            name: "Acme".into(),
            contact_email: "team@acme.test".into(),
            plan: WorkspacePlan::Basic,
            member_limit: 5,
            member_count: 1,
            creator_id: UserId::from(creator),
            created_at: 0,
        }
    }

    #[test]
    fn read_is_always_permitted() {
        let workspace = workspace_created_by("owner");
        assert!(authorize(
            &UserId::from("stranger"),
            &workspace,
            None,
            AccessLevel::Read
        ));
    }

    #[test]
    fn write_requires_membership_even_for_creator() {
        let workspace = workspace_created_by("owner");
        let owner = UserId::from("owner");

        assert!(!authorize(&owner, &workspace, None, AccessLevel::Write));
        assert!(authorize(
            &owner,
            &workspace,
            Some(MemberRole::Member),
            AccessLevel::Write
        ));
    }

    #[test]
    fn editors_write_and_plain_members_do_not() {
        let workspace = workspace_created_by("owner");
        let other = UserId::from("other");

        assert!(authorize(
            &other,
            &workspace,
            Some(MemberRole::Editor),
            AccessLevel::Write
        ));
        assert!(!authorize(
            &other,
            &workspace,
            Some(MemberRole::Member),
            AccessLevel::Write
        ));
    }

    #[tokio::test]
    async fn ensure_denies_non_members_with_forbidden() {
        let (_temp_dir, database) = setup_database().await;
        let owner = seed_user(&database, "owner@example.com", SubscriptionTier::Pro).await;
        let stranger = seed_user(&database, "stranger@example.com", SubscriptionTier::Pro).await;
        let workspace = WorkspaceStore::new(&database)
            .create(
                &owner.id,
                NewWorkspace {
                    name: "Acme",
                    contact_email: "team@acme.test",
                    member_limit: 3,
                    plan: "basic",
                },
            )
            .await
            .unwrap();

        let access = AccessControl::new(&database);
        access
            .ensure(&owner.id, &workspace, AccessLevel::Write)
            .await
            .expect("creator may write");
        access
            .ensure(&stranger.id, &workspace, AccessLevel::Read)
            .await
            .expect("anyone may read");

        let err = access
            .ensure(&stranger.id, &workspace, AccessLevel::Write)
            .await
            .expect_err("stranger may not write");
        assert!(matches!(err, CoreError::Forbidden(id) if id == workspace.id));
    }
}
