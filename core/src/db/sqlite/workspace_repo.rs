use anyhow::{Result, anyhow};
use async_trait::async_trait;
use sqlx::{Pool, QueryBuilder, Row, Sqlite, SqliteConnection, sqlite::SqliteRow};

use crate::{
    db::workspace_repo::{
        AddMemberOutcome, AddMemberParams, CreateWorkspaceOutcome, CreateWorkspaceParams,
        RemoveMemberOutcome, UpdateWorkspaceParams, WorkspaceRepository,
    },
    entitlement::{EntitlementDecision, can_join_workspace},
    ids::{MemberId, UserId, WorkspaceId},
    membership::{MemberRole, MemberWithUser, MembershipRecord},
    workspace::{UserWorkspaceMembership, WorkspacePlan, WorkspaceRecord},
};

const SELECT_WORKSPACE: &str = "SELECT
         id,
         name,
         contact_email,
         plan,
         member_limit,
         member_count,
         creator_id,
         created_at
     FROM workspaces";

const SELECT_MEMBER: &str = "SELECT id, workspace_id, user_id, role, joined_at
     FROM workspace_members";

pub struct SqliteWorkspaceRepository {
    pool: Pool<Sqlite>,
}

impl SqliteWorkspaceRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn map_workspace_row(row: &SqliteRow) -> Result<WorkspaceRecord> {
        let plan: String = row.try_get("plan")?;
        Ok(WorkspaceRecord {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            contact_email: row.try_get("contact_email")?,
            plan: WorkspacePlan::parse(&plan)
                .ok_or_else(|| anyhow!("unknown workspace plan '{plan}' in storage"))?,
            member_limit: row.try_get("member_limit")?,
            member_count: row.try_get("member_count")?,
            creator_id: row.try_get("creator_id")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn map_member_row(row: &SqliteRow) -> Result<MembershipRecord> {
        Ok(MembershipRecord {
            id: row.try_get("id")?,
            workspace_id: row.try_get("workspace_id")?,
            user_id: row.try_get("user_id")?,
            role: parse_role(row.try_get("role")?)?,
            joined_at: row.try_get("joined_at")?,
        })
    }

    /// First write of every membership transaction. Takes the database write
    /// lock before any capacity or quota state is read. Returns `false` when
    /// the workspace does not exist.
    async fn lock_workspace(conn: &mut SqliteConnection, id: &WorkspaceId) -> Result<bool> {
        let result = sqlx::query("UPDATE workspaces SET member_count = member_count WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn memberships_held(conn: &mut SqliteConnection, user_id: &UserId) -> Result<i64> {
        let held: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM workspace_members WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(conn)
                .await?;
        Ok(held)
    }

    async fn refresh_member_count(conn: &mut SqliteConnection, id: &WorkspaceId) -> Result<()> {
        sqlx::query(
            "UPDATE workspaces
             SET member_count = (
                 SELECT COUNT(*) FROM workspace_members WHERE workspace_id = ?
             )
             WHERE id = ?",
        )
        .bind(id)
        .bind(id)
        .execute(conn)
        .await?;
        Ok(())
    }

    async fn fetch_workspace_with(
        conn: &mut SqliteConnection,
        id: &WorkspaceId,
    ) -> Result<Option<WorkspaceRecord>> {
        let row = sqlx::query(&format!("{SELECT_WORKSPACE} WHERE id = ?"))
            .bind(id)
            .fetch_optional(conn)
            .await?;
        row.as_ref().map(Self::map_workspace_row).transpose()
    }

    async fn insert_member(conn: &mut SqliteConnection, member: &MembershipRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO workspace_members (id, workspace_id, user_id, role, joined_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&member.id)
        .bind(&member.workspace_id)
        .bind(&member.user_id)
        .bind(member.role.as_str())
        .bind(member.joined_at)
        .execute(conn)
        .await?;
        Ok(())
    }
}

fn parse_role(raw: String) -> Result<MemberRole> {
    MemberRole::parse(&raw).ok_or_else(|| anyhow!("unknown member role '{raw}' in storage"))
}

#[async_trait]
impl WorkspaceRepository for SqliteWorkspaceRepository {
    async fn create_workspace(
        &self,
        params: CreateWorkspaceParams,
    ) -> Result<CreateWorkspaceOutcome> {
        let CreateWorkspaceParams {
            id,
            name,
            contact_email,
            plan,
            member_limit,
            creator_id,
            creator_tier,
            created_at,
        } = params;

        let mut tx = self.pool.begin().await?;

        // No workspace row exists yet, so the creator's row takes the lock.
        let touched =
            sqlx::query("UPDATE users SET subscription_tier = subscription_tier WHERE id = ?")
                .bind(&creator_id)
                .execute(&mut *tx)
                .await?;
        if touched.rows_affected() == 0 {
            return Err(anyhow!("creator {creator_id} does not exist"));
        }

        let held = Self::memberships_held(&mut tx, &creator_id).await?;
        if let EntitlementDecision::Denied(denial) = can_join_workspace(creator_tier, held) {
            return Ok(CreateWorkspaceOutcome::QuotaExceeded(denial));
        }

        sqlx::query(
            "INSERT INTO workspaces (
                 id,
                 name,
                 contact_email,
                 plan,
                 member_limit,
                 member_count,
                 creator_id,
                 created_at
             ) VALUES (?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(&id)
        .bind(&name)
        .bind(&contact_email)
        .bind(plan.as_str())
        .bind(member_limit)
        .bind(&creator_id)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        let creator_membership = MembershipRecord {
            id: MemberId::generate(),
            workspace_id: id.clone(),
            user_id: creator_id,
            role: MemberRole::Editor,
            joined_at: created_at,
        };
        Self::insert_member(&mut tx, &creator_membership).await?;
        Self::refresh_member_count(&mut tx, &id).await?;

        let workspace = Self::fetch_workspace_with(&mut tx, &id)
            .await?
            .ok_or_else(|| anyhow!("workspace {id} vanished during creation"))?;

        tx.commit().await?;
        Ok(CreateWorkspaceOutcome::Created(workspace))
    }

    async fn fetch_workspace(&self, id: &WorkspaceId) -> Result<Option<WorkspaceRecord>> {
        let row = sqlx::query(&format!("{SELECT_WORKSPACE} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::map_workspace_row).transpose()
    }

    async fn fetch_workspace_by_contact_email(
        &self,
        contact_email: &str,
    ) -> Result<Option<WorkspaceRecord>> {
        let row = sqlx::query(&format!("{SELECT_WORKSPACE} WHERE contact_email = ?"))
            .bind(contact_email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::map_workspace_row).transpose()
    }

    async fn update_workspace(&self, params: UpdateWorkspaceParams) -> Result<bool> {
        let UpdateWorkspaceParams {
            id,
            name,
            contact_email,
            plan,
            member_limit,
        } = params;

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE workspaces SET ");
        let mut has_updates = false;

        if let Some(name) = name {
            builder.push("name = ");
            builder.push_bind(name);
            has_updates = true;
        }
        if let Some(contact_email) = contact_email {
            if has_updates {
                builder.push(", ");
            }
            builder.push("contact_email = ");
            builder.push_bind(contact_email);
            has_updates = true;
        }
        if let Some(plan) = plan {
            if has_updates {
                builder.push(", ");
            }
            builder.push("plan = ");
            builder.push_bind(plan.as_str());
            has_updates = true;
        }
        if let Some(member_limit) = member_limit {
            if has_updates {
                builder.push(", ");
            }
            builder.push("member_limit = ");
            builder.push_bind(member_limit);
            has_updates = true;
        }

        if !has_updates {
            return Ok(false);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        if let Some(member_limit) = member_limit {
            builder.push(" AND member_count <= ");
            builder.push_bind(member_limit);
        }

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_workspace(&self, id: &WorkspaceId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM workspaces WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_memberships_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<UserWorkspaceMembership>> {
        let rows = sqlx::query(
            "SELECT
                 w.id,
                 w.name,
                 w.contact_email,
                 w.plan,
                 w.member_limit,
                 w.member_count,
                 w.creator_id,
                 w.created_at,
                 wm.role,
                 wm.joined_at
             FROM workspace_members wm
             INNER JOIN workspaces w ON w.id = wm.workspace_id
             WHERE wm.user_id = ?
             ORDER BY wm.joined_at ASC, wm.rowid ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<UserWorkspaceMembership> {
                Ok(UserWorkspaceMembership {
                    workspace: Self::map_workspace_row(row)?,
                    role: parse_role(row.try_get("role")?)?,
                    joined_at: row.try_get("joined_at")?,
                })
            })
            .collect()
    }

    async fn add_member(&self, params: AddMemberParams) -> Result<AddMemberOutcome> {
        let AddMemberParams {
            id,
            workspace_id,
            user_id,
            user_tier,
            role,
            joined_at,
        } = params;

        let mut tx = self.pool.begin().await?;
        if !Self::lock_workspace(&mut tx, &workspace_id).await? {
            return Ok(AddMemberOutcome::WorkspaceMissing);
        }

        let held = Self::memberships_held(&mut tx, &user_id).await?;
        if let EntitlementDecision::Denied(denial) = can_join_workspace(user_tier, held) {
            return Ok(AddMemberOutcome::QuotaExceeded(denial));
        }

        let Some(workspace) = Self::fetch_workspace_with(&mut tx, &workspace_id).await? else {
            return Ok(AddMemberOutcome::WorkspaceMissing);
        };
        if workspace.is_full() {
            return Ok(AddMemberOutcome::WorkspaceFull {
                member_limit: workspace.member_limit,
            });
        }

        let existing: Option<String> = sqlx::query_scalar(
            "SELECT id FROM workspace_members WHERE workspace_id = ? AND user_id = ?",
        )
        .bind(&workspace_id)
        .bind(&user_id)
        .fetch_optional(&mut *tx)
        .await?;
        if existing.is_some() {
            return Ok(AddMemberOutcome::AlreadyMember);
        }

        let member = MembershipRecord {
            id,
            workspace_id,
            user_id,
            role,
            joined_at,
        };
        Self::insert_member(&mut tx, &member).await?;
        Self::refresh_member_count(&mut tx, &member.workspace_id).await?;

        let workspace = Self::fetch_workspace_with(&mut tx, &member.workspace_id)
            .await?
            .ok_or_else(|| anyhow!("workspace {} vanished while adding", member.workspace_id))?;

        tx.commit().await?;
        Ok(AddMemberOutcome::Added { member, workspace })
    }

    async fn remove_member(
        &self,
        workspace_id: &WorkspaceId,
        member_id: &MemberId,
    ) -> Result<RemoveMemberOutcome> {
        let mut tx = self.pool.begin().await?;
        if !Self::lock_workspace(&mut tx, workspace_id).await? {
            return Ok(RemoveMemberOutcome::WorkspaceMissing);
        }

        let row = sqlx::query(&format!(
            "{SELECT_MEMBER} WHERE id = ? AND workspace_id = ?"
        ))
        .bind(member_id)
        .bind(workspace_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(member) = row.as_ref().map(Self::map_member_row).transpose()? else {
            return Ok(RemoveMemberOutcome::MemberMissing);
        };

        sqlx::query("DELETE FROM workspace_members WHERE id = ?")
            .bind(member_id)
            .execute(&mut *tx)
            .await?;
        Self::refresh_member_count(&mut tx, workspace_id).await?;

        let workspace = Self::fetch_workspace_with(&mut tx, workspace_id)
            .await?
            .ok_or_else(|| anyhow!("workspace {workspace_id} vanished while removing"))?;

        tx.commit().await?;
        Ok(RemoveMemberOutcome::Removed { member, workspace })
    }

    async fn update_member_role(
        &self,
        workspace_id: &WorkspaceId,
        member_id: &MemberId,
        role: MemberRole,
    ) -> Result<Option<MembershipRecord>> {
        let result = sqlx::query(
            "UPDATE workspace_members SET role = ? WHERE id = ? AND workspace_id = ?",
        )
        .bind(role.as_str())
        .bind(member_id)
        .bind(workspace_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_member(workspace_id, member_id).await
    }

    async fn find_member(
        &self,
        workspace_id: &WorkspaceId,
        member_id: &MemberId,
    ) -> Result<Option<MembershipRecord>> {
        let row = sqlx::query(&format!(
            "{SELECT_MEMBER} WHERE id = ? AND workspace_id = ?"
        ))
        .bind(member_id)
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::map_member_row).transpose()
    }

    async fn find_member_by_user(
        &self,
        workspace_id: &WorkspaceId,
        user_id: &UserId,
    ) -> Result<Option<MembershipRecord>> {
        let row = sqlx::query(&format!(
            "{SELECT_MEMBER} WHERE workspace_id = ? AND user_id = ?"
        ))
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::map_member_row).transpose()
    }

    async fn list_members(&self, workspace_id: &WorkspaceId) -> Result<Vec<MembershipRecord>> {
        let rows = sqlx::query(&format!(
            "{SELECT_MEMBER} WHERE workspace_id = ? ORDER BY joined_at ASC, rowid ASC"
        ))
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::map_member_row).collect()
    }

    async fn list_members_with_users(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<MemberWithUser>> {
        let rows = sqlx::query(
            "SELECT
                 wm.id,
                 wm.workspace_id,
                 wm.user_id,
                 wm.role,
                 wm.joined_at,
                 u.email,
                 u.first_name,
                 u.last_name
             FROM workspace_members wm
             INNER JOIN users u ON u.id = wm.user_id
             WHERE wm.workspace_id = ?
             ORDER BY wm.joined_at ASC, wm.rowid ASC",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<MemberWithUser> {
                Ok(MemberWithUser {
                    member: Self::map_member_row(row)?,
                    email: row.try_get("email")?,
                    first_name: row.try_get("first_name")?,
                    last_name: row.try_get("last_name")?,
                })
            })
            .collect()
    }
}
