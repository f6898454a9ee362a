use anyhow::{Result, anyhow};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};

use crate::{
    db::user_repo::{CreateUserParams, UserRepository},
    ids::UserId,
    user::{SubscriptionTier, UserRecord},
};

const SELECT_USER: &str = "SELECT id, email, first_name, last_name, subscription_tier, created_at
     FROM users";

pub struct SqliteUserRepository {
    pool: Pool<Sqlite>,
}

impl SqliteUserRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn map_user_row(row: &SqliteRow) -> Result<UserRecord> {
        let tier: String = row.try_get("subscription_tier")?;
        Ok(UserRecord {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            subscription_tier: SubscriptionTier::parse(&tier)
                .ok_or_else(|| anyhow!("unknown subscription tier '{tier}' in storage"))?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord> {
        let CreateUserParams {
            id,
            email,
            first_name,
            last_name,
            subscription_tier,
            created_at,
        } = params;

        sqlx::query(
            "INSERT INTO users (id, email, first_name, last_name, subscription_tier, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&email)
        .bind(&first_name)
        .bind(&last_name)
        .bind(subscription_tier.as_str())
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(UserRecord {
            id,
            email,
            first_name,
            last_name,
            subscription_tier,
            created_at,
        })
    }

    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let row = sqlx::query(&format!("{SELECT_USER} WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::map_user_row).transpose()
    }

    async fn fetch_user_by_id(&self, id: &UserId) -> Result<Option<UserRecord>> {
        let row = sqlx::query(&format!("{SELECT_USER} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::map_user_row).transpose()
    }

    async fn search_users(
        &self,
        pattern: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<UserRecord>> {
        let rows = sqlx::query(&format!(
            "{SELECT_USER}
             WHERE LOWER(first_name) LIKE ? OR LOWER(last_name) LIKE ?
             ORDER BY created_at ASC, rowid ASC
             LIMIT ? OFFSET ?"
        ))
        .bind(pattern)
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::map_user_row).collect()
    }

    async fn update_subscription_tier(&self, id: &UserId, tier: SubscriptionTier) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET subscription_tier = ? WHERE id = ?")
            .bind(tier.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
