use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};

use crate::{
    ids::{NotificationId, UserId},
    notification::{NotificationCenter, NotificationRecord},
};

#[derive(Clone)]
pub struct SqliteNotificationCenter {
    pool: Pool<Sqlite>,
}

impl SqliteNotificationCenter {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn map_row(row: &SqliteRow) -> Result<NotificationRecord> {
        let created_at: i64 = row.try_get("created_at")?;
        Ok(NotificationRecord {
            id: row.try_get("id")?,
            sender_id: row.try_get("sender_id")?,
            receiver_id: row.try_get("receiver_id")?,
            message: row.try_get("message")?,
            read: row.try_get::<i64, _>("read")? != 0,
            created_at: DateTime::<Utc>::from_timestamp(created_at, 0)
                .ok_or_else(|| anyhow!("invalid notification timestamp {created_at}"))?,
        })
    }
}

#[async_trait]
impl NotificationCenter for SqliteNotificationCenter {
    async fn enqueue(&self, notification: NotificationRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO notifications (id, sender_id, receiver_id, message, read, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&notification.id)
        .bind(&notification.sender_id)
        .bind(&notification.receiver_id)
        .bind(&notification.message)
        .bind(if notification.read { 1_i64 } else { 0_i64 })
        .bind(notification.created_at.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<NotificationRecord>> {
        let rows = sqlx::query(
            "SELECT id, sender_id, receiver_id, message, read, created_at
             FROM notifications
             WHERE receiver_id = ?
             ORDER BY created_at DESC, rowid DESC
             LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::map_row).collect()
    }

    async fn count_unread(&self, user_id: &UserId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE receiver_id = ? AND read = 0",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn mark_read(&self, notification_id: &NotificationId, user_id: &UserId) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET read = 1 WHERE id = ? AND receiver_id = ?")
            .bind(notification_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, user_id: &UserId) -> Result<u64> {
        let result =
            sqlx::query("UPDATE notifications SET read = 1 WHERE receiver_id = ? AND read = 0")
                .bind(user_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}
