use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    error::{CoreError, CoreResult},
    ids::{NotificationId, UserId},
};

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    pub fn unread(sender_id: UserId, receiver_id: UserId, message: String) -> Self {
        Self {
            id: NotificationId::generate(),
            sender_id,
            receiver_id,
            message,
            read: false,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait NotificationCenter: Send + Sync {
    async fn enqueue(&self, notification: NotificationRecord) -> Result<()>;

    /// Newest first.
    async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<NotificationRecord>>;

    async fn count_unread(&self, user_id: &UserId) -> Result<i64>;

    /// `false` when no notification with that id is addressed to the user.
    async fn mark_read(&self, notification_id: &NotificationId, user_id: &UserId) -> Result<bool>;

    async fn mark_all_read(&self, user_id: &UserId) -> Result<u64>;
}

pub type NotificationCenterRef = Arc<dyn NotificationCenter>;

/// Best-effort delivery of membership side effects. A failed enqueue is
/// logged and dropped so it can never undo the change that triggered it.
#[derive(Clone)]
pub struct NotificationEmitter {
    center: NotificationCenterRef,
}

impl NotificationEmitter {
    pub fn new(center: NotificationCenterRef) -> Self {
        Self { center }
    }

    pub async fn emit(&self, sender: &UserId, receiver: &UserId, message: impl Into<String>) {
        let record = NotificationRecord::unread(sender.clone(), receiver.clone(), message.into());
        let notification_id = record.id.clone();

        match self.center.enqueue(record).await {
            Ok(()) => debug!(
                %notification_id,
                sender_id = %sender,
                receiver_id = %receiver,
                "notification enqueued"
            ),
            Err(err) => warn!(
                sender_id = %sender,
                receiver_id = %receiver,
                error = %err,
                "failed to enqueue notification"
            ),
        }
    }
}

pub(crate) fn member_added_message(workspace_name: &str) -> String {
    format!("You have been added to workspace {workspace_name}")
}

pub(crate) fn member_removed_message(workspace_name: &str) -> String {
    format!("You have been removed from workspace {workspace_name}")
}

pub(crate) fn role_updated_message(workspace_name: &str, role: &str) -> String {
    let article = match role.chars().next() {
        Some(first) if "aeiou".contains(first.to_ascii_lowercase()) => "an",
        _ => "a",
    };
    format!("Your role has been updated in {workspace_name}. You are now {article} {role}.")
}

/// Read side of the notification center for the current user.
#[derive(Clone)]
pub struct NotificationInbox {
    center: NotificationCenterRef,
}

impl NotificationInbox {
    pub fn new(center: NotificationCenterRef) -> Self {
        Self { center }
    }

    pub async fn list(
        &self,
        user_id: &UserId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> CoreResult<Vec<NotificationRecord>> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
        let offset = offset.unwrap_or(0).max(0);
        Ok(self.center.list_for_user(user_id, limit, offset).await?)
    }

    pub async fn count_unread(&self, user_id: &UserId) -> CoreResult<i64> {
        Ok(self.center.count_unread(user_id).await?)
    }

    pub async fn mark_read(
        &self,
        user_id: &UserId,
        notification_id: &NotificationId,
    ) -> CoreResult<()> {
        if self.center.mark_read(notification_id, user_id).await? {
            Ok(())
        } else {
            Err(CoreError::NotificationNotFound(notification_id.clone()))
        }
    }

    pub async fn mark_all_read(&self, user_id: &UserId) -> CoreResult<u64> {
        Ok(self.center.mark_all_read(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_support::{seed_user, setup_database},
        user::SubscriptionTier,
    };

    struct FailingCenter;

    #[async_trait]
    impl NotificationCenter for FailingCenter {
        async fn enqueue(&self, _notification: NotificationRecord) -> Result<()> {
            anyhow::bail!("notification store offline")
        }

        async fn list_for_user(
            &self,
            _user_id: &UserId,
            _limit: i64,
            _offset: i64,
        ) -> Result<Vec<NotificationRecord>> {
            Ok(Vec::new())
        }

        async fn count_unread(&self, _user_id: &UserId) -> Result<i64> {
            Ok(0)
        }

        async fn mark_read(&self, _id: &NotificationId, _user_id: &UserId) -> Result<bool> {
            Ok(false)
        }

        async fn mark_all_read(&self, _user_id: &UserId) -> Result<u64> {
            Ok(0)
        }
    }

    #[test]
    fn role_message_picks_article() {
        assert_eq!(
            role_updated_message("Acme", "editor"),
            "Your role has been updated in Acme. You are now an editor."
        );
        assert_eq!(
            role_updated_message("Acme", "member"),
            "Your role has been updated in Acme. You are now a member."
        );
    }

    #[tokio::test]
    async fn emit_swallows_center_failures() {
        let emitter = NotificationEmitter::new(Arc::new(FailingCenter));
        emitter
            .emit(&UserId::from("a"), &UserId::from("b"), "hello")
            .await;
    }

    #[tokio::test]
    async fn inbox_lists_counts_and_marks() {
        let (_temp_dir, database) = setup_database().await;
        let sender = seed_user(&database, "sender@example.com", SubscriptionTier::Basic).await;
        let receiver = seed_user(&database, "receiver@example.com", SubscriptionTier::Basic).await;
        let center = database.repositories().notification_center();
        let emitter = NotificationEmitter::new(center.clone());
        let inbox = NotificationInbox::new(center);

        emitter.emit(&sender.id, &receiver.id, "first").await;
        emitter.emit(&sender.id, &receiver.id, "second").await;

        let listed = inbox.list(&receiver.id, None, None).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|n| n.sender_id == sender.id && !n.read));
        assert_eq!(inbox.count_unread(&receiver.id).await.unwrap(), 2);
        assert_eq!(inbox.count_unread(&sender.id).await.unwrap(), 0);

        inbox.mark_read(&receiver.id, &listed[0].id).await.unwrap();
        assert_eq!(inbox.count_unread(&receiver.id).await.unwrap(), 1);

        // Another user's notification is invisible to the sender.
        let err = inbox
            .mark_read(&sender.id, &listed[1].id)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotificationNotFound(_)));

        assert_eq!(inbox.mark_all_read(&receiver.id).await.unwrap(), 1);
        assert_eq!(inbox.count_unread(&receiver.id).await.unwrap(), 0);
    }
}
