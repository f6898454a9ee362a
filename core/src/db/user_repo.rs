use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    ids::UserId,
    user::{SubscriptionTier, UserRecord},
};

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub subscription_tier: SubscriptionTier,
    pub created_at: i64,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord>;

    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    async fn fetch_user_by_id(&self, id: &UserId) -> Result<Option<UserRecord>>;

    /// `pattern` is a lowercase SQL `LIKE` pattern matched against first and
    /// last name.
    async fn search_users(&self, pattern: &str, offset: i64, limit: i64)
    -> Result<Vec<UserRecord>>;

    async fn update_subscription_tier(&self, id: &UserId, tier: SubscriptionTier) -> Result<bool>;
}

pub type UserRepositoryRef = Arc<dyn UserRepository>;
