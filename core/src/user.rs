use std::{fmt, str::FromStr};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    db::{
        Database,
        errors::is_unique_violation,
        user_repo::{CreateUserParams, UserRepositoryRef},
    },
    error::{CoreError, CoreResult},
    ids::UserId,
};

pub const DEFAULT_SEARCH_LIMIT: i64 = 20;
pub const MAX_SEARCH_LIMIT: i64 = 100;

/// A user's personal subscription. This vocabulary is independent of
/// [`crate::workspace::WorkspacePlan`] even where the names overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Basic,
    Premium,
    Enterprise,
    Starter,
    Pro,
    Ultimate,
}

impl SubscriptionTier {
    pub const ALL: [SubscriptionTier; 6] = [
        Self::Basic,
        Self::Premium,
        Self::Enterprise,
        Self::Starter,
        Self::Pro,
        Self::Ultimate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Premium => "premium",
            Self::Enterprise => "enterprise",
            Self::Starter => "starter",
            Self::Pro => "pro",
            Self::Ultimate => "ultimate",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str() == normalized)
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionTier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            CoreError::validation(format!(
                "unknown subscription tier '{s}'. Choose between basic, premium, enterprise, starter, pro, and ultimate"
            ))
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub subscription_tier: SubscriptionTier,
    pub created_at: i64,
}

impl UserRecord {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}

pub struct NewUser<'a> {
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub subscription_tier: Option<SubscriptionTier>,
}

#[derive(Clone)]
pub struct UserStore {
    user_repo: UserRepositoryRef,
}

impl UserStore {
    pub fn new(database: &Database) -> Self {
        Self {
            user_repo: database.repositories().user_repo(),
        }
    }

    pub async fn register(&self, new_user: NewUser<'_>) -> CoreResult<UserRecord> {
        let email = normalize_email(new_user.email)?;
        let first_name = required_name(new_user.first_name, "first name")?;
        let last_name = required_name(new_user.last_name, "last name")?;

        if self.user_repo.fetch_user_by_email(&email).await?.is_some() {
            return Err(CoreError::Conflict(format!(
                "a user with email {email} already exists"
            )));
        }

        let params = CreateUserParams {
            id: UserId::generate(),
            email,
            first_name,
            last_name,
            subscription_tier: new_user.subscription_tier.unwrap_or_default(),
            created_at: Utc::now().timestamp(),
        };

        match self.user_repo.create_user(params).await {
            Ok(user) => {
                info!(user_id = %user.id, tier = %user.subscription_tier, "registered user");
                Ok(user)
            }
            Err(err) if is_unique_violation(&err) => Err(CoreError::Conflict(
                "a user with this email already exists".to_owned(),
            )),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn find_by_id(&self, id: &UserId) -> CoreResult<Option<UserRecord>> {
        Ok(self.user_repo.fetch_user_by_id(id).await?)
    }

    /// Like [`Self::find_by_id`] but absent users are an error.
    pub async fn require(&self, id: &UserId) -> CoreResult<UserRecord> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::UserNotFound(id.clone()))
    }

    pub async fn find_by_email(&self, email: &str) -> CoreResult<Option<UserRecord>> {
        let normalized = email.trim().to_ascii_lowercase();
        Ok(self.user_repo.fetch_user_by_email(&normalized).await?)
    }

    /// Case-insensitive match on first or last name.
    pub async fn search(
        &self,
        query: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> CoreResult<Vec<UserRecord>> {
        let lowered = query.map(str::trim).unwrap_or_default().to_ascii_lowercase();
        let pattern = format!("%{lowered}%");
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);
        Ok(self
            .user_repo
            .search_users(&pattern, offset.max(0), limit)
            .await?)
    }

    pub async fn update_subscription(
        &self,
        id: &UserId,
        tier: SubscriptionTier,
    ) -> CoreResult<UserRecord> {
        let updated = self.user_repo.update_subscription_tier(id, tier).await?;
        if !updated {
            return Err(CoreError::UserNotFound(id.clone()));
        }

        info!(user_id = %id, tier = %tier, "updated subscription tier");
        self.require(id).await
    }
}

pub(crate) fn normalize_email(raw: &str) -> CoreResult<String> {
    let email = raw.trim().to_ascii_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if valid {
        Ok(email)
    } else {
        Err(CoreError::validation(format!(
            "'{}' is not a valid email address",
            raw.trim()
        )))
    }
}

fn required_name(raw: &str, field: &str) -> CoreResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(CoreError::validation(format!("{field} must not be empty")))
    } else {
        Ok(trimmed.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_database;

    #[test]
    fn tiers_parse_case_insensitively() {
        assert_eq!(SubscriptionTier::parse(" PRO "), Some(SubscriptionTier::Pro));
        assert_eq!(SubscriptionTier::parse("gold"), None);
        assert!(matches!(
            "gold".parse::<SubscriptionTier>(),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn email_normalization_rejects_missing_parts() {
        assert_eq!(normalize_email(" A@Example.com ").unwrap(), "a@example.com");
        assert!(normalize_email("nobody").is_err());
        assert!(normalize_email("@example.com").is_err());
    }

    #[tokio::test]
    async fn register_defaults_to_basic_and_rejects_duplicates() {
        let (_temp_dir, database) = setup_database().await;
        let users = UserStore::new(&database);

        let user = users
            .register(NewUser {
                email: "Ada@Example.com",
                first_name: "Ada",
                last_name: "Lovelace",
                subscription_tier: None,
            })
            .await
            .expect("register");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.subscription_tier, SubscriptionTier::Basic);

        let err = users
            .register(NewUser {
                email: "ada@example.com",
                first_name: "Other",
                last_name: "Person",
                subscription_tier: None,
            })
            .await
            .expect_err("duplicate email");
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn search_matches_first_or_last_name() {
        let (_temp_dir, database) = setup_database().await;
        let users = UserStore::new(&database);
        for (email, first, last) in [
            ("grace@example.com", "Grace", "Hopper"),
            ("alan@example.com", "Alan", "Turing"),
        ] {
            users
                .register(NewUser {
                    email,
                    first_name: first,
                    last_name: last,
                    subscription_tier: None,
                })
                .await
                .unwrap();
        }

        let found = users.search(Some("hop"), 0, 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].first_name, "Grace");

        let everyone = users.search(None, 0, 10).await.unwrap();
        assert_eq!(everyone.len(), 2);
    }

    #[tokio::test]
    async fn update_subscription_for_unknown_user_is_not_found() {
        let (_temp_dir, database) = setup_database().await;
        let users = UserStore::new(&database);

        let err = users
            .update_subscription(&UserId::from("ghost"), SubscriptionTier::Pro)
            .await
            .expect_err("missing user");
        assert!(err.is_not_found());
    }
}
