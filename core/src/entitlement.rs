//! Subscription-tier quota on how many workspaces a user may belong to.
//!
//! Both workspace creation (the creator joins immediately) and member addition
//! go through [`can_join_workspace`]; there is no second copy of the table.

use thiserror::Error;

use crate::user::SubscriptionTier;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "the {tier} subscription is entitled to {cap} workspace(s) and {held} are already held; upgrade the subscription to join more"
)]
pub struct EntitlementDenial {
    pub tier: SubscriptionTier,
    pub cap: i64,
    pub held: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntitlementDecision {
    Allowed,
    Denied(EntitlementDenial),
}

impl EntitlementDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Allowed => None,
            Self::Denied(denial) => Some(denial.to_string()),
        }
    }

    pub fn into_result(self) -> Result<(), EntitlementDenial> {
        match self {
            Self::Allowed => Ok(()),
            Self::Denied(denial) => Err(denial),
        }
    }
}

/// Maximum number of memberships a tier may hold, `None` meaning unlimited.
pub fn membership_cap(tier: SubscriptionTier) -> Option<i64> {
    match tier {
        SubscriptionTier::Starter => Some(1),
        SubscriptionTier::Pro => Some(3),
        SubscriptionTier::Ultimate => Some(7),
        SubscriptionTier::Basic | SubscriptionTier::Premium | SubscriptionTier::Enterprise => None,
    }
}

/// Decide whether a user on `tier` already holding `held` memberships may
/// take one more.
pub fn can_join_workspace(tier: SubscriptionTier, held: i64) -> EntitlementDecision {
    match membership_cap(tier) {
        Some(cap) if held >= cap => EntitlementDecision::Denied(EntitlementDenial {
            tier,
            cap,
            held,
        }),
        _ => EntitlementDecision::Allowed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starter_is_limited_to_one_membership() {
        assert!(can_join_workspace(SubscriptionTier::Starter, 0).is_allowed());

        let decision = can_join_workspace(SubscriptionTier::Starter, 1);
        assert_eq!(
            decision,
            EntitlementDecision::Denied(EntitlementDenial {
                tier: SubscriptionTier::Starter,
                cap: 1,
                held: 1,
            })
        );
        assert!(decision.reason().unwrap().contains("starter"));
    }

    #[test]
    fn pro_and_ultimate_caps() {
        assert!(can_join_workspace(SubscriptionTier::Pro, 2).is_allowed());
        assert!(!can_join_workspace(SubscriptionTier::Pro, 3).is_allowed());
        assert!(can_join_workspace(SubscriptionTier::Ultimate, 6).is_allowed());
        assert!(!can_join_workspace(SubscriptionTier::Ultimate, 7).is_allowed());
    }

    #[test]
    fn counts_above_cap_stay_denied() {
        // Rows inserted before a downgrade can leave a user over the cap.
        assert!(!can_join_workspace(SubscriptionTier::Pro, 5).is_allowed());
    }

    #[test]
    fn other_tiers_are_unlimited() {
        for tier in [
            SubscriptionTier::Basic,
            SubscriptionTier::Premium,
            SubscriptionTier::Enterprise,
        ] {
            assert_eq!(membership_cap(tier), None);
            assert!(can_join_workspace(tier, 10_000).is_allowed());
        }
    }
}
