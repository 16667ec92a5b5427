//! Subscription resolution policy.
//!
//! The gate checks, in order: an active processor-side subscription, then the
//! locally cached paid-user flag, then the legacy profile row. Any lookup that
//! fails or comes back empty resolves to inactive. The lookups themselves live
//! with the caller; this module only decides what each answer means.

use serde::{Deserialize, Serialize};

pub const PLAN_PREMIUM: &str = "premium";
pub const PLAN_FREE: &str = "free";
pub const PLAN_MONTHLY: &str = "monthly";
pub const PLAN_YEARLY: &str = "yearly";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    #[default]
    Inactive,
}

impl SubscriptionStatus {
    /// Only the exact label `active` counts as active.
    pub fn from_label(label: &str) -> Self {
        if label == "active" {
            SubscriptionStatus::Active
        } else {
            SubscriptionStatus::Inactive
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Inactive => "inactive",
        }
    }
}

/// The resolved subscription for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub status: SubscriptionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    pub is_paid_user: bool,
}

/// Billing columns of the user's row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillingRecord {
    pub is_paid_user: bool,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
}

impl BillingRecord {
    /// Customer id to ask the processor about, if the user ever subscribed.
    pub fn processor_customer(&self) -> Option<&str> {
        self.stripe_subscription_id.as_ref()?;
        self.stripe_customer_id.as_deref()
    }
}

/// Legacy per-user profile row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileRecord {
    pub subscription_status: Option<String>,
    pub plan: Option<String>,
}

impl Subscription {
    pub fn inactive() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }

    /// Active if the processor says so; `None` means "keep looking".
    pub fn from_processor(status_label: &str, plan: Option<String>) -> Option<Self> {
        match SubscriptionStatus::from_label(status_label) {
            SubscriptionStatus::Active => Some(Self {
                status: SubscriptionStatus::Active,
                plan: Some(plan.unwrap_or_else(|| PLAN_PREMIUM.to_string())),
                is_paid_user: true,
            }),
            SubscriptionStatus::Inactive => None,
        }
    }

    /// Active if the cached paid flag is set; `None` means "keep looking".
    pub fn from_billing(billing: &BillingRecord) -> Option<Self> {
        billing.is_paid_user.then(|| Self {
            status: SubscriptionStatus::Active,
            plan: Some(PLAN_PREMIUM.to_string()),
            is_paid_user: true,
        })
    }

    /// Final fallback on the legacy profile row.
    pub fn from_profile(profile: &ProfileRecord, billing: &BillingRecord) -> Self {
        Self {
            status: profile
                .subscription_status
                .as_deref()
                .map(SubscriptionStatus::from_label)
                .unwrap_or_default(),
            plan: Some(
                profile
                    .plan
                    .clone()
                    .unwrap_or_else(|| PLAN_FREE.to_string()),
            ),
            is_paid_user: billing.is_paid_user,
        }
    }
}

/// Maps a processor product name onto a billing plan.
pub fn plan_from_product_name(name: &str) -> &'static str {
    if name.to_lowercase().contains(PLAN_YEARLY) {
        PLAN_YEARLY
    } else {
        PLAN_MONTHLY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_resolve_active_processor_subscription_with_default_plan() {
        let resolved = Subscription::from_processor("active", None).unwrap();
        assert!(resolved.is_active());
        assert_eq!(resolved.plan.as_deref(), Some("premium"));
        assert!(resolved.is_paid_user);
    }

    #[test]
    fn can_skip_non_active_processor_status() {
        assert_eq!(Subscription::from_processor("past_due", None), None);
        assert_eq!(Subscription::from_processor("inactive", None), None);
    }

    #[test]
    fn can_resolve_paid_flag() {
        let billing = BillingRecord {
            is_paid_user: true,
            ..Default::default()
        };
        assert!(Subscription::from_billing(&billing).unwrap().is_active());
        assert_eq!(Subscription::from_billing(&BillingRecord::default()), None);
    }

    #[test]
    fn can_fall_back_to_profile_defaults() {
        let resolved =
            Subscription::from_profile(&ProfileRecord::default(), &BillingRecord::default());
        assert_eq!(resolved.status, SubscriptionStatus::Inactive);
        assert_eq!(resolved.plan.as_deref(), Some("free"));
        assert!(!resolved.is_paid_user);
    }

    #[test]
    fn can_only_ask_processor_when_subscription_id_present() {
        let never_subscribed = BillingRecord {
            stripe_customer_id: Some("cus_1".to_string()),
            ..Default::default()
        };
        let subscribed = BillingRecord {
            stripe_customer_id: Some("cus_1".to_string()),
            stripe_subscription_id: Some("sub_1".to_string()),
            ..Default::default()
        };
        assert_eq!(never_subscribed.processor_customer(), None);
        assert_eq!(subscribed.processor_customer(), Some("cus_1"));
    }

    #[test]
    fn can_map_product_names_to_plans() {
        assert_eq!(plan_from_product_name("Cozy Premium Yearly"), "yearly");
        assert_eq!(plan_from_product_name("Cozy Premium"), "monthly");
    }
}
