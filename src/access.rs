use serde::Serialize;

use crate::routes::{SubscriptionPlan, UserSubscription};

/// What a page instance is allowed to present, re-derived from the current
/// user and subscription state on every evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessGate {
    Unauthenticated,
    AuthenticatedNoSubscription,
    AuthenticatedWithAdsPlan,
    AuthenticatedAdFree,
}

/// The blocking prompt shown instead of playback, when any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Prompt {
    SignIn,
    PlanPicker,
}

impl AccessGate {
    pub fn playback_allowed(&self) -> bool {
        matches!(
            self,
            AccessGate::AuthenticatedWithAdsPlan | AccessGate::AuthenticatedAdFree
        )
    }

    pub fn shows_ads(&self) -> bool {
        matches!(self, AccessGate::AuthenticatedWithAdsPlan)
    }

    pub fn prompt(&self) -> Option<Prompt> {
        match self {
            AccessGate::Unauthenticated => Some(Prompt::SignIn),
            AccessGate::AuthenticatedNoSubscription => Some(Prompt::PlanPicker),
            _ => None,
        }
    }
}

/// Evaluates the gate for a (possibly anonymous) viewer and the plan behind
/// their current active subscription, if one exists.
pub fn evaluate(authenticated: bool, plan: Option<&SubscriptionPlan>) -> AccessGate {
    if !authenticated {
        return AccessGate::Unauthenticated;
    }

    match plan {
        None => AccessGate::AuthenticatedNoSubscription,
        Some(plan) if plan.has_ads => AccessGate::AuthenticatedWithAdsPlan,
        Some(_) => AccessGate::AuthenticatedAdFree,
    }
}

/// Picks the subscription row that currently counts. The store is expected
/// to hold one active row per user, but nothing enforces it, so the most
/// recently created active row wins.
pub fn pick_current(subscriptions: &[UserSubscription]) -> Option<&UserSubscription> {
    subscriptions
        .iter()
        .filter(|s| s.status == "active")
        .max_by_key(|s| s.created_at)
}
