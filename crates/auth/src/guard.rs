//! Route guard decision table.
//!
//! The guard only decides; performing the redirect is the caller's job (see
//! the console's redirect latch), which keeps this table testable without a
//! rendering environment.

use serde::{Deserialize, Serialize};

use crate::authorize::has_permission;
use crate::{AuthPhase, AuthSnapshot, Permission, PermissionSet, RoleSet};

/// Default login entry point.
pub const LOGIN_PATH: &str = "/login";

/// Default target of the "back" action on the access-denied view.
pub const HOME_PATH: &str = "/";

/// Access requirement declared by a protected view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRequirement {
    #[serde(default)]
    pub required_permission: Option<Permission>,
    /// View to render instead of the generic access-denied view.
    #[serde(default)]
    pub fallback: Option<String>,
}

impl RouteRequirement {
    pub fn authenticated() -> Self {
        Self::default()
    }

    pub fn permission(permission: impl Into<Permission>) -> Self {
        Self {
            required_permission: Some(permission.into()),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Hydration, login or logout in progress; no access decision yet.
    Loading,
    /// Not authenticated; send the actor to the login entry point.
    Redirect { to: String },
    /// Authenticated but lacking the required permission.
    Deny(Denial),
    /// Render the protected content.
    Render,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Denial {
    /// Caller-supplied fallback view.
    Fallback { view: String },
    /// Generic access-denied view with a back-navigation action.
    AccessDenied { back_to: String },
}

/// Per-view gatekeeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuard {
    login_path: String,
    back_path: String,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new(LOGIN_PATH, HOME_PATH)
    }
}

impl RouteGuard {
    pub fn new(login_path: impl Into<String>, back_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
            back_path: back_path.into(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Decide what a protected view shows for the current state.
    pub fn decide(
        &self,
        auth: &AuthSnapshot,
        requirement: &RouteRequirement,
        permissions: &PermissionSet,
        roles: &RoleSet,
    ) -> GuardDecision {
        if auth.loading || auth.phase == AuthPhase::LoggingOut {
            return GuardDecision::Loading;
        }

        if !auth.is_authenticated() {
            return GuardDecision::Redirect {
                to: self.login_path.clone(),
            };
        }

        let granted = requirement
            .required_permission
            .as_ref()
            .is_none_or(|p| has_permission(permissions, p.as_str(), Some(roles)));

        if granted {
            return GuardDecision::Render;
        }

        tracing::debug!(
            required = requirement.required_permission.as_ref().map(Permission::as_str),
            "route access denied"
        );

        GuardDecision::Deny(match &requirement.fallback {
            Some(view) => Denial::Fallback { view: view.clone() },
            None => Denial::AccessDenied {
                back_to: self.back_path.clone(),
            },
        })
    }
}
