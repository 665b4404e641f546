use serde::Serialize;
use thiserror::Error;

use crate::permissions::matches;
use crate::{Permission, PermissionSet, RoleSet};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Why a permission check succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Grant {
    /// A held role bypasses all checks.
    RoleBypass { slug: String },
    /// The exact permission is held.
    Exact,
    /// A held permission satisfies a `"<module>.*"` requirement.
    Wildcard { held: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    EmptyRequirement,
    NoPermissionsHeld,
    MissingPermission,
}

/// Evaluate `required` against the held permissions and roles.
///
/// - No IO
/// - No panics
/// - Fails closed: an empty held set grants nothing without a bypass role
pub fn evaluate(
    held: &PermissionSet,
    required: &str,
    roles: Option<&RoleSet>,
) -> Result<Grant, DenialKind> {
    if let Some(role) = roles.and_then(RoleSet::bypass_role) {
        return Ok(Grant::RoleBypass {
            slug: role.slug.clone(),
        });
    }

    if required.is_empty() {
        return Err(DenialKind::EmptyRequirement);
    }

    if held.is_empty() {
        return Err(DenialKind::NoPermissionsHeld);
    }

    if held.contains(required) {
        return Ok(Grant::Exact);
    }

    held.iter()
        .find(|p| matches(p.as_str(), required))
        .map(|p| Grant::Wildcard {
            held: p.as_str().to_string(),
        })
        .ok_or(DenialKind::MissingPermission)
}

/// Is `required` granted?
pub fn has_permission(held: &PermissionSet, required: &str, roles: Option<&RoleSet>) -> bool {
    evaluate(held, required, roles).is_ok()
}

/// Is at least one of `required` granted? An empty list grants nothing.
pub fn has_any<P: AsRef<str>>(held: &PermissionSet, required: &[P], roles: Option<&RoleSet>) -> bool {
    !required.is_empty() && required.iter().any(|p| has_permission(held, p.as_ref(), roles))
}

/// Is every one of `required` granted? An empty list grants nothing.
pub fn has_all<P: AsRef<str>>(held: &PermissionSet, required: &[P], roles: Option<&RoleSet>) -> bool {
    !required.is_empty() && required.iter().all(|p| has_permission(held, p.as_ref(), roles))
}

/// Result-returning form of [`has_permission`] for call sites that propagate with `?`.
pub fn authorize(
    held: &PermissionSet,
    required: &Permission,
    roles: Option<&RoleSet>,
) -> Result<Grant, AuthzError> {
    evaluate(held, required.as_str(), roles)
        .map_err(|_| AuthzError::Forbidden(required.as_str().to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
///
/// Answers "why was this allowed/denied?" for support tooling and the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub required_permission: String,
    pub granted: bool,
    pub reason: String,
    pub grant: Option<Grant>,
    pub denial: Option<DenialReason>,
    pub held_permissions: Vec<String>,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

pub fn explain_authorization(
    held: &PermissionSet,
    required: &str,
    roles: Option<&RoleSet>,
) -> AuthorizationExplanation {
    let held_permissions: Vec<String> = held.sorted().iter().map(|p| p.as_str().to_string()).collect();
    let role_slugs: Vec<String> = roles
        .map(|r| r.slugs().into_iter().map(str::to_string).collect())
        .unwrap_or_default();

    match evaluate(held, required, roles) {
        Ok(grant) => {
            let reason = match &grant {
                Grant::RoleBypass { slug } => {
                    format!("Role '{slug}' bypasses all permission checks")
                }
                Grant::Exact => format!("Actor holds permission '{required}'"),
                Grant::Wildcard { held } => {
                    format!("Held permission '{held}' falls inside module wildcard '{required}'")
                }
            };

            AuthorizationExplanation {
                required_permission: required.to_string(),
                granted: true,
                reason,
                grant: Some(grant),
                denial: None,
                held_permissions,
                roles: role_slugs,
            }
        }
        Err(kind) => {
            let (message, suggestions) = match kind {
                DenialKind::EmptyRequirement => (
                    "An empty permission string can never be satisfied".to_string(),
                    vec!["Declare a concrete '<module>.<action>' permission".to_string()],
                ),
                DenialKind::NoPermissionsHeld => (
                    "Actor holds no permissions".to_string(),
                    vec![
                        "Refresh permissions; the last fetch may have failed".to_string(),
                        format!("Grant '{required}' to one of the actor's roles"),
                    ],
                ),
                DenialKind::MissingPermission => (
                    format!("Missing required permission: '{required}'"),
                    vec![
                        format!("Grant '{required}' to one of the actor's roles"),
                        "Assign the 'admin' or 'super_admin' role".to_string(),
                    ],
                ),
            };

            AuthorizationExplanation {
                required_permission: required.to_string(),
                granted: false,
                reason: message.clone(),
                grant: None,
                denial: Some(DenialReason {
                    kind,
                    message,
                    suggestions,
                }),
                held_permissions,
                roles: role_slugs,
            }
        }
    }
}
