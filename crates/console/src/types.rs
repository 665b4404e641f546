//! Wire types for the admin REST API.
//!
//! Every field is optional so that a response of an unexpected shape is
//! detected by the caller rather than failing deserialization midway.

use marketadmin_auth::{Permission, PermissionSet, Role, RoleSet, UserProfile};
use serde::{Deserialize, Serialize};

/// `status` value of a successful login response.
pub const SUCCESS_STATUS: &str = "success";

/// Name used when the login response carries neither `full_name` nor `user_name`.
pub const DEFAULT_USER_NAME: &str = "Admin User";

/// Role label used when the login response carries no `role`.
pub const DEFAULT_USER_ROLE: &str = "Admin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `{status, data: {token, user: {email?, full_name?, user_name?, role?}}}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginEnvelope {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data: Option<LoginData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginData {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<LoginUser>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginUser {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl LoginEnvelope {
    /// Build a successful response (used by fakes and tests).
    pub fn success(token: impl Into<String>, user: LoginUser) -> Self {
        Self {
            status: Some(SUCCESS_STATUS.to_string()),
            data: Some(LoginData {
                token: Some(token.into()),
                user: Some(user),
            }),
        }
    }

    /// Token and profile of a successful login, or `None` for any other shape.
    ///
    /// Success requires `status == "success"`, a non-empty token and a user
    /// object. Missing user fields fall back to defaults: the email the actor
    /// typed, [`DEFAULT_USER_NAME`] and [`DEFAULT_USER_ROLE`].
    pub fn into_session_parts(self, input_email: &str) -> Option<(String, UserProfile)> {
        if self.status.as_deref() != Some(SUCCESS_STATUS) {
            return None;
        }

        let data = self.data?;
        let token = data.token.filter(|t| !t.is_empty())?;
        let user = data.user?;

        let profile = UserProfile {
            email: non_empty(user.email).unwrap_or_else(|| input_email.to_string()),
            name: non_empty(user.full_name)
                .or_else(|| non_empty(user.user_name))
                .unwrap_or_else(|| DEFAULT_USER_NAME.to_string()),
            role: non_empty(user.role).unwrap_or_else(|| DEFAULT_USER_ROLE.to_string()),
        };

        Some((token, profile))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// `{data: {permissions: string[], roles: Role[]}}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionsEnvelope {
    #[serde(default)]
    pub data: PermissionsData,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionsData {
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl PermissionsEnvelope {
    pub fn new(permissions: Vec<Permission>, roles: Vec<Role>) -> Self {
        Self {
            data: PermissionsData { permissions, roles },
        }
    }

    pub fn into_parts(self) -> (PermissionSet, RoleSet) {
        (
            self.data.permissions.into_iter().collect(),
            RoleSet::new(self.data.roles),
        )
    }
}
