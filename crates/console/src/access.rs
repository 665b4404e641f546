//! In-page action gating over a snapshot of the actor's grants.

use std::collections::BTreeMap;

use marketadmin_auth::{
    explain_authorization, group_by_module, has_all, has_any, has_permission,
    AuthorizationExplanation, Permission, PermissionSet, RoleSet,
};

/// The actor's permissions and roles at one point in time.
///
/// Take a fresh one after every permission refresh; it is never updated in
/// place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Access {
    permissions: PermissionSet,
    roles: RoleSet,
}

impl Access {
    pub fn new(permissions: PermissionSet, roles: RoleSet) -> Self {
        Self { permissions, roles }
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    pub fn can(&self, permission: &str) -> bool {
        has_permission(&self.permissions, permission, Some(&self.roles))
    }

    pub fn can_any<P: AsRef<str>>(&self, permissions: &[P]) -> bool {
        has_any(&self.permissions, permissions, Some(&self.roles))
    }

    pub fn can_all<P: AsRef<str>>(&self, permissions: &[P]) -> bool {
        has_all(&self.permissions, permissions, Some(&self.roles))
    }

    /// Holds a role that bypasses every check.
    pub fn is_privileged(&self) -> bool {
        self.roles.bypass_role().is_some()
    }

    pub fn explain(&self, permission: &str) -> AuthorizationExplanation {
        explain_authorization(&self.permissions, permission, Some(&self.roles))
    }

    pub fn grouped(&self) -> BTreeMap<String, Vec<Permission>> {
        group_by_module(&self.permissions.sorted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketadmin_auth::Role;

    #[test]
    fn gates_actions() {
        let access = Access::new(
            ["orders.view", "orders.refund", "chats.view"].into_iter().collect(),
            RoleSet::default(),
        );

        assert!(access.can("orders.refund"));
        assert!(!access.can("orders.delete"));
        assert!(access.can_any(&["orders.delete", "chats.view"]));
        assert!(!access.can_all(&["orders.delete", "chats.view"]));
        assert!(!access.is_privileged());
        assert_eq!(access.grouped()["orders"].len(), 2);
    }

    #[test]
    fn privileged_actor_can_do_anything() {
        let access = Access::new(
            PermissionSet::new(),
            [Role::with_slug("super_admin")].into_iter().collect(),
        );
        assert!(access.is_privileged());
        assert!(access.can("subscriptions.cancel"));
        assert!(access.explain("subscriptions.cancel").granted);
    }

    #[test]
    fn empty_access_denies() {
        let access = Access::default();
        assert!(!access.can("users.view"));
        assert!(!access.can_any(&["users.view"]));
    }
}
