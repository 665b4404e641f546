//! Navigation filtering: prunes a static menu definition down to the entries
//! the current actor may see.

use serde::{Deserialize, Serialize};

use crate::authorize::has_permission;
use crate::{Permission, PermissionSet, RoleSet};

/// One entry of a menu definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub name: String,
    /// Navigation target; also the key for self-exclusion rules.
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_permission: Option<Permission>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuEntry>,
}

impl MenuEntry {
    pub fn new(name: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            link: link.into(),
            required_permission: None,
            children: Vec::new(),
        }
    }

    pub fn requires(mut self, permission: impl Into<Permission>) -> Self {
        self.required_permission = Some(permission.into());
        self
    }

    pub fn with_children(mut self, children: Vec<MenuEntry>) -> Self {
        self.children = children;
        self
    }
}

/// Entries reserved for managing a restricted back-office role.
///
/// Actors holding exactly `role_slug` never see entries whose link is in
/// `links`, whatever their grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfExclusionRule {
    pub role_slug: String,
    pub links: Vec<String>,
}

impl SelfExclusionRule {
    pub fn new(role_slug: impl Into<String>, links: Vec<String>) -> Self {
        Self {
            role_slug: role_slug.into(),
            links,
        }
    }

    fn excludes(&self, entry: &MenuEntry, roles: &RoleSet) -> bool {
        self.links.iter().any(|l| *l == entry.link) && roles.has_slug(&self.role_slug)
    }
}

/// Visible subset of `menu` for the given permissions and roles.
///
/// Pure: recompute after every permission or role change. A denied parent
/// hides its subtree; a group whose children are all hidden is hidden too.
pub fn filter_menu(
    menu: &[MenuEntry],
    permissions: &PermissionSet,
    roles: &RoleSet,
    rules: &[SelfExclusionRule],
) -> Vec<MenuEntry> {
    menu.iter()
        .filter_map(|entry| visible_entry(entry, permissions, roles, rules))
        .collect()
}

fn visible_entry(
    entry: &MenuEntry,
    permissions: &PermissionSet,
    roles: &RoleSet,
    rules: &[SelfExclusionRule],
) -> Option<MenuEntry> {
    if rules.iter().any(|rule| rule.excludes(entry, roles)) {
        return None;
    }

    if let Some(required) = &entry.required_permission {
        if !has_permission(permissions, required.as_str(), Some(roles)) {
            return None;
        }
    }

    if entry.children.is_empty() {
        return Some(entry.clone());
    }

    let children = filter_menu(&entry.children, permissions, roles, rules);
    if children.is_empty() {
        return None;
    }

    Some(MenuEntry {
        children,
        ..entry.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    fn menu() -> Vec<MenuEntry> {
        vec![
            MenuEntry::new("Dashboard", "/"),
            MenuEntry::new("Users", "/users").requires("users.view"),
            MenuEntry::new("Sub Admins", "/sub-admins").requires("subadmins.view"),
            MenuEntry::new("Commerce", "/commerce").with_children(vec![
                MenuEntry::new("Orders", "/orders").requires("orders.view"),
                MenuEntry::new("Transactions", "/transactions").requires("transactions.view"),
            ]),
        ]
    }

    fn names(entries: &[MenuEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    fn rules() -> Vec<SelfExclusionRule> {
        vec![SelfExclusionRule::new("sub_admin", vec!["/sub-admins".to_string()])]
    }

    #[test]
    fn unrestricted_entries_always_visible() {
        let visible = filter_menu(&menu(), &PermissionSet::new(), &RoleSet::default(), &rules());
        assert_eq!(names(&visible), vec!["Dashboard"]);
    }

    #[test]
    fn entries_follow_permissions() {
        let held: PermissionSet = ["users.view", "orders.view"].into_iter().collect();
        let visible = filter_menu(&menu(), &held, &RoleSet::default(), &rules());

        assert_eq!(names(&visible), vec!["Dashboard", "Users", "Commerce"]);
        assert_eq!(names(&visible[2].children), vec!["Orders"]);
    }

    #[test]
    fn restricted_role_never_sees_its_own_management_entry() {
        let held: PermissionSet = ["subadmins.view", "users.view"].into_iter().collect();
        let roles: RoleSet = [Role::with_slug("sub_admin")].into_iter().collect();

        let visible = filter_menu(&menu(), &held, &roles, &rules());
        assert_eq!(names(&visible), vec!["Dashboard", "Users"]);

        // The same grants without the restricted role see the entry.
        let visible = filter_menu(&menu(), &held, &RoleSet::default(), &rules());
        assert_eq!(names(&visible), vec!["Dashboard", "Users", "Sub Admins"]);
    }

    #[test]
    fn admin_sees_everything_except_self_excluded_entries() {
        let admin: RoleSet = [Role::with_slug("admin")].into_iter().collect();
        let visible = filter_menu(&menu(), &PermissionSet::new(), &admin, &rules());
        assert_eq!(names(&visible), vec!["Dashboard", "Users", "Sub Admins", "Commerce"]);
        assert_eq!(visible[3].children.len(), 2);

        let both: RoleSet = [Role::with_slug("admin"), Role::with_slug("sub_admin")]
            .into_iter()
            .collect();
        let visible = filter_menu(&menu(), &PermissionSet::new(), &both, &rules());
        assert!(!names(&visible).contains(&"Sub Admins"));
    }

    #[test]
    fn menu_definition_loads_from_json() {
        let menu: Vec<MenuEntry> = serde_json::from_str(
            r#"[{"name": "Chats", "link": "/chats", "required_permission": "chats.view"},
                {"name": "Help", "link": "/help"}]"#,
        )
        .unwrap();
        assert_eq!(menu[0].required_permission, Some(Permission::new("chats.view")));
        assert!(menu[1].children.is_empty());
    }
}
