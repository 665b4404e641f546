use std::borrow::{Borrow, Cow};
use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// Separator between the module and action halves of a permission.
pub const SEPARATOR: char = '.';

/// Suffix marking a module-wide wildcard (e.g. `"orders.*"`).
pub const MODULE_WILDCARD_SUFFIX: &str = ".*";

/// Permission identifier.
///
/// Permissions are opaque dotted strings of the form `"<module>.<action>"`
/// (e.g. `"dashboard.view"`). Only the wildcard matcher looks inside them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` for permissions of the form `"<module>.*"`.
    pub fn is_module_wildcard(&self) -> bool {
        self.as_str().ends_with(MODULE_WILDCARD_SUFFIX)
    }

    pub fn module(&self) -> &str {
        module_of(self.as_str())
    }

    pub fn action(&self) -> &str {
        action_of(self.as_str())
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Permission {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Permission {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for Permission {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Permission {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Does a single held permission satisfy `required`?
///
/// Exact equality always matches. When `required` ends with `.*`, any held
/// permission inside that module matches. The separator is part of the
/// prefix, so `"dashboardx.view"` never matches `"dashboard.*"`.
pub fn matches(held: &str, required: &str) -> bool {
    if held == required {
        return true;
    }

    match required.strip_suffix(MODULE_WILDCARD_SUFFIX) {
        Some(module) => held
            .strip_prefix(module)
            .is_some_and(|rest| rest.starts_with(SEPARATOR)),
        None => false,
    }
}

/// Module half of a permission (everything before the first `.`).
pub fn module_of(permission: &str) -> &str {
    match permission.split_once(SEPARATOR) {
        Some((module, _)) => module,
        None => permission,
    }
}

/// Action half of a permission (everything after the first `.`).
///
/// `"a.b.c"` yields `"b.c"`; a permission without a separator has no action.
pub fn action_of(permission: &str) -> &str {
    match permission.split_once(SEPARATOR) {
        Some((_, action)) => action,
        None => "",
    }
}

/// Partition permissions by module, keeping input order within each module.
pub fn group_by_module<'a, I>(permissions: I) -> BTreeMap<String, Vec<Permission>>
where
    I: IntoIterator<Item = &'a Permission>,
{
    let mut groups: BTreeMap<String, Vec<Permission>> = BTreeMap::new();
    for permission in permissions {
        groups
            .entry(permission.module().to_string())
            .or_default()
            .push(permission.clone());
    }
    groups
}

/// The set of permissions held by the current actor.
///
/// Replaced wholesale on every fetch; never merged incrementally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(HashSet<Permission>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, permission: &str) -> bool {
        self.0.contains(permission)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }

    /// Permissions in lexical order, for display.
    pub fn sorted(&self) -> Vec<Permission> {
        let mut list: Vec<Permission> = self.0.iter().cloned().collect();
        list.sort();
        list
    }
}

impl<P: Into<Permission>> FromIterator<P> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = P>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
