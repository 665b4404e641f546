use serde::{Deserialize, Serialize};

/// Role slug that bypasses every permission check.
pub const ADMIN_SLUG: &str = "admin";

/// Role slug that bypasses every permission check.
pub const SUPER_ADMIN_SLUG: &str = "super_admin";

const BYPASS_SLUGS: [&str; 2] = [ADMIN_SLUG, SUPER_ADMIN_SLUG];

/// Backend role identifier; the API may send either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoleId {
    Numeric(i64),
    Text(String),
}

impl Default for RoleId {
    fn default() -> Self {
        Self::Numeric(0)
    }
}

impl core::fmt::Display for RoleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RoleId::Numeric(id) => write!(f, "{id}"),
            RoleId::Text(id) => f.write_str(id),
        }
    }
}

/// A role held by the current actor, as reported by the permissions endpoint.
///
/// Only `slug` takes part in authorization decisions (the admin bypass and
/// the self-exclusion rule). `is_active` is carried for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub id: RoleId,
    #[serde(default)]
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Role {
    /// Minimal role carrying only a slug.
    pub fn with_slug(slug: impl Into<String>) -> Self {
        let slug = slug.into();
        Self {
            id: RoleId::default(),
            name: slug.clone(),
            slug,
            description: None,
            is_active: true,
        }
    }

    pub fn is_bypass(&self) -> bool {
        BYPASS_SLUGS.contains(&self.slug.as_str())
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.slug)
    }
}

/// Roles held by the current actor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(Vec<Role>);

impl RoleSet {
    pub fn new(roles: Vec<Role>) -> Self {
        Self(roles)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.0.iter()
    }

    pub fn has_slug(&self, slug: &str) -> bool {
        self.0.iter().any(|r| r.slug == slug)
    }

    /// First role granting the unconditional bypass, if any.
    pub fn bypass_role(&self) -> Option<&Role> {
        self.0.iter().find(|r| r.is_bypass())
    }

    pub fn slugs(&self) -> Vec<&str> {
        self.0.iter().map(|r| r.slug.as_str()).collect()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<T: IntoIterator<Item = Role>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
