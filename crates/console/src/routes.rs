//! Protected route table and the redirect side effect of the route guard.

use marketadmin_auth::{
    AuthSnapshot, GuardDecision, Permission, RouteGuard, RouteRequirement,
};
use serde::{Deserialize, Serialize};

use crate::session_manager::AuthSessionManager;

/// A protected view and the access it declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedRoute {
    pub path: String,
    #[serde(flatten)]
    pub requirement: RouteRequirement,
}

impl ProtectedRoute {
    pub fn new(path: impl Into<String>, required_permission: Option<Permission>) -> Self {
        Self {
            path: path.into(),
            requirement: RouteRequirement {
                required_permission,
                fallback: None,
            },
        }
    }
}

/// Route declarations; the guard is their only consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteTable {
    routes: Vec<ProtectedRoute>,
}

impl RouteTable {
    pub fn new(routes: Vec<ProtectedRoute>) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &[ProtectedRoute] {
        &self.routes
    }

    pub fn get(&self, path: &str) -> Option<&ProtectedRoute> {
        self.routes.iter().find(|r| r.path == path)
    }

    /// Requirement for `path`. Undeclared paths still require authentication.
    pub fn requirement(&self, path: &str) -> RouteRequirement {
        self.get(path)
            .map(|r| r.requirement.clone())
            .unwrap_or_default()
    }

    /// Guard decision for `path` under the manager's current state.
    pub fn decide(&self, manager: &AuthSessionManager, guard: &RouteGuard, path: &str) -> GuardDecision {
        manager.decide(guard, &self.requirement(path))
    }
}

/// Turns successive auth snapshots into at most one redirect per transition
/// into the unauthenticated state, however often the view re-renders.
#[derive(Debug, Clone, Default)]
pub struct RedirectLatch {
    fired: bool,
}

impl RedirectLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Login path to redirect to, if this snapshot calls for a redirect that
    /// has not been issued yet.
    pub fn observe(&mut self, guard: &RouteGuard, auth: &AuthSnapshot) -> Option<String> {
        if auth.loading {
            return None;
        }

        if auth.is_authenticated() {
            self.fired = false;
            return None;
        }

        if self.fired {
            return None;
        }

        self.fired = true;
        tracing::debug!(to = guard.login_path(), "redirecting to login");
        Some(guard.login_path().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketadmin_auth::{AuthPhase, Session, UserProfile};

    fn snapshot(authenticated: bool, loading: bool) -> AuthSnapshot {
        AuthSnapshot {
            phase: if authenticated {
                AuthPhase::Authenticated
            } else {
                AuthPhase::Unauthenticated
            },
            session: authenticated.then(|| {
                Session::adopt(
                    "tok",
                    UserProfile {
                        email: "a@b.c".to_string(),
                        name: "A".to_string(),
                        role: "Admin".to_string(),
                    },
                )
            }),
            loading,
        }
    }

    #[test]
    fn redirects_once_per_transition() {
        let guard = RouteGuard::default();
        let mut latch = RedirectLatch::new();

        assert_eq!(latch.observe(&guard, &AuthSnapshot::hydrating()), None);
        assert_eq!(latch.observe(&guard, &snapshot(false, false)), Some("/login".to_string()));
        assert_eq!(latch.observe(&guard, &snapshot(false, false)), None);
        assert_eq!(latch.observe(&guard, &snapshot(false, false)), None);

        assert_eq!(latch.observe(&guard, &snapshot(true, false)), None);
        assert_eq!(latch.observe(&guard, &snapshot(false, false)), Some("/login".to_string()));
    }

    #[test]
    fn loading_never_redirects() {
        let guard = RouteGuard::default();
        let mut latch = RedirectLatch::new();
        assert_eq!(latch.observe(&guard, &snapshot(false, true)), None);
        assert_eq!(latch.observe(&guard, &snapshot(false, false)), Some("/login".to_string()));
    }

    #[test]
    fn undeclared_paths_require_authentication_only() {
        let table = RouteTable::new(vec![ProtectedRoute::new(
            "/users",
            Some(Permission::new("users.view")),
        )]);

        assert_eq!(
            table.requirement("/users").required_permission,
            Some(Permission::new("users.view"))
        );
        assert_eq!(table.requirement("/nowhere"), RouteRequirement::authenticated());
    }

    #[test]
    fn table_loads_from_json() {
        let table: RouteTable = serde_json::from_str(
            r#"[{"path": "/orders", "required_permission": "orders.view", "fallback": "orders-locked"},
                {"path": "/profile"}]"#,
        )
        .unwrap();

        let orders = table.get("/orders").unwrap();
        assert_eq!(orders.requirement.fallback.as_deref(), Some("orders-locked"));
        assert_eq!(table.requirement("/profile").required_permission, None);
    }
}
