//! Cache of the current actor's permissions and roles.

use std::sync::Arc;

use marketadmin_auth::{PermissionSet, RoleSet, Session, SessionId};
use tokio::sync::watch;

use crate::access::Access;
use crate::api::{AdminApi, ApiError};

/// Catalog contents, tied to the session they were fetched for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogState {
    pub bound_to: Option<SessionId>,
    pub permissions: PermissionSet,
    pub roles: RoleSet,
}

/// Sole writer of the permission and role sets.
///
/// The catalog is bound to one session at a time. A fetch result is applied
/// only if the catalog is still bound to the session it was issued for, so a
/// response arriving after logout (or after a new login) is dropped.
pub struct PermissionCatalog {
    api: Arc<dyn AdminApi>,
    state: watch::Sender<CatalogState>,
}

impl PermissionCatalog {
    pub fn new(api: Arc<dyn AdminApi>) -> Self {
        let (state, _) = watch::channel(CatalogState::default());
        Self { api, state }
    }

    /// Start serving `session_id` with empty sets.
    pub fn bind(&self, session_id: SessionId) {
        self.state.send_replace(CatalogState {
            bound_to: Some(session_id),
            ..CatalogState::default()
        });
    }

    /// Unbind and drop all permissions and roles.
    pub fn clear(&self) {
        self.state.send_replace(CatalogState::default());
    }

    pub fn bound_to(&self) -> Option<SessionId> {
        self.state.borrow().bound_to
    }

    pub fn state(&self) -> CatalogState {
        self.state.borrow().clone()
    }

    pub fn access(&self) -> Access {
        let state = self.state.borrow();
        Access::new(state.permissions.clone(), state.roles.clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.state.subscribe()
    }

    /// Fetch the actor's permissions and replace both sets wholesale.
    ///
    /// Returns `Ok(false)` when nothing was applied because the catalog is not
    /// (or no longer) bound to `session`. On error the current sets are left
    /// untouched.
    pub async fn fetch_and_replace(&self, session: &Session) -> Result<bool, ApiError> {
        if self.bound_to() != Some(session.id) {
            tracing::debug!(session_id = %session.id, "catalog not bound to session; skipping fetch");
            return Ok(false);
        }

        let envelope = match self.api.fetch_permissions(&session.token).await {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(
                    session_id = %session.id,
                    error = %err,
                    "permission fetch failed; keeping current permissions"
                );
                return Err(err);
            }
        };

        let (permissions, roles) = envelope.into_parts();
        let (permission_count, role_count) = (permissions.len(), roles.len());

        let applied = self.state.send_if_modified(|state| {
            if state.bound_to != Some(session.id) {
                return false;
            }
            state.permissions = permissions;
            state.roles = roles;
            true
        });

        if applied {
            tracing::info!(
                session_id = %session.id,
                permissions = permission_count,
                roles = role_count,
                "permissions replaced"
            );
        } else {
            tracing::info!(session_id = %session.id, "discarding permissions for a session that is gone");
        }

        Ok(applied)
    }
}
