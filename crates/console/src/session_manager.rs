//! Session lifecycle: startup hydration, login, logout and permission refresh.
//!
//! `AuthSessionManager` is the only writer of the session and of the
//! persisted session record. It is constructed once per process and shared by
//! reference; consumers read [`AuthSnapshot`]s or subscribe to changes.

use std::sync::Arc;

use marketadmin_auth::{
    filter_menu, AuthPhase, AuthSnapshot, GuardDecision, MenuEntry, RouteGuard,
    RouteRequirement, SelfExclusionRule, Session,
};
use tokio::sync::watch;

use crate::access::Access;
use crate::api::{AdminApi, ApiError};
use crate::catalog::PermissionCatalog;
use crate::store::SessionStore;
use crate::types::LoginRequest;

pub struct AuthSessionManager {
    api: Arc<dyn AdminApi>,
    store: SessionStore,
    catalog: Arc<PermissionCatalog>,
    state: watch::Sender<AuthSnapshot>,
}

impl AuthSessionManager {
    /// Create a manager in the `Hydrating` state. Call [`hydrate`](Self::hydrate)
    /// before relying on the authentication state.
    pub fn new(api: Arc<dyn AdminApi>, store: SessionStore) -> Self {
        let catalog = Arc::new(PermissionCatalog::new(api.clone()));
        let (state, _) = watch::channel(AuthSnapshot::hydrating());
        Self {
            api,
            store,
            catalog,
            state,
        }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn catalog(&self) -> &Arc<PermissionCatalog> {
        &self.catalog
    }

    /// Current permissions and roles for in-page action gating.
    pub fn access(&self) -> Access {
        self.catalog.access()
    }

    /// Rebuild the session from persisted storage.
    ///
    /// A well-formed record is adopted and its permissions loaded. Anything
    /// unreadable is purged and the manager stays unauthenticated. `loading`
    /// drops to `false` as the last step either way.
    pub async fn hydrate(&self) {
        self.state.send_modify(|s| {
            s.phase = AuthPhase::Hydrating;
            s.loading = true;
        });

        let adopted = match self.store.load().await {
            Ok(Some(persisted)) => {
                let session = Session::adopt(persisted.token, persisted.user);
                tracing::info!(
                    session_id = %session.id,
                    email = %session.user.email,
                    "restored persisted session"
                );
                self.adopt(session.clone());
                Some(session)
            }
            Ok(None) => {
                tracing::debug!("no persisted session");
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable persisted session");
                self.purge_store().await;
                None
            }
        };

        if let Some(session) = adopted {
            let _ = self.catalog.fetch_and_replace(&session).await;
        }

        self.state.send_modify(|s| {
            if s.phase == AuthPhase::Hydrating {
                s.phase = phase_for(&*s);
            }
            s.loading = false;
        });
    }

    /// Authenticate with the backend.
    ///
    /// Returns `true` once the session is adopted. Never fails loudly: bad
    /// credentials, transport errors and malformed responses all return
    /// `false` without persisting anything.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        self.state.send_modify(|s| {
            s.phase = AuthPhase::Authenticating;
            s.loading = true;
        });

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let parts = match self.api.login(&request).await {
            Ok(envelope) => {
                let parts = envelope.into_session_parts(email);
                if parts.is_none() {
                    tracing::warn!(email = %email, "login rejected or malformed response");
                }
                parts
            }
            Err(err) => {
                tracing::warn!(email = %email, error = %err, "login request failed");
                None
            }
        };

        let Some((token, user)) = parts else {
            self.state.send_modify(|s| {
                s.phase = phase_for(&*s);
                s.loading = false;
            });
            return false;
        };

        if let Err(err) = self.store.save(&token, &user).await {
            tracing::warn!(error = %err, "failed to persist session; it will not survive a restart");
        }

        let session = Session::adopt(token, user);
        tracing::info!(session_id = %session.id, email = %session.user.email, "logged in");
        self.adopt(session.clone());

        let _ = self.catalog.fetch_and_replace(&session).await;

        self.state.send_modify(|s| {
            s.loading = false;
        });
        true
    }

    /// End the session.
    ///
    /// The backend is notified best-effort; local state and persisted storage
    /// are cleared whatever the notify returns. Safe to call repeatedly.
    pub async fn logout(&self) {
        let current = self.state.borrow().session.clone();

        // Unbinding first drops any permission response still in flight.
        self.catalog.clear();

        if let Some(session) = &current {
            self.state.send_modify(|s| s.phase = AuthPhase::LoggingOut);

            if let Err(err) = self.api.logout(&session.token).await {
                tracing::warn!(session_id = %session.id, error = %err, "logout notify failed");
            }
        }

        self.purge_store().await;

        let current_id = current.as_ref().map(|s| s.id);
        self.state.send_modify(|s| {
            if s.session_id() == current_id {
                s.session = None;
            }
            s.phase = phase_for(&*s);
            s.loading = false;
        });

        if let Some(session) = current {
            tracing::info!(session_id = %session.id, "logged out");
        }
    }

    /// Re-fetch permissions for the current session.
    ///
    /// `Ok(false)` when unauthenticated or when the session changed while the
    /// request was in flight.
    pub async fn refresh_permissions(&self) -> Result<bool, ApiError> {
        let Some(session) = self.state.borrow().session.clone() else {
            return Ok(false);
        };
        self.catalog.fetch_and_replace(&session).await
    }

    /// Guard decision for a protected view under the current state.
    pub fn decide(&self, guard: &RouteGuard, requirement: &RouteRequirement) -> GuardDecision {
        let auth = self.snapshot();
        let access = self.access();
        guard.decide(&auth, requirement, access.permissions(), access.roles())
    }

    /// Menu entries visible to the current actor, recomputed on every call.
    pub fn visible_menu(&self, menu: &[MenuEntry], rules: &[SelfExclusionRule]) -> Vec<MenuEntry> {
        if !self.is_authenticated() {
            return Vec::new();
        }
        let access = self.access();
        filter_menu(menu, access.permissions(), access.roles(), rules)
    }

    /// Make `session` current. The catalog is bound before the session is
    /// published, so permissions are never fetched for an unset session.
    fn adopt(&self, session: Session) {
        self.catalog.bind(session.id);
        self.state.send_modify(|s| {
            s.session = Some(session);
            s.phase = AuthPhase::Authenticated;
        });
    }

    async fn purge_store(&self) {
        if let Err(err) = self.store.clear().await {
            tracing::error!(error = %err, "failed to purge persisted session");
        }
    }
}

fn phase_for(snapshot: &AuthSnapshot) -> AuthPhase {
    if snapshot.is_authenticated() {
        AuthPhase::Authenticated
    } else {
        AuthPhase::Unauthenticated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryKvStore, KvStore, AUTH_TOKEN_KEY, USER_DATA_KEY};
    use crate::testing::FakeApi;
    use crate::types::{LoginEnvelope, LoginUser, PermissionsEnvelope};
    use chrono::Duration;
    use marketadmin_auth::{Denial, Permission, Role, UserProfile};

    struct Harness {
        api: Arc<FakeApi>,
        kv: InMemoryKvStore,
        manager: AuthSessionManager,
    }

    fn harness() -> Harness {
        harness_with(InMemoryKvStore::new())
    }

    fn harness_with(kv: InMemoryKvStore) -> Harness {
        let api = Arc::new(FakeApi::new());
        let manager = AuthSessionManager::new(api.clone(), SessionStore::new(Arc::new(kv.clone())));
        Harness { api, kv, manager }
    }

    fn user() -> LoginUser {
        LoginUser {
            email: Some("ops@shop.io".to_string()),
            full_name: Some("Ops Desk".to_string()),
            user_name: None,
            role: Some("Sub Admin".to_string()),
        }
    }

    fn grants(perms: &[&'static str], slugs: &[&str]) -> PermissionsEnvelope {
        PermissionsEnvelope::new(
            perms.iter().map(|p| Permission::new(*p)).collect(),
            slugs.iter().map(|s| Role::with_slug(*s)).collect(),
        )
    }

    async fn logged_in(perms: &[&'static str]) -> Harness {
        let h = harness();
        h.manager.hydrate().await;
        h.api.push_login(Ok(LoginEnvelope::success("tok-1", user())));
        h.api.push_permissions(Ok(grants(perms, &[])));
        assert!(h.manager.login("ops@shop.io", "pw").await);
        h
    }

    #[tokio::test]
    async fn starts_hydrating_and_loading() {
        let h = harness();
        let snapshot = h.manager.snapshot();
        assert_eq!(snapshot.phase, AuthPhase::Hydrating);
        assert!(snapshot.loading);
        assert_eq!(
            h.manager.decide(&RouteGuard::default(), &RouteRequirement::authenticated()),
            GuardDecision::Loading
        );
    }

    #[tokio::test]
    async fn hydrate_with_empty_store_is_unauthenticated() {
        let h = harness();
        h.manager.hydrate().await;

        let snapshot = h.manager.snapshot();
        assert_eq!(snapshot.phase, AuthPhase::Unauthenticated);
        assert!(!snapshot.loading);
        assert!(!snapshot.is_authenticated());
        assert_eq!(h.api.permission_calls(), 0);
    }

    #[tokio::test]
    async fn hydrate_adopts_persisted_session_and_loads_permissions() {
        let kv = InMemoryKvStore::new();
        let profile = UserProfile {
            email: "ops@shop.io".to_string(),
            name: "Ops Desk".to_string(),
            role: "Admin".to_string(),
        };
        SessionStore::new(Arc::new(kv.clone())).save("tok-9", &profile).await.unwrap();

        let h = harness_with(kv);
        h.api.push_permissions(Ok(grants(&["users.view"], &[])));
        h.manager.hydrate().await;

        let snapshot = h.manager.snapshot();
        assert_eq!(snapshot.phase, AuthPhase::Authenticated);
        assert!(!snapshot.loading);
        assert_eq!(snapshot.user(), Some(&profile));
        assert_eq!(snapshot.session.map(|s| s.token), Some("tok-9".to_string()));
        assert!(h.manager.access().can("users.view"));
    }

    #[tokio::test]
    async fn hydrate_purges_corrupt_record() {
        let kv = InMemoryKvStore::new();
        kv.set(AUTH_TOKEN_KEY, "tok", Duration::days(1)).await.unwrap();
        kv.set(USER_DATA_KEY, "][", Duration::days(1)).await.unwrap();

        let h = harness_with(kv);
        h.manager.hydrate().await;

        assert!(!h.manager.is_authenticated());
        assert!(!h.manager.snapshot().loading);
        assert!(h.kv.is_empty());
    }

    #[tokio::test]
    async fn loading_drops_exactly_once_during_hydration() {
        let kv = InMemoryKvStore::new();
        let profile = UserProfile {
            email: "ops@shop.io".to_string(),
            name: "Ops Desk".to_string(),
            role: "Admin".to_string(),
        };
        SessionStore::new(Arc::new(kv.clone())).save("tok-9", &profile).await.unwrap();

        let h = harness_with(kv);
        let gate = h.api.hold_permissions();
        h.api.push_permissions(Ok(grants(&["users.view"], &[])));
        let mut rx = h.manager.subscribe();

        let observe = async {
            h.api.wait_for_permission_call().await;
            let during = rx.borrow_and_update().clone();
            gate.release();

            let mut drops = 0;
            let mut was_loading = during.loading;
            while was_loading {
                if rx.changed().await.is_err() {
                    break;
                }
                let loading = rx.borrow_and_update().loading;
                if !loading {
                    drops += 1;
                }
                was_loading = loading;
            }
            (during, drops)
        };
        let ((), (during, drops)) = tokio::join!(h.manager.hydrate(), observe);

        assert!(during.loading);
        assert_eq!(during.phase, AuthPhase::Authenticated);
        assert_eq!(drops, 1);
        assert!(!rx.has_changed().unwrap());
        assert!(!h.manager.snapshot().loading);
    }

    #[tokio::test]
    async fn login_success_persists_and_adopts() {
        let h = logged_in(&["dashboard.view"]).await;

        let snapshot = h.manager.snapshot();
        assert_eq!(snapshot.phase, AuthPhase::Authenticated);
        assert!(!snapshot.loading);
        assert_eq!(snapshot.user().map(|u| u.name.as_str()), Some("Ops Desk"));

        let persisted = SessionStore::new(Arc::new(h.kv.clone())).load().await.unwrap().unwrap();
        assert_eq!(persisted.token, "tok-1");
        assert_eq!(persisted.user.role, "Sub Admin");

        let access = h.manager.access();
        assert!(access.can("dashboard.view"));
        assert!(!access.can("dashboard.export"));
    }

    #[tokio::test]
    async fn login_failure_persists_nothing() {
        let h = harness();
        h.manager.hydrate().await;

        h.api.push_login(Err(ApiError::Api(401, "invalid credentials".to_string())));
        assert!(!h.manager.login("ops@shop.io", "wrong").await);

        h.api.push_login(Ok(LoginEnvelope {
            status: Some("error".to_string()),
            data: None,
        }));
        assert!(!h.manager.login("ops@shop.io", "wrong").await);

        let snapshot = h.manager.snapshot();
        assert_eq!(snapshot.phase, AuthPhase::Unauthenticated);
        assert!(!snapshot.loading);
        assert!(!snapshot.is_authenticated());
        assert!(h.kv.is_empty());
        assert_eq!(h.api.permission_calls(), 0);
    }

    #[tokio::test]
    async fn login_shows_authenticating_while_in_flight() {
        let h = harness();
        h.manager.hydrate().await;
        let gate = h.api.hold_login();
        h.api.push_login(Ok(LoginEnvelope::success("tok", LoginUser::default())));
        h.api.push_permissions(Ok(grants(&[], &[])));

        let observe = async {
            h.api.wait_for_login_call().await;
            let snapshot = h.manager.snapshot();
            gate.release();
            snapshot
        };
        let (ok, during) = tokio::join!(h.manager.login("typed@shop.io", "pw"), observe);

        assert!(ok);
        assert_eq!(during.phase, AuthPhase::Authenticating);
        assert!(during.loading);
        assert!(!during.is_authenticated());
        assert_eq!(
            h.manager.snapshot().user().map(|u| u.email.as_str()),
            Some("typed@shop.io")
        );
    }

    #[tokio::test]
    async fn failed_permission_fetch_keeps_session_and_manual_refresh_recovers() {
        let h = harness();
        h.manager.hydrate().await;
        h.api.push_login(Ok(LoginEnvelope::success("tok-1", user())));
        h.api.push_permissions(Err(ApiError::Network("timeout".to_string())));

        assert!(h.manager.login("ops@shop.io", "pw").await);
        assert!(h.manager.is_authenticated());
        assert!(h.manager.access().permissions().is_empty());

        h.api.push_permissions(Ok(grants(&["orders.view"], &[])));
        assert!(h.manager.refresh_permissions().await.unwrap());
        assert!(h.manager.access().can("orders.view"));
        assert_eq!(h.api.login_calls(), 1);
    }

    #[tokio::test]
    async fn refresh_is_a_noop_when_unauthenticated() {
        let h = harness();
        h.manager.hydrate().await;
        assert!(!h.manager.refresh_permissions().await.unwrap());
        assert_eq!(h.api.permission_calls(), 0);
    }

    #[tokio::test]
    async fn logout_clears_everything_even_when_notify_fails() {
        let h = logged_in(&["users.view"]).await;
        h.api.fail_logout(ApiError::Network("offline".to_string()));

        h.manager.logout().await;

        let snapshot = h.manager.snapshot();
        assert_eq!(snapshot.phase, AuthPhase::Unauthenticated);
        assert!(!snapshot.is_authenticated());
        assert!(h.kv.is_empty());
        assert_eq!(h.manager.access(), Access::default());
        assert_eq!(h.api.logged_out_tokens(), vec!["tok-1".to_string()]);
    }

    #[tokio::test]
    async fn logging_out_holds_the_guard_in_loading() {
        let h = logged_in(&["users.view"]).await;
        let gate = h.api.hold_logout();
        let guard = RouteGuard::default();

        let observe = async {
            h.api.wait_for_logout_call().await;
            let snapshot = h.manager.snapshot();
            let decision = h.manager.decide(&guard, &RouteRequirement::permission("users.view"));
            gate.release();
            (snapshot, decision)
        };
        let ((), (during, decision)) = tokio::join!(h.manager.logout(), observe);

        assert_eq!(during.phase, AuthPhase::LoggingOut);
        assert!(during.is_authenticated());
        assert_eq!(decision, GuardDecision::Loading);
        assert_eq!(h.manager.snapshot().phase, AuthPhase::Unauthenticated);
        assert_eq!(
            h.manager.decide(&guard, &RouteRequirement::permission("users.view")),
            GuardDecision::Redirect { to: "/login".to_string() }
        );
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let h = logged_in(&["users.view"]).await;
        h.manager.logout().await;
        h.manager.logout().await;

        assert!(!h.manager.is_authenticated());
        assert_eq!(h.api.logout_calls(), 1);

        let fresh = harness();
        fresh.manager.hydrate().await;
        fresh.manager.logout().await;
        assert!(!fresh.manager.is_authenticated());
        assert_eq!(fresh.api.logout_calls(), 0);
    }

    #[tokio::test]
    async fn late_permission_response_after_logout_is_discarded() {
        let h = logged_in(&["users.view"]).await;
        let gate = h.api.hold_permissions();
        h.api.push_permissions(Ok(grants(&["users.view", "users.delete"], &["admin"])));

        let refresh = h.manager.refresh_permissions();
        let logout = async {
            h.api.wait_for_permission_call().await;
            h.manager.logout().await;
            gate.release();
        };
        let (applied, ()) = tokio::join!(refresh, logout);

        assert!(!applied.unwrap());
        assert!(!h.manager.is_authenticated());
        assert!(h.manager.access().permissions().is_empty());
        assert!(!h.manager.access().is_privileged());
    }

    #[tokio::test]
    async fn guard_and_menu_follow_the_session() {
        let h = logged_in(&["users.view"]).await;
        let guard = RouteGuard::default();

        assert_eq!(
            h.manager.decide(&guard, &RouteRequirement::permission("users.view")),
            GuardDecision::Render
        );
        assert_eq!(
            h.manager.decide(&guard, &RouteRequirement::permission("users.delete")),
            GuardDecision::Deny(Denial::AccessDenied { back_to: "/".to_string() })
        );

        let menu = vec![
            MenuEntry::new("Users", "/users").requires("users.view"),
            MenuEntry::new("Orders", "/orders").requires("orders.view"),
        ];
        assert_eq!(h.manager.visible_menu(&menu, &[]).len(), 1);

        h.api.push_permissions(Ok(grants(&["users.view", "orders.view"], &[])));
        h.manager.refresh_permissions().await.unwrap();
        assert_eq!(h.manager.visible_menu(&menu, &[]).len(), 2);

        h.manager.logout().await;
        assert!(h.manager.visible_menu(&menu, &[]).is_empty());
        assert_eq!(
            h.manager.decide(&guard, &RouteRequirement::authenticated()),
            GuardDecision::Redirect { to: "/login".to_string() }
        );
    }
}
