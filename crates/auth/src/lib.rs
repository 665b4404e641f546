//! Pure authorization core for the marketplace admin console.
//!
//! No HTTP, storage or rendering here: permission evaluation, the route guard
//! decision table and navigation filtering are plain data in, data out.

pub mod authorize;
pub mod guard;
pub mod navigation;
pub mod permissions;
pub mod roles;
pub mod session;

pub use authorize::{
    authorize, evaluate, explain_authorization, has_all, has_any, has_permission,
    AuthorizationExplanation, AuthzError, DenialKind, Grant,
};
pub use guard::{Denial, GuardDecision, RouteGuard, RouteRequirement};
pub use navigation::{filter_menu, MenuEntry, SelfExclusionRule};
pub use permissions::{action_of, group_by_module, matches, module_of, Permission, PermissionSet};
pub use roles::{Role, RoleId, RoleSet, ADMIN_SLUG, SUPER_ADMIN_SLUG};
pub use session::{AuthPhase, AuthSnapshot, Session, SessionId, UserProfile};
