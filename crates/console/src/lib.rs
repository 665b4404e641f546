//! Stateful side of the marketplace admin console.
//!
//! `AuthSessionManager` owns the session lifecycle and feeds the
//! `PermissionCatalog`; the route table, the navigation menu and in-page
//! [`Access`] checks all read from those two. Decisions themselves live in
//! `marketadmin-auth`.

pub mod access;
pub mod api;
pub mod catalog;
pub mod config;
pub mod marketplace;
pub mod routes;
pub mod session_manager;
pub mod sqlite_store;
pub mod store;
pub mod testing;
pub mod types;

pub use access::Access;
pub use api::{AdminApi, ApiError, Endpoints, HttpAdminApi};
pub use catalog::{CatalogState, PermissionCatalog};
pub use config::{ConfigError, ConsoleConfig};
pub use routes::{ProtectedRoute, RedirectLatch, RouteTable};
pub use session_manager::AuthSessionManager;
pub use sqlite_store::SqliteKvStore;
pub use store::{InMemoryKvStore, KvStore, PersistedSession, SessionStore, StoreError};
pub use types::{LoginEnvelope, LoginRequest, LoginUser, PermissionsEnvelope};
