use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of one adopted session (one login or one hydration).
///
/// Minted fresh every time a session is adopted and never persisted; two
/// sessions for the same user and token still get distinct ids. Late
/// responses are matched against it to detect that the session they were
/// issued for is gone.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for SessionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Profile of the authenticated user, mirrored to persisted storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: String,
    pub name: String,
    pub role: String,
}

/// The authenticated identity plus its opaque access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub token: String,
    pub user: UserProfile,
}

impl Session {
    /// Adopt a token and profile as a new session.
    pub fn adopt(token: impl Into<String>, user: UserProfile) -> Self {
        Self {
            id: SessionId::new(),
            token: token.into(),
            user,
        }
    }
}

/// Lifecycle phase of the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPhase {
    /// Startup: persisted storage has not been read yet.
    Hydrating,
    Unauthenticated,
    /// A login request is in flight.
    Authenticating,
    Authenticated,
    /// The server-side logout notify is in flight.
    LoggingOut,
}

/// Point-in-time view of the authentication state.
///
/// Authentication is derived from the presence of a session, so a snapshot
/// can never claim to be both authenticated and unauthenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub phase: AuthPhase,
    pub session: Option<Session>,
    pub loading: bool,
}

impl AuthSnapshot {
    /// Initial state at process start.
    pub fn hydrating() -> Self {
        Self {
            phase: AuthPhase::Hydrating,
            session: None,
            loading: true,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }
}
