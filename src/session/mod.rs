//! In-memory session state: the bearer token store shared by API calls and
//! the unified auth state consumed by both the edge gate and the client
//! guard. Tokens are held as [`SecretString`] and never persisted; expiry is
//! discovered reactively through 401 responses, not tracked here.

pub mod guard;

pub use guard::AuthGuard;

use crate::portal::types::UserProfile;
use secrecy::{ExposeSecret, SecretString};
use std::sync::{Arc, PoisonError, RwLock};

/// Auth state as seen by any layer of the boundary.
///
/// The edge gate can only ever produce `Unknown` (cookie present, identity
/// unverified) or `Unauthenticated` (cookie absent); only the guard's
/// profile fetch promotes a session to `Authenticated`.
#[derive(Clone, Debug, Default)]
pub enum SessionState {
    /// Not yet determined, e.g. a profile fetch is still in flight.
    #[default]
    Unknown,
    /// A verified profile was fetched; the profile is the authorization signal.
    Authenticated(UserProfile),
    /// No credential, or the profile fetch came back empty or failed.
    Unauthenticated,
}

impl SessionState {
    /// Coarse mapping for the edge gate's cookie presence check.
    ///
    /// A present cookie proves nothing, so it maps to `Unknown` and defers
    /// to the guard; only absence is conclusive.
    #[must_use]
    pub fn from_cookie(present: bool) -> Self {
        if present {
            Self::Unknown
        } else {
            Self::Unauthenticated
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

#[derive(Debug, Default)]
struct TokenCell {
    token: Option<SecretString>,
    generation: u64,
}

/// Shared holder of the current access token.
///
/// Cloning yields a handle to the same cell, so a store can be handed to an
/// [`crate::api::ApiClient`] and to login/logout flows without global state.
/// Writes are last-writer-wins; the generation counter lets concurrent 401
/// handlers detect that another flow already rotated the token.
#[derive(Clone, Debug, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<TokenCell>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current token. All subsequent authenticated requests use
    /// the new value.
    pub fn set_token(&self, token: SecretString) {
        let mut cell = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        cell.token = Some(token);
        cell.generation += 1;
    }

    /// Drops the current token, typically on logout or unrecoverable
    /// refresh failure.
    pub fn clear(&self) {
        let mut cell = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        cell.token = None;
        cell.generation += 1;
    }

    /// The `Authorization` header value for the current token, if any.
    #[must_use]
    pub fn bearer(&self) -> Option<String> {
        let cell = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        cell.token
            .as_ref()
            .map(|token| format!("Bearer {}", token.expose_secret()))
    }

    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        let cell = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        cell.token.clone()
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        let cell = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        cell.token.is_some()
    }

    /// Bumped on every write; used to coalesce concurrent refresh attempts.
    #[must_use]
    pub fn generation(&self) -> u64 {
        let cell = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        cell.generation
    }
}
