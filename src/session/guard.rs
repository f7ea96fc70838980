//! Component-level auth guard for protected UI subtrees.
//!
//! The guard is the authoritative check layered beneath the edge gate's
//! coarse cookie test: the gate can be bypassed or stale, so sensitive UI
//! still waits for a verified profile. Redirects are returned as values for
//! the caller's router to act on, never performed as side effects, and
//! never produced while the profile fetch is still outstanding.

use crate::{
    api::ApiClient,
    gate::paths,
    portal::me,
    session::SessionState,
};
use tracing::debug;

/// Guard for one protected subtree.
///
/// Starts in [`SessionState::Unknown`] (loading). After [`AuthGuard::resolve`]
/// the state is either `Authenticated` (render children) or
/// `Unauthenticated` (follow [`AuthGuard::redirect`], render nothing).
#[derive(Debug)]
pub struct AuthGuard {
    state: SessionState,
    return_to: String,
}

impl AuthGuard {
    /// `return_to` is the currently requested path (+ query), round-tripped
    /// through the login page's `next` parameter.
    #[must_use]
    pub fn new(return_to: impl Into<String>) -> Self {
        Self {
            state: SessionState::Unknown,
            return_to: return_to.into(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Fetches the profile and settles the guard.
    ///
    /// Absence of a profile, an empty response, and any fetch error all
    /// collapse to `Unauthenticated`; token presence alone proves nothing.
    pub async fn resolve(&mut self, client: &ApiClient) -> &SessionState {
        self.state = match me::fetch_profile(client).await {
            Ok(Some(profile)) => SessionState::Authenticated(profile),
            Ok(None) => SessionState::Unauthenticated,
            Err(err) => {
                debug!("profile fetch failed, treating as unauthenticated: {err}");
                SessionState::Unauthenticated
            }
        };
        &self.state
    }

    /// Login URL to navigate to, only once the guard has settled on
    /// `Unauthenticated`. `None` while loading or when authenticated, so a
    /// slow fetch can never cause a speculative redirect.
    #[must_use]
    pub fn redirect(&self) -> Option<String> {
        match self.state {
            SessionState::Unauthenticated => Some(paths::login_url(&self.return_to)),
            SessionState::Unknown | SessionState::Authenticated(_) => None,
        }
    }
}
