//! # Lexgate (Portal Session & Organization Boundary)
//!
//! `lexgate` is the authentication/session boundary for a legal services
//! portal. It ships two halves that share one contract:
//!
//! - A client library: an injectable [`session::SessionStore`], an
//!   [`api::ApiClient`] that attaches bearer tokens and organization-context
//!   headers and transparently refreshes expired tokens (one refresh, one
//!   retry, never more), an [`session::AuthGuard`] that gates UI subtrees on
//!   a verified profile fetch, and thin feature clients under [`portal`].
//! - An edge gate: an axum reverse proxy ([`gate`]) in front of the portal
//!   renderer that redirects unauthenticated requests for protected paths to
//!   `/login?next=...` before any page markup is served.
//!
//! ## Session model
//!
//! The bearer token lives only in memory and is rotated via an `HttpOnly`
//! refresh cookie the client never reads. A separate plaintext cookie is
//! used by the edge gate purely as a presence signal; the two are
//! independent, loosely synchronized signals and are never cross-checked.
//!
//! ## Organization scoping
//!
//! Org-scoped calls carry an `x-org-id` header. Identifiers frequently
//! arrive from user-editable URLs, so [`org::assert_valid_org_id`] rejects
//! anything that is not a canonical UUID before a request is built. The
//! server remains the final authority on membership.

pub mod api;
pub mod cli;
pub mod gate;
pub mod org;
pub mod portal;
pub mod session;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
