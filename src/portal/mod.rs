//! Thin typed clients for the portal API, one module per feature area.
//! These are the consumers of the session boundary: they centralize paths,
//! auth flags, and org scoping so route code never builds raw requests.

pub mod auth;
pub mod invites;
pub mod me;
pub mod orgs;
pub mod types;
