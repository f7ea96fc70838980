//! Organization-context validation for org-scoped API calls.
//!
//! Org identifiers frequently arrive from URL query parameters, which are
//! user-editable and bookmarkable. Validating the shape here, once, keeps
//! malformed values from ever reaching the network layer and spares every
//! call site its own check. Membership itself is authorized server-side.

use crate::api::{ApiError, RequestOptions};
use std::fmt;
use uuid::Uuid;

/// Header carrying the organization context on org-scoped requests.
pub const ORG_HEADER: &str = "x-org-id";

/// A syntactically valid organization identifier.
///
/// Construction goes through [`OrgId::parse`], so holding one is proof the
/// id already passed validation. The original string is kept so the header
/// carries exactly what the caller supplied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrgId(String);

impl OrgId {
    /// # Errors
    /// Returns [`ApiError::InvalidOrgId`] if `input` is not a canonical
    /// hyphenated UUID.
    pub fn parse(input: &str) -> Result<Self, ApiError> {
        assert_valid_org_id(input)?;
        Ok(Self(input.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Fails fast, before any network call, on anything that is not a
/// canonical hyphenated UUID. The length check rejects the unhyphenated
/// simple form, which `Uuid::parse_str` would otherwise accept.
///
/// # Errors
/// Returns [`ApiError::InvalidOrgId`] for malformed input.
pub fn assert_valid_org_id(input: &str) -> Result<(), ApiError> {
    if input.len() == 36 && Uuid::parse_str(input).is_ok() {
        Ok(())
    } else {
        Err(ApiError::InvalidOrgId(input.to_string()))
    }
}

/// Augments request options with an organization context.
///
/// A `None` id returns the options untouched (no header); a present id is
/// validated first and attached as [`ORG_HEADER`].
///
/// # Errors
/// Returns [`ApiError::InvalidOrgId`] if `org_id` is present but malformed.
pub fn with_org_context(
    org_id: Option<&str>,
    mut options: RequestOptions,
) -> Result<RequestOptions, ApiError> {
    if let Some(id) = org_id {
        options.org = Some(OrgId::parse(id)?);
    }
    Ok(options)
}
