//! Client helpers for organization-scoped endpoints. Every call here goes
//! through [`with_org_context`], so a malformed org id fails before any
//! request is built.

use crate::{
    api::{ApiClient, ApiError, RequestOptions},
    org::with_org_context,
    portal::types::{LawyerProfile, OrgMember, OrgSettings, UpdateOrgSettingsRequest},
};

/// Lists the members of an organization.
///
/// # Errors
/// Returns [`ApiError::InvalidOrgId`] for a malformed id, or a request
/// error.
pub async fn list_members(client: &ApiClient, org_id: &str) -> Result<Vec<OrgMember>, ApiError> {
    let options = with_org_context(Some(org_id), RequestOptions::authenticated())?;
    client.get_json("/orgs/members", &options).await
}

/// Fetches the organization's public lawyer profile.
///
/// # Errors
/// Returns [`ApiError::InvalidOrgId`] for a malformed id, or a request
/// error.
pub async fn fetch_lawyer_profile(
    client: &ApiClient,
    org_id: &str,
) -> Result<LawyerProfile, ApiError> {
    let options = with_org_context(Some(org_id), RequestOptions::authenticated())?;
    client.get_json("/orgs/lawyer-profile", &options).await
}

/// Fetches the organization settings.
///
/// # Errors
/// Returns [`ApiError::InvalidOrgId`] for a malformed id, or a request
/// error.
pub async fn fetch_settings(client: &ApiClient, org_id: &str) -> Result<OrgSettings, ApiError> {
    let options = with_org_context(Some(org_id), RequestOptions::authenticated())?;
    client.get_json("/orgs/settings", &options).await
}

/// Updates the organization settings.
///
/// # Errors
/// Returns [`ApiError::InvalidOrgId`] for a malformed id, or a request
/// error.
pub async fn update_settings(
    client: &ApiClient,
    org_id: &str,
    request: &UpdateOrgSettingsRequest,
) -> Result<OrgSettings, ApiError> {
    let options = with_org_context(Some(org_id), RequestOptions::authenticated())?;
    client.patch_json("/orgs/settings", request, &options).await
}
