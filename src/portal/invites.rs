//! Client helpers for organization invites. Listing and creating invites
//! are org-scoped; accepting one is not, since the invitee may not belong
//! to the organization yet.

use crate::{
    api::{ApiClient, ApiError, RequestOptions},
    org::with_org_context,
    portal::types::{AcceptInviteRequest, CreateInviteRequest, Invite},
};

/// Lists the pending invites of an organization.
///
/// # Errors
/// Returns [`ApiError::InvalidOrgId`] for a malformed id, or a request
/// error.
pub async fn list_invites(client: &ApiClient, org_id: &str) -> Result<Vec<Invite>, ApiError> {
    let options = with_org_context(Some(org_id), RequestOptions::authenticated())?;
    client.get_json("/orgs/invites", &options).await
}

/// Creates an invite for the given email and role.
///
/// # Errors
/// Returns [`ApiError::InvalidOrgId`] for a malformed id, or a request
/// error.
pub async fn create_invite(
    client: &ApiClient,
    org_id: &str,
    request: &CreateInviteRequest,
) -> Result<Invite, ApiError> {
    let options = with_org_context(Some(org_id), RequestOptions::authenticated())?;
    client.post_json("/orgs/invites", request, &options).await
}

/// Revokes a pending invite.
///
/// # Errors
/// Returns [`ApiError::InvalidOrgId`] for a malformed id, or a request
/// error.
pub async fn revoke_invite(
    client: &ApiClient,
    org_id: &str,
    invite_id: &str,
) -> Result<(), ApiError> {
    let options = with_org_context(Some(org_id), RequestOptions::authenticated())?;
    client
        .delete(&format!("/orgs/invites/{invite_id}"), &options)
        .await
}

/// Accepts an invite using the token from the invite email.
///
/// # Errors
/// Returns an error if the request fails or the token is rejected.
pub async fn accept_invite(client: &ApiClient, token: &str) -> Result<(), ApiError> {
    let request = AcceptInviteRequest {
        token: token.to_string(),
    };
    client
        .post_json_empty("/invites/accept", &request, &RequestOptions::authenticated())
        .await
}
