//! Client helpers for current-user endpoints.

use crate::{
    api::{ApiClient, ApiError, RequestOptions},
    portal::types::{UpdateProfileRequest, UserProfile},
};

/// Fetches the authenticated user's profile.
///
/// Returns `None` when there is no authenticated user. This is the fetch
/// the client-side guard keys on.
///
/// # Errors
/// Returns an error for transport failures or unexpected responses.
pub async fn fetch_profile(client: &ApiClient) -> Result<Option<UserProfile>, ApiError> {
    client
        .get_optional_json("/me/profile", &RequestOptions::authenticated())
        .await
}

/// Updates the user's profile.
///
/// # Errors
/// Returns an error if the request fails.
pub async fn update_profile(
    client: &ApiClient,
    request: &UpdateProfileRequest,
) -> Result<UserProfile, ApiError> {
    client
        .patch_json("/me/profile", request, &RequestOptions::authenticated())
        .await
}
