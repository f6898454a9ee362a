use axum::http::HeaderMap;
use crewspace_core::{ids::UserId, user::UserRecord};

use crate::{error::AppError, observability, state::AppState};

/// Set by the upstream authenticator once the caller's credentials check out.
pub(crate) const USER_ID_HEADER: &str = "x-user-id";

/// Resolve the authenticated caller to a registered user.
pub(crate) async fn authenticate_rest_request(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<UserRecord, AppError> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::unauthorized("You must sign in first to access this resource."))?;

    let user = state
        .user_store
        .find_by_id(&UserId::from(user_id))
        .await?
        .ok_or_else(|| AppError::unauthorized("Unknown user identity."))?;

    observability::record_authenticated_user(user.id.as_str());
    Ok(user)
}
