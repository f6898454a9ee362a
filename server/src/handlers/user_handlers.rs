// User registration, lookup and subscription handlers

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
};
use crewspace_core::user::{DEFAULT_SEARCH_LIMIT, NewUser, SubscriptionTier};

use crate::{
    auth::authenticate_rest_request,
    error::AppError,
    state::AppState,
    types::{CreateUserRequest, UpdateSubscriptionRequest, UserResponse, UserSearchQuery},
};

pub(crate) async fn register_user_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let subscription_tier = payload
        .subscription_tier
        .as_deref()
        .map(str::parse::<SubscriptionTier>)
        .transpose()?;

    let user = state
        .user_store
        .register(NewUser {
            email: &payload.email,
            first_name: &payload.first_name,
            last_name: &payload.last_name,
            subscription_tier,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

pub(crate) async fn search_users_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UserSearchQuery>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    authenticate_rest_request(&state, &headers).await?;

    let users = state
        .user_store
        .search(
            query.search.as_deref(),
            query.offset.unwrap_or(0),
            query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
        )
        .await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

pub(crate) async fn current_user_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>, AppError> {
    let user = authenticate_rest_request(&state, &headers).await?;
    Ok(Json(user.into()))
}

pub(crate) async fn update_subscription_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateSubscriptionRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = authenticate_rest_request(&state, &headers).await?;
    let tier: SubscriptionTier = payload.subscription_tier.parse()?;

    let updated = state.user_store.update_subscription(&user.id, tier).await?;
    Ok(Json(updated.into()))
}
