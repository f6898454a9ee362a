// Workspace membership handlers

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use crewspace_core::{
    ids::{MemberId, UserId, WorkspaceId},
    membership::MemberRole,
};

use crate::{
    auth::authenticate_rest_request,
    error::AppError,
    state::AppState,
    types::{AddMemberRequest, MemberResponse, UpdateRoleRequest},
};

pub(crate) async fn list_members_handler(
    Path(workspace_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<MemberResponse>>, AppError> {
    authenticate_rest_request(&state, &headers).await?;

    let members = state
        .membership_store
        .list_members_with_users(&WorkspaceId::from(workspace_id))
        .await?;
    Ok(Json(members.into_iter().map(MemberResponse::from).collect()))
}

/// The trailing path segment is the id of the user being added.
pub(crate) async fn add_member_handler(
    Path((workspace_id, user_id)): Path<(String, String)>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AddMemberRequest>,
) -> Result<(StatusCode, Json<MemberResponse>), AppError> {
    let acting = authenticate_rest_request(&state, &headers).await?;
    let role = payload
        .role
        .as_deref()
        .map(str::parse::<MemberRole>)
        .transpose()?
        .unwrap_or_default();

    let member = state
        .membership_store
        .add_member(
            &acting.id,
            &WorkspaceId::from(workspace_id),
            &UserId::from(user_id),
            role,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(member.into())))
}

pub(crate) async fn update_member_role_handler(
    Path((workspace_id, member_id)): Path<(String, String)>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<MemberResponse>, AppError> {
    let acting = authenticate_rest_request(&state, &headers).await?;
    let role: MemberRole = payload.role.parse()?;

    let member = state
        .membership_store
        .update_role(
            &acting.id,
            &WorkspaceId::from(workspace_id),
            &MemberId::from(member_id),
            role,
        )
        .await?;

    Ok(Json(member.into()))
}

pub(crate) async fn remove_member_handler(
    Path((workspace_id, member_id)): Path<(String, String)>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let acting = authenticate_rest_request(&state, &headers).await?;

    state
        .membership_store
        .remove_member(
            &acting.id,
            &WorkspaceId::from(workspace_id),
            &MemberId::from(member_id),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
