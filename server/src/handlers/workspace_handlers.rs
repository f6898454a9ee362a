// Workspace management handlers

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use crewspace_core::{ids::WorkspaceId, workspace::NewWorkspace};

use crate::{
    auth::authenticate_rest_request,
    error::AppError,
    state::AppState,
    types::{
        CreateWorkspaceRequest, UpdatePlanRequest, UpdateWorkspaceRequest, UserWorkspaceResponse,
        WorkspaceResponse,
    },
};

const DEFAULT_PLAN: &str = "basic";

pub(crate) async fn create_workspace_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateWorkspaceRequest>,
) -> Result<(StatusCode, Json<WorkspaceResponse>), AppError> {
    let user = authenticate_rest_request(&state, &headers).await?;

    let workspace = state
        .workspace_store
        .create(
            &user.id,
            NewWorkspace {
                name: &payload.name,
                contact_email: &payload.contact_email,
                member_limit: payload.member_limit,
                plan: payload.plan.as_deref().unwrap_or(DEFAULT_PLAN),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(workspace.into())))
}

pub(crate) async fn list_my_workspaces_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<UserWorkspaceResponse>>, AppError> {
    let user = authenticate_rest_request(&state, &headers).await?;

    let memberships = state.workspace_store.list_for_user(&user.id).await?;
    Ok(Json(
        memberships
            .into_iter()
            .map(UserWorkspaceResponse::from)
            .collect(),
    ))
}

pub(crate) async fn get_workspace_handler(
    Path(workspace_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<WorkspaceResponse>, AppError> {
    authenticate_rest_request(&state, &headers).await?;

    let workspace = state
        .workspace_store
        .get(&WorkspaceId::from(workspace_id))
        .await?;
    Ok(Json(workspace.into()))
}

pub(crate) async fn update_workspace_handler(
    Path(workspace_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateWorkspaceRequest>,
) -> Result<Json<WorkspaceResponse>, AppError> {
    let user = authenticate_rest_request(&state, &headers).await?;

    let workspace = state
        .workspace_store
        .update(&user.id, &WorkspaceId::from(workspace_id), payload.into())
        .await?;
    Ok(Json(workspace.into()))
}

pub(crate) async fn update_workspace_plan_handler(
    Path(workspace_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdatePlanRequest>,
) -> Result<Json<WorkspaceResponse>, AppError> {
    let user = authenticate_rest_request(&state, &headers).await?;

    let workspace = state
        .workspace_store
        .update_plan(&user.id, &WorkspaceId::from(workspace_id), &payload.plan)
        .await?;
    Ok(Json(workspace.into()))
}

pub(crate) async fn delete_workspace_handler(
    Path(workspace_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let user = authenticate_rest_request(&state, &headers).await?;

    state
        .workspace_store
        .delete(&user.id, &WorkspaceId::from(workspace_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
