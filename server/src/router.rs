// Router configuration

use axum::{
    Router,
    http::Method,
    routing::{get, patch, post},
};
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{
        health_handlers::*, member_handlers::*, notification_handlers::*, user_handlers::*,
        workspace_handlers::*,
    },
    observability,
    state::AppState,
};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    Router::new()
        // Health & Info
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        // Users
        .route(
            "/users",
            post(register_user_handler).get(search_users_handler),
        )
        .route("/users/me", get(current_user_handler))
        .route(
            "/users/me/subscription",
            patch(update_subscription_handler),
        )
        // Workspaces
        .route(
            "/workspaces",
            post(create_workspace_handler).get(list_my_workspaces_handler),
        )
        .route(
            "/workspaces/{workspace_id}",
            get(get_workspace_handler)
                .patch(update_workspace_handler)
                .delete(delete_workspace_handler),
        )
        .route(
            "/workspaces/{workspace_id}/plan",
            patch(update_workspace_plan_handler),
        )
        // Members. POST takes a user id, PATCH and DELETE take a member id.
        .route(
            "/workspaces/{workspace_id}/members",
            get(list_members_handler),
        )
        .route(
            "/workspaces/{workspace_id}/members/{id}",
            post(add_member_handler)
                .patch(update_member_role_handler)
                .delete(remove_member_handler),
        )
        // Notifications
        .route("/notifications", get(list_notifications_handler))
        .route(
            "/notifications/read-all",
            post(mark_all_notifications_read_handler),
        )
        .route(
            "/notifications/{notification_id}/read",
            post(mark_notification_read_handler),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(observability::http_make_span())
                .on_response(observability::response_logger()),
        )
        .layer(cors)
        .layer(observability::request_context_layer())
        .with_state(state)
}
