use super::common::{success_response, AppPath};
use crate::{
    auth::{AuthUser, Capability},
    errors::ServiceError,
    services::users::UserView,
    AppState,
};
use axum::{
    extract::State,
    response::Response,
    routing::{get, post},
    Router,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/", get(list_users))
        .route("/users/:id/toggle-status/", post(toggle_user_status))
}

/// List all accounts (admin)
#[utoipa::path(
    get,
    path = "/users/",
    tag = "users",
    responses(
        (status = 200, description = "All users ordered by id", body = [UserView]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    user.require(Capability::ManageUsers)?;
    let users = state.services.users.list_users().await?;
    Ok(success_response(users))
}

/// Activate or deactivate an account (admin)
#[utoipa::path(
    post,
    path = "/users/{id}/toggle-status/",
    tag = "users",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "Status flipped", body = UserView),
        (status = 400, description = "Attempt to change one's own status", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn toggle_user_status(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(user_id): AppPath<i32>,
) -> Result<Response, ServiceError> {
    user.require(Capability::ManageUsers)?;
    let updated = state
        .services
        .users
        .toggle_user_status(user.user_id, user_id)
        .await?;
    Ok(success_response(updated))
}
