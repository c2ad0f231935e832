use super::common::{created_response, success_response, AppJson};
use crate::{
    errors::ServiceError,
    services::users::{SignInInput, SignUpInput, TokenResponse, UserView},
    AppState,
};
use axum::{extract::State, response::Response, routing::post, Router};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup/", post(sign_up))
        .route("/signin/", post(sign_in))
}

/// Register a customer account
#[utoipa::path(
    post,
    path = "/signup/",
    tag = "auth",
    request_body = SignUpInput,
    responses(
        (status = 201, description = "Account created", body = UserView),
        (status = 400, description = "Invalid username, password or email", body = crate::errors::ErrorResponse),
        (status = 409, description = "Username or email already registered", body = crate::errors::ErrorResponse),
    )
)]
pub async fn sign_up(
    State(state): State<AppState>,
    AppJson(input): AppJson<SignUpInput>,
) -> Result<Response, ServiceError> {
    let user = state.services.users.sign_up(input).await?;
    Ok(created_response(user))
}

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/signin/",
    tag = "auth",
    request_body = SignInInput,
    responses(
        (status = 200, description = "Signed in", body = TokenResponse),
        (status = 400, description = "Malformed request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Invalid credentials or inactive account", body = crate::errors::ErrorResponse),
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    AppJson(input): AppJson<SignInInput>,
) -> Result<Response, ServiceError> {
    let token = state.services.users.sign_in(input).await?;
    Ok(success_response(token))
}
