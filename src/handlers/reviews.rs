use super::common::{success_response, AppJson, AppPath};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::{
        meals::MealView,
        reviews::{NewReview, ReviewPatch},
    },
    AppState,
};
use axum::{
    extract::State,
    response::Response,
    routing::{delete, post, put},
    Router,
};

pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/meals/:id/reviews/", post(add_review))
        .route("/meals/:id/reviews/:review_id/", put(update_review))
        .route("/meals/:id/reviews/:review_id/delete/", delete(delete_review))
}

/// Review a meal; answers with the meal's updated aggregate
#[utoipa::path(
    post,
    path = "/meals/{id}/reviews/",
    tag = "reviews",
    params(("id" = i32, Path, description = "Meal id")),
    request_body = NewReview,
    responses(
        (status = 200, description = "Review added", body = MealView),
        (status = 400, description = "Invalid review, or the meal was already reviewed by this user", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Meal not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn add_review(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(meal_id): AppPath<i32>,
    AppJson(input): AppJson<NewReview>,
) -> Result<Response, ServiceError> {
    let meal = state
        .services
        .reviews
        .add_review(meal_id, user.user_id, input)
        .await?;
    Ok(success_response(meal))
}

/// Update one's own review
#[utoipa::path(
    put,
    path = "/meals/{id}/reviews/{review_id}/",
    tag = "reviews",
    params(
        ("id" = i32, Path, description = "Meal id"),
        ("review_id" = i32, Path, description = "Review id"),
    ),
    request_body = ReviewPatch,
    responses(
        (status = 200, description = "Review updated", body = MealView),
        (status = 400, description = "Invalid review", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "No such review by this user", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_review(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath((meal_id, review_id)): AppPath<(i32, i32)>,
    AppJson(patch): AppJson<ReviewPatch>,
) -> Result<Response, ServiceError> {
    let meal = state
        .services
        .reviews
        .update_review(meal_id, review_id, user.user_id, patch)
        .await?;
    Ok(success_response(meal))
}

/// Delete one's own review
#[utoipa::path(
    delete,
    path = "/meals/{id}/reviews/{review_id}/delete/",
    tag = "reviews",
    params(
        ("id" = i32, Path, description = "Meal id"),
        ("review_id" = i32, Path, description = "Review id"),
    ),
    responses(
        (status = 200, description = "Review deleted", body = MealView),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "No such review by this user", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_review(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath((meal_id, review_id)): AppPath<(i32, i32)>,
) -> Result<Response, ServiceError> {
    let meal = state
        .services
        .reviews
        .delete_review(meal_id, review_id, user.user_id)
        .await?;
    Ok(success_response(meal))
}
