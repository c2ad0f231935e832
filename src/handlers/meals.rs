use super::common::{created_response, no_content_response, success_response, AppJson, AppPath};
use crate::{
    auth::{AuthUser, Capability},
    errors::ServiceError,
    services::meals::{MealPatch, MealView, NewMeal},
    AppState,
};
use axum::{extract::State, response::Response, routing::get, Router};

pub fn meal_routes() -> Router<AppState> {
    Router::new()
        .route("/meals/", get(list_meals).post(create_meal))
        .route(
            "/meals/:id/",
            get(get_meal)
                .put(replace_meal)
                .patch(update_meal)
                .delete(delete_meal),
        )
}

/// List every meal, newest first
#[utoipa::path(
    get,
    path = "/meals/",
    tag = "meals",
    responses(
        (status = 200, description = "All meals with reviews and rating aggregates", body = [MealView]),
    )
)]
pub async fn list_meals(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let meals = state.services.meals.list_meals().await?;
    Ok(success_response(meals))
}

#[utoipa::path(
    get,
    path = "/meals/{id}/",
    tag = "meals",
    params(("id" = i32, Path, description = "Meal id")),
    responses(
        (status = 200, description = "Meal found", body = MealView),
        (status = 404, description = "Meal not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_meal(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Response, ServiceError> {
    let meal = state.services.meals.get_meal(id).await?;
    Ok(success_response(meal))
}

/// Add a meal to the menu (admin)
#[utoipa::path(
    post,
    path = "/meals/",
    tag = "meals",
    request_body = NewMeal,
    responses(
        (status = 201, description = "Meal created", body = MealView),
        (status = 400, description = "Invalid meal", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_meal(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(input): AppJson<NewMeal>,
) -> Result<Response, ServiceError> {
    user.require(Capability::ManageMeals)?;
    let meal = state.services.meals.create_meal(input).await?;
    Ok(created_response(meal))
}

/// Replace every field of a meal (admin)
#[utoipa::path(
    put,
    path = "/meals/{id}/",
    tag = "meals",
    params(("id" = i32, Path, description = "Meal id")),
    request_body = NewMeal,
    responses(
        (status = 200, description = "Meal updated", body = MealView),
        (status = 400, description = "Invalid meal", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Meal not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn replace_meal(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<i32>,
    AppJson(input): AppJson<NewMeal>,
) -> Result<Response, ServiceError> {
    user.require(Capability::ManageMeals)?;
    let meal = state.services.meals.update_meal(id, input.into()).await?;
    Ok(success_response(meal))
}

/// Update some fields of a meal (admin)
#[utoipa::path(
    patch,
    path = "/meals/{id}/",
    tag = "meals",
    params(("id" = i32, Path, description = "Meal id")),
    request_body = MealPatch,
    responses(
        (status = 200, description = "Meal updated", body = MealView),
        (status = 400, description = "Invalid meal", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Meal not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_meal(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<i32>,
    AppJson(patch): AppJson<MealPatch>,
) -> Result<Response, ServiceError> {
    user.require(Capability::ManageMeals)?;
    let meal = state.services.meals.update_meal(id, patch).await?;
    Ok(success_response(meal))
}

/// Delete a meal with its reviews and cart lines (admin)
#[utoipa::path(
    delete,
    path = "/meals/{id}/",
    tag = "meals",
    params(("id" = i32, Path, description = "Meal id")),
    responses(
        (status = 204, description = "Meal deleted"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Meal not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_meal(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<i32>,
) -> Result<Response, ServiceError> {
    user.require(Capability::ManageMeals)?;
    state.services.meals.delete_meal(id).await?;
    Ok(no_content_response())
}
