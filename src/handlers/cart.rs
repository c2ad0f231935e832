use super::common::{created_response, no_content_response, success_response, AppJson, AppPath};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::cart::{AddToCartInput, CartItemUpdate, CartItemView, CartView, UpdateCartItemInput},
    AppState,
};
use axum::{
    extract::State,
    response::Response,
    routing::{delete, get, post, put},
    Router,
};

/// Creates the router for cart endpoints
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart/", get(get_cart))
        .route("/cart/add/", post(add_to_cart))
        .route("/cart/item/:id/", put(update_cart_item))
        .route("/cart/item/:id/remove/", delete(remove_cart_item))
        .route("/cart/clear/", post(clear_cart))
}

/// Get the caller's cart
#[utoipa::path(
    get,
    path = "/cart/",
    tag = "cart",
    responses(
        (status = 200, description = "Cart lines and total", body = CartView),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let cart = state.services.cart.get_cart(user.user_id).await?;
    Ok(success_response(cart))
}

/// Put a meal in the cart, overwriting the quantity of an existing line
#[utoipa::path(
    post,
    path = "/cart/add/",
    tag = "cart",
    request_body = AddToCartInput,
    responses(
        (status = 201, description = "Line created", body = CartItemView),
        (status = 200, description = "Existing line's quantity replaced", body = CartItemView),
        (status = 400, description = "Invalid quantity", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Meal not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(input): AppJson<AddToCartInput>,
) -> Result<Response, ServiceError> {
    let added = state.services.cart.add_to_cart(user.user_id, input).await?;
    Ok(if added.created {
        created_response(added.item)
    } else {
        success_response(added.item)
    })
}

/// Set a line's quantity; zero removes it
#[utoipa::path(
    put,
    path = "/cart/item/{id}/",
    tag = "cart",
    params(("id" = i32, Path, description = "Cart item id")),
    request_body = UpdateCartItemInput,
    responses(
        (status = 200, description = "Quantity updated", body = CartItemView),
        (status = 204, description = "Line removed"),
        (status = 400, description = "Negative quantity", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart item not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(item_id): AppPath<i32>,
    AppJson(input): AppJson<UpdateCartItemInput>,
) -> Result<Response, ServiceError> {
    let outcome = state
        .services
        .cart
        .update_cart_item(user.user_id, item_id, input.quantity)
        .await?;
    Ok(match outcome {
        CartItemUpdate::Updated(item) => success_response(item),
        CartItemUpdate::Removed => no_content_response(),
    })
}

#[utoipa::path(
    delete,
    path = "/cart/item/{id}/remove/",
    tag = "cart",
    params(("id" = i32, Path, description = "Cart item id")),
    responses(
        (status = 204, description = "Line removed"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart item not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn remove_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(item_id): AppPath<i32>,
) -> Result<Response, ServiceError> {
    state.services.cart.remove_item(user.user_id, item_id).await?;
    Ok(no_content_response())
}

#[utoipa::path(
    post,
    path = "/cart/clear/",
    tag = "cart",
    responses(
        (status = 204, description = "Cart emptied"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    state.services.cart.clear_cart(user.user_id).await?;
    Ok(no_content_response())
}
