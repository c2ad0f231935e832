use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Foodcart API",
        version = "0.1.0",
        description = r#"
# Foodcart API

Backend for a food-ordering client: a menu of meals, star-rated reviews and a
per-user shopping cart.

## Authentication

Sign up with `POST /signup/`, then exchange credentials for a token with
`POST /signin/`. Send the token on every authenticated request:

```
Authorization: Bearer <your-jwt-token>
```

Menu and account administration require the `admin` role.

## Cart semantics

Adding a meal that is already in the cart replaces the line's quantity
(`201` when the line is created, `200` when it is overwritten). Setting a
line's quantity to `0` removes it.

## Error Handling

Errors carry a status matching their kind and a JSON body:

```json
{
  "error": "Not found: Meal 42 not found",
  "request_id": "9b2f7c61-3a3e-4d0e-9a52-1c1f0d1b6a10"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Sign-up and sign-in"),
        (name = "meals", description = "Menu catalog"),
        (name = "reviews", description = "Meal reviews and ratings"),
        (name = "cart", description = "Per-user shopping cart"),
        (name = "users", description = "Account administration"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::auth::sign_up,
        crate::handlers::auth::sign_in,

        crate::handlers::meals::list_meals,
        crate::handlers::meals::get_meal,
        crate::handlers::meals::create_meal,
        crate::handlers::meals::replace_meal,
        crate::handlers::meals::update_meal,
        crate::handlers::meals::delete_meal,

        crate::handlers::reviews::add_review,
        crate::handlers::reviews::update_review,
        crate::handlers::reviews::delete_review,

        crate::handlers::cart::get_cart,
        crate::handlers::cart::add_to_cart,
        crate::handlers::cart::update_cart_item,
        crate::handlers::cart::remove_cart_item,
        crate::handlers::cart::clear_cart,

        crate::handlers::users::list_users,
        crate::handlers::users::toggle_user_status,

        crate::health::health_check,
    ),
    components(
        schemas(
            crate::services::meals::MealView,
            crate::services::meals::ReviewView,
            crate::services::meals::NewMeal,
            crate::services::meals::MealPatch,
            crate::services::reviews::NewReview,
            crate::services::reviews::ReviewPatch,
            crate::services::cart::CartView,
            crate::services::cart::CartItemView,
            crate::services::cart::AddToCartInput,
            crate::services::cart::UpdateCartItemInput,
            crate::services::users::UserView,
            crate::services::users::SignUpInput,
            crate::services::users::SignInInput,
            crate::services::users::TokenResponse,
            crate::entities::Role,
            crate::health::HealthInfo,
            crate::health::HealthStatus,

            // Error types
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

/// Registers the `Bearer` scheme referenced by authenticated paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
