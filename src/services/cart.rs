use crate::{
    entities::{cart_item, meal},
    errors::ServiceError,
    services::meals::{find_meal, load_meal_view, load_meal_views, MealView},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

/// A cart line with its meal snapshot and computed line total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartItemView {
    pub id: i32,
    pub meal: MealView,
    pub quantity: i32,
    /// `meal.price × quantity`
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 19.98)]
    pub total_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 19.98)]
    pub total_amount: Decimal,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddToCartInput {
    pub meal_id: i32,
    #[serde(default = "default_quantity")]
    #[schema(minimum = 1, default = 1)]
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateCartItemInput {
    /// New quantity; `0` removes the line
    #[schema(minimum = 0)]
    pub quantity: i32,
}

/// Result of adding a meal to the cart
#[derive(Debug, Clone)]
pub struct AddedToCart {
    pub item: CartItemView,
    /// `false` when an existing line was overwritten
    pub created: bool,
}

#[derive(Debug, Clone)]
pub enum CartItemUpdate {
    Updated(CartItemView),
    Removed,
}

fn line_total(meal: &MealView, quantity: i32) -> Decimal {
    meal.price * Decimal::from(quantity)
}

async fn item_view<C>(conn: &C, item: cart_item::Model) -> Result<CartItemView, ServiceError>
where
    C: ConnectionTrait,
{
    let meal = load_meal_view(conn, item.meal_id).await?;
    Ok(CartItemView {
        id: item.id,
        total_price: line_total(&meal, item.quantity),
        quantity: item.quantity,
        meal,
    })
}

/// Per-user shopping cart.
///
/// A cart holds at most one line per meal. Adding a meal that is already in
/// the cart replaces the line's quantity instead of accumulating it.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Returns the user's cart with totals recomputed from current prices.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: i32) -> Result<CartView, ServiceError> {
        let items = cart_item::Entity::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .order_by_asc(cart_item::Column::Id)
            .all(&*self.db)
            .await?;

        let meal_ids: Vec<i32> = items.iter().map(|i| i.meal_id).collect();
        let meals = if meal_ids.is_empty() {
            Vec::new()
        } else {
            meal::Entity::find()
                .filter(meal::Column::Id.is_in(meal_ids))
                .all(&*self.db)
                .await?
        };
        let mut meals: HashMap<i32, MealView> = load_meal_views(&*self.db, meals)
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();

        let mut views = Vec::with_capacity(items.len());
        for item in items {
            // Meal deleted between the two reads
            let Some(meal) = meals.remove(&item.meal_id) else {
                continue;
            };
            views.push(CartItemView {
                id: item.id,
                total_price: line_total(&meal, item.quantity),
                quantity: item.quantity,
                meal,
            });
        }

        let total_amount = views.iter().map(|v| v.total_price).sum();
        Ok(CartView {
            items: views,
            total_amount,
        })
    }

    /// Puts `quantity` of a meal in the cart, replacing any existing quantity.
    #[instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        user_id: i32,
        input: AddToCartInput,
    ) -> Result<AddedToCart, ServiceError> {
        if input.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "quantity must be at least 1".to_string(),
            ));
        }
        find_meal(&*self.db, input.meal_id).await?;

        if let Some(existing) = self.find_line(user_id, input.meal_id).await? {
            let item = self.overwrite(existing, input.quantity).await?;
            return Ok(AddedToCart {
                item,
                created: false,
            });
        }

        let now = Utc::now();
        let inserted = cart_item::ActiveModel {
            user_id: Set(user_id),
            meal_id: Set(input.meal_id),
            quantity: Set(input.quantity),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await;

        match inserted {
            Ok(created) => {
                info!(
                    user_id,
                    meal_id = input.meal_id,
                    quantity = input.quantity,
                    "Added meal to cart"
                );
                Ok(AddedToCart {
                    item: item_view(&*self.db, created).await?,
                    created: true,
                })
            }
            Err(e) => {
                self.resolve_failed_create(user_id, &input, ServiceError::from(e))
                    .await
            }
        }
    }

    /// Sets a line's quantity; `0` removes the line.
    #[instrument(skip(self))]
    pub async fn update_cart_item(
        &self,
        user_id: i32,
        item_id: i32,
        quantity: i32,
    ) -> Result<CartItemUpdate, ServiceError> {
        if quantity < 0 {
            return Err(ServiceError::ValidationError(
                "quantity must not be negative".to_string(),
            ));
        }

        if quantity == 0 {
            let result = cart_item::Entity::delete_many()
                .filter(cart_item::Column::Id.eq(item_id))
                .filter(cart_item::Column::UserId.eq(user_id))
                .exec(&*self.db)
                .await?;
            info!(
                user_id,
                item_id,
                removed = result.rows_affected,
                "Removed cart item via zero quantity"
            );
            return Ok(CartItemUpdate::Removed);
        }

        let existing = self.find_owned(user_id, item_id).await?;
        let item = self.overwrite(existing, quantity).await?;
        Ok(CartItemUpdate::Updated(item))
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: i32, item_id: i32) -> Result<(), ServiceError> {
        let result = cart_item::Entity::delete_many()
            .filter(cart_item::Column::Id.eq(item_id))
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(item_not_found(item_id));
        }

        info!(user_id, item_id, "Removed cart item");
        Ok(())
    }

    /// Empties the cart, returning the number of removed lines.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: i32) -> Result<u64, ServiceError> {
        let result = cart_item::Entity::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;

        info!(user_id, removed = result.rows_affected, "Cleared cart");
        Ok(result.rows_affected)
    }

    async fn find_line(
        &self,
        user_id: i32,
        meal_id: i32,
    ) -> Result<Option<cart_item::Model>, ServiceError> {
        Ok(cart_item::Entity::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::MealId.eq(meal_id))
            .one(&*self.db)
            .await?)
    }

    async fn find_owned(
        &self,
        user_id: i32,
        item_id: i32,
    ) -> Result<cart_item::Model, ServiceError> {
        cart_item::Entity::find_by_id(item_id)
            .filter(cart_item::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| item_not_found(item_id))
    }

    /// A create that lost the `(user, meal)` race overwrites the winner's line.
    async fn resolve_failed_create(
        &self,
        user_id: i32,
        input: &AddToCartInput,
        err: ServiceError,
    ) -> Result<AddedToCart, ServiceError> {
        if !err.is_unique_violation() {
            return Err(err);
        }
        warn!(user_id, meal_id = input.meal_id, "Cart line created concurrently");
        let existing = self
            .find_line(user_id, input.meal_id)
            .await?
            .ok_or(err)?;
        let item = self.overwrite(existing, input.quantity).await?;
        Ok(AddedToCart {
            item,
            created: false,
        })
    }

    async fn overwrite(
        &self,
        existing: cart_item::Model,
        quantity: i32,
    ) -> Result<CartItemView, ServiceError> {
        let (user_id, item_id, previous) = (existing.user_id, existing.id, existing.quantity);

        let mut active: cart_item::ActiveModel = existing.into();
        active.quantity = Set(quantity);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        info!(user_id, item_id, previous, quantity, "Set cart item quantity");
        item_view(&*self.db, updated).await
    }
}

fn item_not_found(item_id: i32) -> ServiceError {
    ServiceError::NotFound(format!("Cart item {} not found", item_id))
}
