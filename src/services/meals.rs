use crate::{
    entities::{cart_item, meal, review, user},
    errors::ServiceError,
    services::ratings,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, instrument};
use url::Url;
use utoipa::ToSchema;

const MAX_TITLE_LEN: usize = 200;
const MAX_IMAGEURL_LEN: usize = 200;

/// Prices are `DECIMAL(10, 2)`: eight integral digits at most.
fn max_price() -> Decimal {
    Decimal::new(100_000_000, 0)
}

/// A review as embedded in a meal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReviewView {
    pub id: i32,
    /// Id of the reviewing user
    pub user: i32,
    pub username: String,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// A meal with its reviews and computed rating aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MealView {
    pub id: i32,
    pub title: String,
    #[schema(value_type = String, example = "9.99")]
    pub price: Decimal,
    pub imageurl: String,
    pub reviews: Vec<ReviewView>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 4.5)]
    pub average_rating: Decimal,
    pub review_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a meal, also used for full replacement
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewMeal {
    #[schema(example = "Margherita")]
    pub title: String,
    #[schema(value_type = String, example = "9.99")]
    pub price: Decimal,
    #[schema(example = "https://images.example.com/margherita.jpg")]
    pub imageurl: String,
}

/// Partial meal update
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct MealPatch {
    pub title: Option<String>,
    #[schema(value_type = Option<String>, example = "10.50")]
    pub price: Option<Decimal>,
    pub imageurl: Option<String>,
}

impl From<NewMeal> for MealPatch {
    fn from(meal: NewMeal) -> Self {
        Self {
            title: Some(meal.title),
            price: Some(meal.price),
            imageurl: Some(meal.imageurl),
        }
    }
}

/// Normalizes a stored price to exactly two decimal places.
pub(crate) fn money(amount: Decimal) -> Decimal {
    let mut amount = amount.round_dp(2);
    amount.rescale(2);
    amount
}

pub fn validate_title(title: &str) -> Result<String, ServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ServiceError::ValidationError(
            "title must not be empty".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ServiceError::ValidationError(format!(
            "title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(title.to_string())
}

pub fn validate_price(price: Decimal) -> Result<Decimal, ServiceError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ServiceError::ValidationError(
            "price must not be negative".to_string(),
        ));
    }
    if price.normalize().scale() > 2 {
        return Err(ServiceError::ValidationError(
            "price must have at most 2 decimal places".to_string(),
        ));
    }
    if price >= max_price() {
        return Err(ServiceError::ValidationError(
            "price must have at most 10 digits".to_string(),
        ));
    }
    Ok(money(price))
}

pub fn validate_imageurl(imageurl: &str) -> Result<String, ServiceError> {
    let imageurl = imageurl.trim();
    if imageurl.chars().count() > MAX_IMAGEURL_LEN {
        return Err(ServiceError::ValidationError(format!(
            "imageurl must be at most {} characters",
            MAX_IMAGEURL_LEN
        )));
    }
    let parsed = Url::parse(imageurl)
        .map_err(|e| ServiceError::ValidationError(format!("imageurl is not a valid URL: {}", e)))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ServiceError::ValidationError(
            "imageurl must be an http or https URL".to_string(),
        ));
    }
    Ok(imageurl.to_string())
}

/// Builds views for `meals`, loading every review (and its author) in one query.
pub async fn load_meal_views<C>(
    conn: &C,
    meals: Vec<meal::Model>,
) -> Result<Vec<MealView>, ServiceError>
where
    C: ConnectionTrait,
{
    if meals.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = meals.iter().map(|m| m.id).collect();
    let rows = review::Entity::find()
        .filter(review::Column::MealId.is_in(ids))
        .find_also_related(user::Entity)
        .order_by_asc(review::Column::CreatedAt)
        .order_by_asc(review::Column::Id)
        .all(conn)
        .await?;

    let mut by_meal: HashMap<i32, Vec<ReviewView>> = HashMap::new();
    for (review, author) in rows {
        by_meal.entry(review.meal_id).or_default().push(ReviewView {
            id: review.id,
            user: review.user_id,
            username: author.map(|u| u.username).unwrap_or_default(),
            rating: review.rating,
            comment: review.comment,
            created_at: review.created_at,
        });
    }

    Ok(meals
        .into_iter()
        .map(|meal| {
            let reviews = by_meal.remove(&meal.id).unwrap_or_default();
            let summary = ratings::summarize(reviews.iter().map(|r| r.rating));
            MealView {
                id: meal.id,
                title: meal.title,
                price: money(meal.price),
                imageurl: meal.imageurl,
                reviews,
                average_rating: summary.average_rating,
                review_count: summary.review_count,
                created_at: meal.created_at,
                updated_at: meal.updated_at,
            }
        })
        .collect())
}

/// Loads a single meal view or fails with `NotFound`.
pub async fn load_meal_view<C>(conn: &C, meal_id: i32) -> Result<MealView, ServiceError>
where
    C: ConnectionTrait,
{
    let meal = find_meal(conn, meal_id).await?;
    load_meal_views(conn, vec![meal])
        .await?
        .pop()
        .ok_or_else(|| ServiceError::NotFound(format!("Meal {} not found", meal_id)))
}

pub(crate) async fn find_meal<C>(conn: &C, meal_id: i32) -> Result<meal::Model, ServiceError>
where
    C: ConnectionTrait,
{
    meal::Entity::find_by_id(meal_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Meal {} not found", meal_id)))
}

/// Menu catalog: public reads, admin writes.
#[derive(Clone)]
pub struct MealService {
    db: Arc<DatabaseConnection>,
}

impl MealService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Lists every meal, newest first.
    #[instrument(skip(self))]
    pub async fn list_meals(&self) -> Result<Vec<MealView>, ServiceError> {
        let meals = meal::Entity::find()
            .order_by_desc(meal::Column::CreatedAt)
            .order_by_desc(meal::Column::Id)
            .all(&*self.db)
            .await?;
        load_meal_views(&*self.db, meals).await
    }

    #[instrument(skip(self))]
    pub async fn get_meal(&self, meal_id: i32) -> Result<MealView, ServiceError> {
        load_meal_view(&*self.db, meal_id).await
    }

    #[instrument(skip(self))]
    pub async fn create_meal(&self, input: NewMeal) -> Result<MealView, ServiceError> {
        let title = validate_title(&input.title)?;
        let price = validate_price(input.price)?;
        let imageurl = validate_imageurl(&input.imageurl)?;
        let now = Utc::now();

        let meal = meal::ActiveModel {
            title: Set(title),
            price: Set(price),
            imageurl: Set(imageurl),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(meal_id = meal.id, "Created meal");
        load_meal_view(&*self.db, meal.id).await
    }

    /// Applies the fields present in `patch`; absent fields are left untouched.
    #[instrument(skip(self))]
    pub async fn update_meal(
        &self,
        meal_id: i32,
        patch: MealPatch,
    ) -> Result<MealView, ServiceError> {
        let meal = find_meal(&*self.db, meal_id).await?;
        let mut active: meal::ActiveModel = meal.into();

        if let Some(title) = patch.title.as_deref() {
            active.title = Set(validate_title(title)?);
        }
        if let Some(price) = patch.price {
            active.price = Set(validate_price(price)?);
        }
        if let Some(imageurl) = patch.imageurl.as_deref() {
            active.imageurl = Set(validate_imageurl(imageurl)?);
        }
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        info!(meal_id, "Updated meal");
        load_meal_view(&*self.db, meal_id).await
    }

    /// Deletes a meal together with its reviews and every cart line referencing it.
    #[instrument(skip(self))]
    pub async fn delete_meal(&self, meal_id: i32) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        find_meal(&txn, meal_id).await?;

        let reviews = review::Entity::delete_many()
            .filter(review::Column::MealId.eq(meal_id))
            .exec(&txn)
            .await?;
        let cart_lines = cart_item::Entity::delete_many()
            .filter(cart_item::Column::MealId.eq(meal_id))
            .exec(&txn)
            .await?;
        meal::Entity::delete_by_id(meal_id).exec(&txn).await?;

        txn.commit().await?;

        info!(
            meal_id,
            reviews_removed = reviews.rows_affected,
            cart_items_removed = cart_lines.rows_affected,
            "Deleted meal"
        );
        Ok(())
    }
}
