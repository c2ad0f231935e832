use crate::{
    entities::review,
    errors::ServiceError,
    services::meals::{find_meal, load_meal_view, MealView},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewReview {
    #[schema(minimum = 1, maximum = 5, example = 5)]
    pub rating: i32,
    #[schema(example = "Crispy crust, would order again")]
    pub comment: String,
}

/// Partial review update
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReviewPatch {
    #[schema(minimum = 1, maximum = 5)]
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

pub fn validate_rating(rating: i32) -> Result<i32, ServiceError> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ServiceError::ValidationError(format!(
            "rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        )));
    }
    Ok(rating)
}

/// Returns the trimmed comment, rejecting blank ones.
pub fn validate_comment(comment: &str) -> Result<String, ServiceError> {
    let comment = comment.trim();
    if comment.is_empty() {
        return Err(ServiceError::ValidationError(
            "comment must not be empty".to_string(),
        ));
    }
    Ok(comment.to_string())
}

/// Star ratings and comments on meals.
///
/// Every mutation answers with the meal as it stands after the commit, so the
/// caller sees the recomputed average and count.
#[derive(Clone)]
pub struct ReviewService {
    db: Arc<DatabaseConnection>,
}

impl ReviewService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Adds `user_id`'s review of a meal. A user reviews a meal at most once.
    #[instrument(skip(self, input), fields(rating = input.rating))]
    pub async fn add_review(
        &self,
        meal_id: i32,
        user_id: i32,
        input: NewReview,
    ) -> Result<MealView, ServiceError> {
        let txn = self.db.begin().await?;

        find_meal(&txn, meal_id).await?;
        let rating = validate_rating(input.rating)?;
        let comment = validate_comment(&input.comment)?;

        let existing = review::Entity::find()
            .filter(review::Column::MealId.eq(meal_id))
            .filter(review::Column::UserId.eq(user_id))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(duplicate_review());
        }

        let inserted = review::ActiveModel {
            meal_id: Set(meal_id),
            user_id: Set(user_id),
            rating: Set(rating),
            comment: Set(comment),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| insert_error(ServiceError::from(e), meal_id, user_id))?;

        txn.commit().await?;

        info!(meal_id, user_id, review_id = inserted.id, "Added review");
        load_meal_view(&*self.db, meal_id).await
    }

    /// Updates a review owned by `user_id`. Reviews of other users are not found.
    #[instrument(skip(self))]
    pub async fn update_review(
        &self,
        meal_id: i32,
        review_id: i32,
        user_id: i32,
        patch: ReviewPatch,
    ) -> Result<MealView, ServiceError> {
        let existing = self.find_owned(meal_id, review_id, user_id).await?;

        let mut active: review::ActiveModel = existing.into();
        if let Some(rating) = patch.rating {
            active.rating = Set(validate_rating(rating)?);
        }
        if let Some(comment) = patch.comment.as_deref() {
            active.comment = Set(validate_comment(comment)?);
        }
        active.update(&*self.db).await?;

        info!(meal_id, review_id, user_id, "Updated review");
        load_meal_view(&*self.db, meal_id).await
    }

    /// Deletes a review owned by `user_id`.
    #[instrument(skip(self))]
    pub async fn delete_review(
        &self,
        meal_id: i32,
        review_id: i32,
        user_id: i32,
    ) -> Result<MealView, ServiceError> {
        let result = review::Entity::delete_many()
            .filter(review::Column::Id.eq(review_id))
            .filter(review::Column::MealId.eq(meal_id))
            .filter(review::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(review_not_found(review_id));
        }

        info!(meal_id, review_id, user_id, "Deleted review");
        load_meal_view(&*self.db, meal_id).await
    }

    async fn find_owned(
        &self,
        meal_id: i32,
        review_id: i32,
        user_id: i32,
    ) -> Result<review::Model, ServiceError> {
        review::Entity::find_by_id(review_id)
            .filter(review::Column::MealId.eq(meal_id))
            .filter(review::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| review_not_found(review_id))
    }
}

/// The unique `(meal, user)` index rejects a review that lost the create race.
fn insert_error(err: ServiceError, meal_id: i32, user_id: i32) -> ServiceError {
    if err.is_unique_violation() {
        warn!(meal_id, user_id, "Concurrent duplicate review rejected by store");
        return duplicate_review();
    }
    err
}

fn duplicate_review() -> ServiceError {
    ServiceError::DuplicateReview("You have already reviewed this meal".to_string())
}

fn review_not_found(review_id: i32) -> ServiceError {
    ServiceError::NotFound(format!("Review {} not found", review_id))
}
