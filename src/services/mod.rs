//! Domain services. Each service owns a handle to the shared connection pool
//! and returns [`ServiceError`](crate::errors::ServiceError) on failure.

pub mod cart;
pub mod meals;
pub mod ratings;
pub mod reviews;
pub mod users;

use crate::{auth::AuthService, db::DbPool};
use std::sync::Arc;

/// Service container shared by every handler
#[derive(Clone)]
pub struct AppServices {
    pub meals: Arc<meals::MealService>,
    pub reviews: Arc<reviews::ReviewService>,
    pub cart: Arc<cart::CartService>,
    pub users: Arc<users::UserService>,
    pub auth: Arc<AuthService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, auth: Arc<AuthService>) -> Self {
        Self {
            meals: Arc::new(meals::MealService::new(db.clone())),
            reviews: Arc::new(reviews::ReviewService::new(db.clone())),
            cart: Arc::new(cart::CartService::new(db.clone())),
            users: Arc::new(users::UserService::new(db, auth.clone())),
            auth,
        }
    }
}
