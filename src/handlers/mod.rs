pub mod auth;
pub mod cart;
pub mod common;
pub mod meals;
pub mod reviews;
pub mod users;

pub use crate::AppState;
