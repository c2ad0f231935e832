pub mod cart_item;
pub mod meal;
pub mod review;
pub mod user;

pub use user::Role;
