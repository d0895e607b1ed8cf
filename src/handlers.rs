pub mod auth;
pub mod categories;
pub mod expenses;
pub mod health;
pub mod index;
pub mod users;
