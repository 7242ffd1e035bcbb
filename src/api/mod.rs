pub mod admin;
pub mod auth;
pub mod cookies;
pub mod dashboard;
pub mod extract;
pub mod flash;
pub mod health;
pub mod routes;
pub mod views;

pub use routes::{create_router, AppState};
