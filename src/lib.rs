// IT helpdesk authentication gate

pub mod api;
pub mod audit;
pub mod auth;
pub mod authz;
pub mod config;
pub mod crypto;
pub mod db;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod rate_limit;
pub mod redis;
pub mod validation;

pub use config::Config;
pub use errors::{AppError, Result};
