pub mod client;
pub mod counters;
pub mod sessions;

pub use client::{create_client, health_check};
pub use counters::RedisWindowStore;
pub use sessions::RedisSessionStore;
