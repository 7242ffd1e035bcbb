pub mod fixed_window;
pub mod limiter;
pub mod middleware;

pub use fixed_window::{MemoryWindowStore, WindowHit, WindowStore};
pub use limiter::{FixedWindowLimiter, RateLimitResult};
pub use middleware::{client_ip, login_rate_limit, UNKNOWN_CLIENT};
