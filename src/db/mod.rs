pub mod pool;
pub mod schema;
pub mod seed;
pub mod users;

pub use pool::{create_pool, health_check, run_migrations};
pub use seed::{seed_from_file, SeedSummary};
pub use users::{PgUserStore, UserStore};
