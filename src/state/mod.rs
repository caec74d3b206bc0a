pub mod models;
pub mod pool_database;

pub use models::{Pick, PointMultiplier, User};
pub use pool_database::{create_shared_pool_database, PoolDatabase, SharedPoolDatabase};
