pub mod diesel;

pub use self::diesel::{AsyncDbPool, create_async_db_pool, init_schema};
