use crate::config::DatabaseConfig;
use crate::errors::error::AppError;
use crate::log_info;
use diesel_async::SimpleAsyncConnection;
use diesel_async::pg::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::Pool;
use std::time::Duration;

// 定义异步池类型
pub type AsyncDbPool = Pool<AsyncPgConnection>;

/// 建表语句，全部 IF NOT EXISTS，可重复执行
const SCHEMA_SQL: &str = include_str!("../../migrations/2024-03-01-000000_create_reports/up.sql");

pub async fn create_async_db_pool(config: &DatabaseConfig) -> Result<AsyncDbPool, AppError> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(config.connection_url());
    let pool = Pool::builder()
        .max_size(config.max_connections)
        .connection_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .build(manager)
        .await
        .map_err(|e| AppError::ConnectionPool(e.to_string()))?;

    Ok(pool)
}

/// 启动时确保两张表存在
pub async fn init_schema(pool: &AsyncDbPool) -> Result<(), AppError> {
    let mut conn = pool.get().await?;
    conn.batch_execute(SCHEMA_SQL).await?;
    log_info!("数据库表已就绪: patient_reports, published_reports");
    Ok(())
}
