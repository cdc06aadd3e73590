use crate::database::AsyncDbPool;
use crate::errors::error::AppError;
use diesel::result::Error as DieselError;
use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::bb8::PooledConnection;

// 各仓储共用的连接池与错误映射
#[derive(Clone)]
pub struct RepositoryBase {
    pool: AsyncDbPool,
}

impl RepositoryBase {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    pub async fn get_connection(&self) -> Result<PooledConnection<'_, AsyncPgConnection>, AppError> {
        Ok(self.pool.get().await?)
    }

    /// 转换 Diesel 查询错误（统一映射为 Error::DatabaseQuery）
    /// 唯一约束冲突单独转为 Conflict
    pub fn map_diesel_error(&self, e: DieselError) -> AppError {
        map_diesel_error(e)
    }
}

pub fn map_diesel_error(e: DieselError) -> AppError {
    match e {
        DieselError::NotFound => AppError::NotFound("Resource not found in database".to_string()),
        DieselError::DatabaseError(diesel::result::DatabaseErrorKind::UniqueViolation, info) => {
            AppError::Conflict(format!(
                "Unique constraint violation: table={}, constraint={}, detail={}",
                info.table_name().unwrap_or("unknown"),
                info.constraint_name().unwrap_or("unknown"),
                info.details().unwrap_or("no detail")
            ))
        }
        DieselError::DatabaseError(diesel::result::DatabaseErrorKind::ForeignKeyViolation, info) => {
            AppError::NotFound(format!(
                "Referenced row does not exist: {}",
                info.details().unwrap_or(info.message())
            ))
        }
        _ => AppError::DatabaseQuery(e),
    }
}
