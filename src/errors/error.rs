use crate::errors::settlement::SettlementError;
use diesel::result::Error as DieselError;
use ethers_providers::ProviderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // 捕获所有 SQL 执行、ORM 映射错误等。
    #[error("Database query error: {0}")]
    DatabaseQuery(#[from] DieselError),

    // 从连接池获取连接失败
    #[error("Database connection pool error: {0}")]
    ConnectionPool(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// 类型转换错误（BigDecimal→wei、U256→i64 等）
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// 业务逻辑冲突（重复插入、状态异常）
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 资源未找到
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// 链上 RPC 错误，保留节点返回的原始文本
    #[error("{0}")]
    Provider(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// LLM 接口调用失败
    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error(transparent)]
    Settlement(#[from] SettlementError),
}

impl AppError {
    /// 结算结果未知（已广播但未确认），不能当作失败处理
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, AppError::Settlement(e) if e.is_indeterminate())
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        AppError::Provider(err.to_string())
    }
}

impl From<bb8::RunError<diesel_async::pooled_connection::PoolError>> for AppError {
    fn from(err: bb8::RunError<diesel_async::pooled_connection::PoolError>) -> Self {
        AppError::ConnectionPool(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Llm(err.to_string())
    }
}
