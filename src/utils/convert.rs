use crate::errors::error::AppError;
use ethers_core::types::{H256, U256, U64};

pub fn h256_to_string(data: H256) -> String {
    // 0x + 64 位 hex
    format!("{:#x}", data)
}

pub fn option_u64_to_u64(opt: Option<U64>) -> Option<u64> {
    opt.map(|v| v.as_u64())
}

/// 限制列表条数，防止 i64 溢出
pub fn limit_to_i64(limit: usize) -> Result<i64, AppError> {
    i64::try_from(limit)
        .map_err(|e| AppError::Conversion(format!("limit({}) 转 i64 溢出: {}", limit, e)))
}

pub fn u256_to_u64(value: U256) -> Result<u64, AppError> {
    if value > U256::from(u64::MAX) {
        return Err(AppError::Conversion(format!(
            "U256({}) 超出u64范围（最大值: {}）",
            value,
            u64::MAX
        )));
    }
    Ok(value.as_u64())
}
