use crate::errors::error::AppError;
use bigdecimal::BigDecimal;
use ethers_core::types::U256;
use std::str::FromStr;

/// 1 ETH = 10^18 wei
const WEI_DECIMALS: i64 = 18;
/// 展示给用户的小数位
const DISPLAY_SCALE: i64 = 6;

/// 将U256 转成 BigDecimal
pub fn u256_to_bigdecimal(value: U256) -> BigDecimal {
    // 先转字符串再转 BigDecimal (处理大数最稳)
    let s = value.to_string();
    BigDecimal::from_str(&s).unwrap_or_else(|_| BigDecimal::from(0))
}

/// wei → "0.001021" 形式，截断到 6 位小数（纯整数运算）
pub fn format_ether(value: U256) -> String {
    let one_eth = U256::exp10(WEI_DECIMALS as usize);
    let unit = U256::exp10((WEI_DECIMALS - DISPLAY_SCALE) as usize);
    let whole = value / one_eth;
    let frac = (value % one_eth) / unit;
    format!("{}.{:0width$}", whole, frac.as_u64(), width = DISPLAY_SCALE as usize)
}

/// BigDecimal 价格 → 不带多余 0 的 ETH 字符串（"0.001"），数据库 NUMERIC(36,18) 读回也一致
pub fn display_eth(amount: &BigDecimal) -> String {
    let Ok(wei) = eth_to_wei(amount) else {
        return amount.to_string();
    };
    let one_eth = U256::exp10(WEI_DECIMALS as usize);
    let whole = wei / one_eth;
    let frac = format!("{:0>width$}", (wei % one_eth).to_string(), width = WEI_DECIMALS as usize);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, frac)
    }
}

/// ETH（展示单位）→ wei。不足 1 wei 的部分直接截断。
pub fn eth_to_wei(amount: &BigDecimal) -> Result<U256, AppError> {
    let scaled = (amount * u256_to_bigdecimal(U256::exp10(WEI_DECIMALS as usize))).with_scale(0);
    if scaled < BigDecimal::from(0) {
        return Err(AppError::Conversion(format!(
            "negative amount {} cannot be converted to wei",
            amount
        )));
    }
    // scale 为 0 时 bigint 即整数 wei
    let (digits, _) = scaled.into_bigint_and_exponent();
    U256::from_dec_str(&digits.to_string())
        .map_err(|e| AppError::Conversion(format!("amount {} 转 wei 失败: {}", amount, e)))
}
