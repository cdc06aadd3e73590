// services/settlement/gas/gas_policy.rs

use crate::config::SettlementConfig;
use ethers_core::types::U256;

/// 原生转账的 gas 价格策略（纯整数运算）
///
/// 价格 = max(floor, 网络报价 / divisor)。默认 floor = 1 gwei、divisor = 2：
/// 在网络报价的一半和下限之间取较大值。两个参数都可通过配置调整。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasPolicy {
    floor_gas_price: U256,
    network_price_divisor: U256,
}

impl Default for GasPolicy {
    fn default() -> Self {
        Self::new(U256::from(1_000_000_000u64), 2)
    }
}

impl GasPolicy {
    /// divisor 为 0 时按 1 处理（直接使用网络报价）
    pub fn new(floor_gas_price: U256, network_price_divisor: u64) -> Self {
        Self {
            floor_gas_price,
            network_price_divisor: U256::from(network_price_divisor.max(1)),
        }
    }

    pub fn from_config(config: &SettlementConfig) -> Self {
        Self::new(
            U256::from(config.floor_gas_price_wei),
            config.network_price_divisor,
        )
    }

    pub fn gas_price(&self, network_gas_price: U256) -> U256 {
        self.floor_gas_price
            .max(network_gas_price / self.network_price_divisor)
    }

    /// gas_limit × gas_price，溢出返回 None
    pub fn gas_cost(&self, gas_limit: U256, gas_price: U256) -> Option<U256> {
        gas_limit.checked_mul(gas_price)
    }
}
