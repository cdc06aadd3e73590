use crate::utils::format::format_ether;
use ethers_core::types::{H256, U256};
use thiserror::Error;

/// 链上结算失败的类型。除 `ConfirmationTimeout` 外都是确定性结果。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettlementError {
    #[error("No private key configured for payments")]
    NoSigningKey,

    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(String),

    #[error("Invalid payment amount: {0}")]
    InvalidAmount(String),

    /// 广播前的链上读取失败，没有任何交易被发送
    #[error("Chain query failed before any transfer was sent: {0}")]
    ChainQuery(String),

    #[error("Insufficient ETH. {}", describe_shortfall(.required, .available))]
    InsufficientFunds { required: U256, available: U256 },

    #[error("Signing failed: {0}")]
    Signing(String),

    /// 签名结果不是预期的交易信封（签名库版本不匹配）
    #[error("Unsupported signing client version: {0}")]
    UnsupportedClientVersion(String),

    #[error("Transfer rejected by the network: {0}")]
    BroadcastRejected(String),

    #[error(
        "Payment outcome unknown: transaction {hash:#x} was broadcast but not confirmed within {waited_secs}s. \
         Check its status by transaction hash before trying again; do not resubmit the payment."
    )]
    ConfirmationTimeout { hash: H256, waited_secs: u64 },

    #[error("Transaction {hash:#x} reverted on-chain (block {})", describe_block(.block_number))]
    TransactionReverted { hash: H256, block_number: Option<u64> },
}

fn describe_shortfall(required: &U256, available: &U256) -> String {
    format!(
        "Need {} ETH, have {} ETH (short {} ETH)",
        format_ether(*required),
        format_ether(*available),
        format_ether(required.saturating_sub(*available))
    )
}

fn describe_block(block_number: &Option<u64>) -> String {
    block_number
        .map(|b| b.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

impl SettlementError {
    /// 已广播但未观察到回执：转账仍可能上链
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, SettlementError::ConfirmationTimeout { .. })
    }

    pub fn shortfall(&self) -> Option<U256> {
        match self {
            SettlementError::InsufficientFunds { required, available } => {
                Some(required.saturating_sub(*available))
            }
            _ => None,
        }
    }

    /// 相关交易哈希（仅广播之后的错误才有）
    pub fn tx_hash(&self) -> Option<H256> {
        match self {
            SettlementError::ConfirmationTimeout { hash, .. }
            | SettlementError::TransactionReverted { hash, .. } => Some(*hash),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_funds_reports_shortfall() {
        let err = SettlementError::InsufficientFunds {
            required: U256::from(1_021_000_000_000_000u64),
            available: U256::from(1_000_000_000_000_000u64),
        };
        assert_eq!(err.shortfall(), Some(U256::from(21_000_000_000_000u64)));
        let msg = err.to_string();
        assert!(msg.contains("Need 0.001021 ETH"), "{msg}");
        assert!(msg.contains("have 0.001000 ETH"), "{msg}");
        assert!(msg.contains("short 0.000021 ETH"), "{msg}");
    }

    #[test]
    fn only_timeout_is_indeterminate() {
        let hash = H256::repeat_byte(0xab);
        let timeout = SettlementError::ConfirmationTimeout {
            hash,
            waited_secs: 120,
        };
        assert!(timeout.is_indeterminate());
        assert_eq!(timeout.tx_hash(), Some(hash));
        assert!(timeout.to_string().contains("do not resubmit"));

        let reverted = SettlementError::TransactionReverted {
            hash,
            block_number: Some(42),
        };
        assert!(!reverted.is_indeterminate());
        assert!(reverted.to_string().contains("block 42"));
        assert!(!SettlementError::BroadcastRejected("nonce too low".into()).is_indeterminate());
    }
}
