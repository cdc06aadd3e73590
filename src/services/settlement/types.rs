// services/settlement/types.rs

use crate::errors::settlement::SettlementError;
use crate::infrastructure::provider::ChainClient;
use crate::services::settlement::signer::TxSigner;
use crate::utils::check::parse_address;
use crate::utils::convert::option_u64_to_u64;
use crate::utils::format::eth_to_wei;
use bigdecimal::BigDecimal;
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address, Bytes, H256, Signature, TransactionReceipt, U256};
use std::sync::Arc;

pub type TransactionHash = H256;

/// 进程启动时构建一次，按引用传给结算执行器
#[derive(Clone)]
pub struct SettlementContext {
    pub chain: Arc<dyn ChainClient>,
    pub signer: Option<Arc<dyn TxSigner>>,
}

impl SettlementContext {
    pub fn new(chain: Arc<dyn ChainClient>, signer: Option<Arc<dyn TxSigner>>) -> Self {
        Self { chain, signer }
    }

    pub fn signer(&self) -> Option<&Arc<dyn TxSigner>> {
        self.signer.as_ref()
    }

    pub fn sender(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }
}

/// 一次购买的支付请求，不落库
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementRequest {
    pub recipient: Address,
    /// ETH（展示单位）
    pub amount: BigDecimal,
    /// 换算后的 wei，恒大于 0
    pub value: U256,
}

impl SettlementRequest {
    pub fn new(recipient: &str, amount: &BigDecimal) -> Result<Self, SettlementError> {
        let recipient = parse_address(recipient)
            .map_err(|_| SettlementError::InvalidRecipient(recipient.to_string()))?;
        let value =
            eth_to_wei(amount).map_err(|e| SettlementError::InvalidAmount(e.to_string()))?;
        if value.is_zero() {
            return Err(SettlementError::InvalidAmount(format!(
                "{} ETH is not a positive amount of wei",
                amount
            )));
        }
        Ok(Self {
            recipient,
            amount: amount.clone(),
            value,
        })
    }
}

/// 签名前的报价：余额、nonce、gas 一次性读取
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementQuote {
    pub balance: U256,
    pub nonce: U256,
    pub network_gas_price: U256,
    pub gas_price: U256,
    pub gas_limit: U256,
    pub gas_cost: U256,
    pub total_cost: U256,
}

impl SettlementQuote {
    pub fn is_affordable(&self) -> bool {
        self.balance >= self.total_cost
    }
}

/// 已签名的转账，签名后不可修改
#[derive(Debug, Clone)]
pub struct SignedTransfer {
    tx: TypedTransaction,
    signature: Signature,
}

impl SignedTransfer {
    pub fn new(tx: TypedTransaction, signature: Signature) -> Self {
        Self { tx, signature }
    }

    pub fn nonce(&self) -> Option<U256> {
        self.tx.nonce().copied()
    }
}

/// 取出签名后交易的原始字节（RLP 编码）。
///
/// 只接受 legacy（type-0）信封，其余类型说明签名客户端与当前实现不匹配。
pub fn raw_bytes(signed: &SignedTransfer) -> Result<Bytes, SettlementError> {
    let TypedTransaction::Legacy(_) = &signed.tx else {
        return Err(SettlementError::UnsupportedClientVersion(format!(
            "expected a legacy transfer envelope, got {:?}",
            signed.tx
        )));
    };
    let raw = signed.tx.rlp_signed(&signed.signature);
    if raw.is_empty() {
        return Err(SettlementError::UnsupportedClientVersion(
            "signed transfer encoded to an empty payload".to_string(),
        ));
    }
    Ok(raw)
}

/// 结算确认后的回执摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementReceipt {
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
}

impl From<&TransactionReceipt> for SettlementReceipt {
    fn from(receipt: &TransactionReceipt) -> Self {
        Self {
            // 老节点可能不返回 status，按成功处理
            success: receipt.status.map(|s| !s.is_zero()).unwrap_or(true),
            block_number: option_u64_to_u64(receipt.block_number),
            gas_used: receipt.gas_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers_core::types::{Eip1559TransactionRequest, TransactionRequest, U64};
    use std::str::FromStr;

    const RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

    fn dummy_signature() -> Signature {
        Signature {
            r: U256::from(1),
            s: U256::from(2),
            v: 27,
        }
    }

    #[test]
    fn request_converts_amount_to_wei() {
        let req = SettlementRequest::new(RECIPIENT, &BigDecimal::from_str("0.001").unwrap()).unwrap();
        assert_eq!(req.value, U256::from(1_000_000_000_000_000u64));
        assert_eq!(req.recipient, RECIPIENT.parse::<Address>().unwrap());
    }

    #[test]
    fn request_rejects_bad_input() {
        let amount = BigDecimal::from_str("0.001").unwrap();
        assert!(matches!(
            SettlementRequest::new("0xnope", &amount),
            Err(SettlementError::InvalidRecipient(_))
        ));
        assert!(matches!(
            SettlementRequest::new(RECIPIENT, &BigDecimal::from(0)),
            Err(SettlementError::InvalidAmount(_))
        ));
        assert!(matches!(
            SettlementRequest::new(RECIPIENT, &BigDecimal::from_str("-1").unwrap()),
            Err(SettlementError::InvalidAmount(_))
        ));
    }

    #[test]
    fn raw_bytes_encodes_legacy_transfers() {
        let tx: TypedTransaction = TransactionRequest::new()
            .to(RECIPIENT.parse::<Address>().unwrap())
            .value(1u64)
            .gas(21_000u64)
            .gas_price(1_000_000_000u64)
            .nonce(3u64)
            .chain_id(84532u64)
            .into();
        let signed = SignedTransfer::new(tx, dummy_signature());
        let raw = raw_bytes(&signed).unwrap();
        // legacy 交易是 RLP list，首字节 >= 0xc0
        assert!(raw[0] >= 0xc0);
        assert_eq!(signed.nonce(), Some(U256::from(3)));
    }

    #[test]
    fn raw_bytes_rejects_other_envelopes() {
        let tx: TypedTransaction = Eip1559TransactionRequest::new()
            .to(RECIPIENT.parse::<Address>().unwrap())
            .value(1u64)
            .into();
        let signed = SignedTransfer::new(tx, dummy_signature());
        assert!(matches!(
            raw_bytes(&signed),
            Err(SettlementError::UnsupportedClientVersion(_))
        ));
    }

    #[test]
    fn receipt_summary_reads_status() {
        let mut receipt = TransactionReceipt {
            transaction_hash: H256::repeat_byte(1),
            block_number: Some(U64::from(10)),
            status: Some(U64::from(0)),
            ..Default::default()
        };
        let summary = SettlementReceipt::from(&receipt);
        assert!(!summary.success);
        assert_eq!(summary.block_number, Some(10));

        receipt.status = None;
        assert!(SettlementReceipt::from(&receipt).success);
    }
}
