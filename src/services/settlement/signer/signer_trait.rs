use crate::errors::settlement::SettlementError;
use async_trait::async_trait;
use ethers_core::types::{Address, Signature, transaction::eip2718::TypedTransaction};

/// 本地签名身份。私钥只在进程内使用，对外只交出签名。
#[async_trait]
pub trait TxSigner: Send + Sync {
    async fn sign_tx(&self, tx: &TypedTransaction) -> Result<Signature, SettlementError>;
    fn address(&self) -> Address;
    fn chain_id(&self) -> u64;
}
