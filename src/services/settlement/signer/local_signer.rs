// services/settlement/signer/local_signer.rs

use crate::errors::settlement::SettlementError;
use crate::services::settlement::signer::TxSigner;
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address, Signature};
use ethers_signers::{LocalWallet, Signer};
use std::sync::Arc;

#[derive(Clone)]
pub struct LocalSigner {
    wallet: Arc<LocalWallet>,
}

impl LocalSigner {
    pub fn new(wallet: LocalWallet) -> Self {
        Self {
            wallet: Arc::new(wallet),
        }
    }

    /// 从十六进制私钥构建（可带 0x 前缀），绑定链 id
    pub fn from_private_key(private_key: &str, chain_id: u64) -> Result<Self, SettlementError> {
        let wallet = private_key
            .trim()
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| SettlementError::Signing(format!("invalid private key: {}", e)))?
            .with_chain_id(chain_id);
        Ok(Self::new(wallet))
    }
}

#[async_trait::async_trait]
impl TxSigner for LocalSigner {
    async fn sign_tx(&self, tx: &TypedTransaction) -> Result<Signature, SettlementError> {
        self.wallet
            .sign_transaction(tx)
            .await
            .map_err(|e| SettlementError::Signing(e.to_string()))
    }

    fn address(&self) -> Address {
        self.wallet.address()
    }

    fn chain_id(&self) -> u64 {
        self.wallet.chain_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // anvil 默认账户 0
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn derives_address_and_chain_id() {
        let signer = LocalSigner::from_private_key(TEST_KEY, 84532).unwrap();
        assert_eq!(
            signer.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse::<Address>().unwrap()
        );
        assert_eq!(signer.chain_id(), 84532);
    }

    #[tokio::test]
    async fn signature_recovers_to_the_wallet() {
        let signer = LocalSigner::from_private_key(TEST_KEY, 84532).unwrap();
        let tx: TypedTransaction = ethers_core::types::TransactionRequest::new()
            .to("0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse::<Address>().unwrap())
            .value(1u64)
            .gas(21_000u64)
            .gas_price(1_000_000_000u64)
            .nonce(0u64)
            .chain_id(84532u64)
            .into();
        let signature = signer.sign_tx(&tx).await.unwrap();
        assert_eq!(signature.recover(tx.sighash()).unwrap(), signer.address());
    }

    #[test]
    fn rejects_garbage_key() {
        assert!(matches!(
            LocalSigner::from_private_key("not-a-key", 1),
            Err(SettlementError::Signing(_))
        ));
    }
}
