use crate::config::EthereumConfig;
use crate::errors::error::AppError;
use crate::log_info;
use async_trait::async_trait;
use ethers_core::types::{Address, BlockId, BlockNumber, Bytes, H256, TransactionReceipt, U256};
use ethers_providers::{Http, Middleware, Provider};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

/// 结算流程用到的链上 RPC 能力。实现方不得缓存任何结果。
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_balance(&self, address: Address) -> Result<U256, AppError>;
    /// 使用 pending 标签，包含已进入交易池但未打包的交易
    async fn get_transaction_count(&self, address: Address) -> Result<U256, AppError>;
    async fn get_gas_price(&self) -> Result<U256, AppError>;
    async fn get_chain_id(&self) -> Result<U256, AppError>;
    /// 只广播，不等待确认；返回交易哈希
    async fn send_raw_transaction(&self, rlp: Bytes) -> Result<H256, AppError>;
    async fn get_transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>, AppError>;
}

pub struct EthereumProvider {
    providers: Vec<Arc<Provider<Http>>>,
    index: AtomicUsize,
    request_timeout: Duration,
}

/// 每个 api key 拼成一个 RPC 地址；没有 key 时直接用 rpc_url
fn endpoint_urls(config: &EthereumConfig) -> Result<Vec<Url>, AppError> {
    let keys: Vec<&str> = config
        .api_keys
        .split(',')
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect();

    if keys.is_empty() {
        let url = Url::parse(&config.rpc_url)
            .map_err(|e| AppError::InvalidUrl(format!("{}: {}", config.rpc_url, e)))?;
        return Ok(vec![url]);
    }

    keys.into_iter()
        .map(|key| {
            let raw = if config.rpc_url.ends_with('/') {
                format!("{}{}", config.rpc_url, key)
            } else {
                format!("{}/{}", config.rpc_url, key)
            };
            Url::parse(&raw).map_err(|e| AppError::InvalidUrl(format!("{}: {}", config.rpc_url, e)))
        })
        .collect()
}

impl EthereumProvider {
    pub fn new(config: &EthereumConfig) -> Result<Self, AppError> {
        let providers = endpoint_urls(config)?
            .into_iter()
            .map(|url| Arc::new(Provider::new(Http::new(url))))
            .collect::<Vec<_>>();

        log_info!(
            "成功初始化 {} 个RPC Provider, network={}",
            providers.len(),
            config.network_name
        );

        Ok(Self {
            providers,
            index: AtomicUsize::new(0),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    pub fn get_provider(&self) -> Arc<Provider<Http>> {
        let i = self.index.fetch_add(1, Ordering::Relaxed);
        self.providers[i % self.providers.len()].clone()
    }

    /// 单次 RPC 调用加超时，超时按 provider 错误处理
    async fn with_timeout<T, F>(&self, what: &str, fut: F) -> Result<T, AppError>
    where
        F: std::future::Future<Output = Result<T, ethers_providers::ProviderError>>,
    {
        match timeout(self.request_timeout, fut).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => Err(AppError::Provider(format!(
                "{} timed out after {}s",
                what,
                self.request_timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl ChainClient for EthereumProvider {
    async fn get_balance(&self, address: Address) -> Result<U256, AppError> {
        let provider = self.get_provider();
        self.with_timeout("eth_getBalance", provider.get_balance(address, None))
            .await
    }

    async fn get_transaction_count(&self, address: Address) -> Result<U256, AppError> {
        let provider = self.get_provider();
        let pending = Some(BlockId::Number(BlockNumber::Pending));
        self.with_timeout(
            "eth_getTransactionCount",
            provider.get_transaction_count(address, pending),
        )
        .await
    }

    async fn get_gas_price(&self) -> Result<U256, AppError> {
        let provider = self.get_provider();
        self.with_timeout("eth_gasPrice", provider.get_gas_price())
            .await
    }

    async fn get_chain_id(&self) -> Result<U256, AppError> {
        let provider = self.get_provider();
        self.with_timeout("eth_chainId", provider.get_chainid())
            .await
    }

    async fn send_raw_transaction(&self, rlp: Bytes) -> Result<H256, AppError> {
        // 持有 provider 的 Arc，保证 await 期间 Http Client 不被释放
        let provider = self.get_provider();
        let pending_tx = self
            .with_timeout("eth_sendRawTransaction", provider.send_raw_transaction(rlp))
            .await?;
        // PendingTransaction 解引用即为交易哈希
        Ok(*pending_tx)
    }

    async fn get_transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>, AppError> {
        let provider = self.get_provider();
        self.with_timeout(
            "eth_getTransactionReceipt",
            provider.get_transaction_receipt(tx_hash),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth_config(rpc_url: &str, api_keys: &str) -> EthereumConfig {
        EthereumConfig {
            rpc_url: rpc_url.to_string(),
            chain_id: 84532,
            api_keys: api_keys.to_string(),
            network_name: "Base Sepolia".to_string(),
            request_timeout_secs: 30,
        }
    }

    #[test]
    fn bare_rpc_url_without_keys() {
        let urls = endpoint_urls(&eth_config("https://sepolia.base.org", "")).unwrap();
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].as_str(), "https://sepolia.base.org/");
    }

    #[test]
    fn one_endpoint_per_api_key() {
        let urls =
            endpoint_urls(&eth_config("https://rpc.example.org/v3", "k1, k2,,")).unwrap();
        let urls: Vec<String> = urls.iter().map(|u| u.to_string()).collect();
        assert_eq!(
            urls,
            vec![
                "https://rpc.example.org/v3/k1".to_string(),
                "https://rpc.example.org/v3/k2".to_string()
            ]
        );
    }

    #[test]
    fn invalid_rpc_url_is_rejected() {
        assert!(matches!(
            endpoint_urls(&eth_config("not a url", "")),
            Err(AppError::InvalidUrl(_))
        ));
    }

    #[test]
    fn provider_round_robins() {
        let provider = EthereumProvider::new(&eth_config("https://rpc.example.org", "a,b")).unwrap();
        let first = provider.get_provider();
        let second = provider.get_provider();
        let third = provider.get_provider();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &third));
    }
}
