// services/settlement/executor.rs

use crate::config::SettlementConfig;
use crate::errors::settlement::SettlementError;
use crate::services::settlement::gas::GasPolicy;
use crate::services::settlement::nonce::NonceTracker;
use crate::services::settlement::signer::TxSigner;
use crate::services::settlement::types::{
    SettlementContext, SettlementQuote, SettlementReceipt, SettlementRequest, SignedTransfer,
    TransactionHash, raw_bytes,
};
use crate::utils::format::format_ether;
use crate::{log_error, log_info, log_warn};
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address, TransactionReceipt, TransactionRequest, U256};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};

/// 把一次购买变成一笔已确认的原生币转账，或者干净地失败。
///
/// 流程严格串行：余额 → nonce → gas 价格 → 本地签名 → 广播 → 轮询回执。
/// 任何一步失败都直接返回，不做自动重试。
pub struct SettlementExecutor {
    gas_policy: GasPolicy,
    gas_limit: U256,
    confirmation_timeout: Duration,
    poll_interval: Duration,
    nonce_tracker: NonceTracker,
    /// 同一发送方的结算必须串行，否则会争用同一个 nonce
    settle_lock: Mutex<()>,
}

impl SettlementExecutor {
    pub fn new(
        gas_policy: GasPolicy,
        gas_limit: u64,
        confirmation_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            gas_policy,
            gas_limit: U256::from(gas_limit),
            confirmation_timeout,
            poll_interval,
            nonce_tracker: NonceTracker::new(),
            settle_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &SettlementConfig) -> Self {
        Self::new(
            GasPolicy::from_config(config),
            config.gas_limit,
            Duration::from_secs(config.confirmation_timeout_secs),
            Duration::from_millis(config.poll_interval_millis),
        )
    }

    pub fn gas_policy(&self) -> &GasPolicy {
        &self.gas_policy
    }

    pub fn gas_limit(&self) -> U256 {
        self.gas_limit
    }

    /// 执行一次结算，成功返回已上链交易的哈希
    pub async fn settle(
        &self,
        ctx: &SettlementContext,
        request: &SettlementRequest,
    ) -> Result<TransactionHash, SettlementError> {
        // 1. 没有签名身份直接失败，不发任何网络请求
        let signer = ctx.signer().ok_or(SettlementError::NoSigningKey)?;
        let _guard = self.settle_lock.lock().await;
        let sender = signer.address();

        log_info!(
            "[PAYMENT] 发起转账: {} ETH -> {:#x}",
            request.amount,
            request.recipient
        );

        // 2-4. 读取链上状态并计算总成本
        let quote = self.quote(ctx, sender, request).await?;
        log_info!(
            "[WALLET] Balance: {} ETH, Cost: {} ETH, gas_price={} wei",
            format_ether(quote.balance),
            format_ether(quote.total_cost),
            quote.gas_price
        );
        if !quote.is_affordable() {
            log_error!("[PAYMENT] 余额不足，放弃签名");
            return Err(SettlementError::InsufficientFunds {
                required: quote.total_cost,
                available: quote.balance,
            });
        }

        // 5. 本地签名，只有签名结果离开进程
        let signed = self.sign_transfer(signer.as_ref(), request, &quote).await?;
        let raw = raw_bytes(&signed)?;
        log_info!("[BLOCKCHAIN] Transaction signed, nonce: {}", quote.nonce);

        // 6. 广播，失败不重试也不轮询
        let tx_hash = ctx
            .chain
            .send_raw_transaction(raw)
            .await
            .map_err(|e| {
                log_error!("[BLOCKCHAIN] 广播被拒绝: {}", e);
                SettlementError::BroadcastRejected(e.to_string())
            })?;
        // 记录实际签进交易的 nonce
        self.nonce_tracker.commit(signed.nonce().unwrap_or(quote.nonce));
        log_info!("[BLOCKCHAIN] Transaction broadcast: {:#x}", tx_hash);

        // 7. 等待回执
        let receipt = SettlementReceipt::from(&self.await_receipt(ctx, tx_hash).await?);
        if !receipt.success {
            log_error!("[BLOCKCHAIN] 交易回滚: hash={:#x}", tx_hash);
            return Err(SettlementError::TransactionReverted {
                hash: tx_hash,
                block_number: receipt.block_number,
            });
        }

        let actual_cost = receipt
            .gas_used
            .and_then(|used| used.checked_mul(quote.gas_price))
            .and_then(|fee| fee.checked_add(request.value))
            .unwrap_or(quote.total_cost);
        log_info!(
            "[BLOCKCHAIN] Transaction confirmed in block {:?}, cost: {} ETH",
            receipt.block_number,
            format_ether(actual_cost)
        );
        Ok(tx_hash)
    }

    /// 余额和 nonce 每次都从链上重新读取
    async fn quote(
        &self,
        ctx: &SettlementContext,
        sender: Address,
        request: &SettlementRequest,
    ) -> Result<SettlementQuote, SettlementError> {
        let balance = ctx
            .chain
            .get_balance(sender)
            .await
            .map_err(|e| SettlementError::ChainQuery(format!("balance: {}", e)))?;
        let chain_nonce = ctx
            .chain
            .get_transaction_count(sender)
            .await
            .map_err(|e| SettlementError::ChainQuery(format!("nonce: {}", e)))?;
        let network_gas_price = ctx
            .chain
            .get_gas_price()
            .await
            .map_err(|e| SettlementError::ChainQuery(format!("gas price: {}", e)))?;

        let gas_price = self.gas_policy.gas_price(network_gas_price);
        let gas_cost = self
            .gas_policy
            .gas_cost(self.gas_limit, gas_price)
            .ok_or_else(|| SettlementError::InvalidAmount("gas cost overflow".to_string()))?;
        let total_cost = request
            .value
            .checked_add(gas_cost)
            .ok_or_else(|| SettlementError::InvalidAmount("total cost overflow".to_string()))?;

        Ok(SettlementQuote {
            balance,
            nonce: self.nonce_tracker.next(chain_nonce),
            network_gas_price,
            gas_price,
            gas_limit: self.gas_limit,
            gas_cost,
            total_cost,
        })
    }

    async fn sign_transfer(
        &self,
        signer: &dyn TxSigner,
        request: &SettlementRequest,
        quote: &SettlementQuote,
    ) -> Result<SignedTransfer, SettlementError> {
        // chain_id 必须写进交易本身，否则签名和 RLP 编码的内容不一致
        let tx: TypedTransaction = TransactionRequest::new()
            .from(signer.address())
            .to(request.recipient)
            .value(request.value)
            .gas(quote.gas_limit)
            .gas_price(quote.gas_price)
            .nonce(quote.nonce)
            .chain_id(signer.chain_id())
            .into();

        let signature = signer.sign_tx(&tx).await?;
        Ok(SignedTransfer::new(tx, signature))
    }

    /// 固定间隔轮询回执，超过上限返回 ConfirmationTimeout。
    /// 广播之后结果已不确定，轮询中的 RPC 错误只记日志。
    async fn await_receipt(
        &self,
        ctx: &SettlementContext,
        tx_hash: TransactionHash,
    ) -> Result<TransactionReceipt, SettlementError> {
        let poll = async {
            loop {
                match ctx.chain.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => {}
                    Err(e) => log_warn!("查询回执失败 hash={:#x}: {}", tx_hash, e),
                }
                sleep(self.poll_interval).await;
            }
        };

        timeout(self.confirmation_timeout, poll).await.map_err(|_| {
            log_warn!(
                "[BLOCKCHAIN] {}s 内未确认, hash={:#x}",
                self.confirmation_timeout.as_secs(),
                tx_hash
            );
            SettlementError::ConfirmationTimeout {
                hash: tx_hash,
                waited_secs: self.confirmation_timeout.as_secs(),
            }
        })
    }
}
