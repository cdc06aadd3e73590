// services/settlement/nonce/nonce_tracker.rs

use ethers_core::types::U256;
use std::sync::Mutex;

/// 发送方 nonce 的本地高水位。
///
/// 链上 pending nonce 仍然是权威值；这里只记录本进程最后一次成功广播使用的
/// nonce，保证节点尚未反映上一笔 pending 交易时也不会重复签同一个 nonce。
/// 只有广播成功后才推进，广播失败的 nonce 下次会重新从链上读取。
#[derive(Debug, Default)]
pub struct NonceTracker {
    last_broadcast: Mutex<Option<U256>>,
}

impl NonceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 本次应使用的 nonce = max(链上 nonce, 上次广播 + 1)
    pub fn next(&self, chain_nonce: U256) -> U256 {
        match self.last() {
            Some(last) => chain_nonce.max(last.saturating_add(U256::one())),
            None => chain_nonce,
        }
    }

    /// 广播成功后记录，只增不减
    pub fn commit(&self, nonce: U256) {
        if let Ok(mut last) = self.last_broadcast.lock() {
            *last = Some(match *last {
                Some(prev) => prev.max(nonce),
                None => nonce,
            });
        }
    }

    /// 当前记录的值（用于监控）
    pub fn last(&self) -> Option<U256> {
        self.last_broadcast.lock().ok().and_then(|last| *last)
    }
}
