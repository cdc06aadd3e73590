//! 测试替身：脚本化的链、记录签名的 signer、内存仓储、固定输出的脱敏器。

use crate::errors::error::AppError;
use crate::errors::settlement::SettlementError;
use crate::infrastructure::llm::Anonymizer;
use crate::infrastructure::provider::ChainClient;
use crate::models::domain::{PatientReport, PublishedReport, ReportFilter};
use crate::repositories::traits::{PatientReportRepository, PublishedReportRepository, Repository};
use crate::services::settlement::signer::{LocalSigner, TxSigner};
use async_trait::async_trait;
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address, Bytes, H256, Signature, TransactionReceipt, U64, U256};
use ethers_core::utils::keccak256;
use std::sync::Mutex;
use uuid::Uuid;

// anvil 默认账户 0 / 1
pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
pub const TEST_CHAIN_ID: u64 = 84532;

#[derive(Debug, Clone, Copy)]
pub enum ReceiptScript {
    Success,
    Reverted { block: u64 },
    Never,
    /// 前 failures 次查询返回 RPC 错误，之后成功
    FlakyThenSuccess { failures: usize },
}

struct ChainState {
    balance: U256,
    nonce: U256,
    gas_price: U256,
    freeze_nonce: bool,
    balance_error: Option<String>,
    broadcast_error: Option<String>,
    receipts: ReceiptScript,
    broadcasts: Vec<Bytes>,
    hashes: Vec<H256>,
    receipt_polls: usize,
    read_calls: usize,
}

pub struct MockChain {
    state: Mutex<ChainState>,
}

impl MockChain {
    pub fn new(balance: U256, nonce: u64, gas_price: u64) -> Self {
        Self {
            state: Mutex::new(ChainState {
                balance,
                nonce: U256::from(nonce),
                gas_price: U256::from(gas_price),
                freeze_nonce: false,
                balance_error: None,
                broadcast_error: None,
                receipts: ReceiptScript::Success,
                broadcasts: Vec::new(),
                hashes: Vec::new(),
                receipt_polls: 0,
                read_calls: 0,
            }),
        }
    }

    fn with_state(self, f: impl FnOnce(&mut ChainState)) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn reject_broadcast(self, message: &str) -> Self {
        let message = message.to_string();
        self.with_state(|s| s.broadcast_error = Some(message))
    }

    pub fn fail_balance(self, message: &str) -> Self {
        let message = message.to_string();
        self.with_state(|s| s.balance_error = Some(message))
    }

    pub fn with_receipts(self, script: ReceiptScript) -> Self {
        self.with_state(|s| s.receipts = script)
    }

    /// pending nonce 不随广播增长（模拟节点延迟）
    pub fn freeze_nonce(self) -> Self {
        self.with_state(|s| s.freeze_nonce = true)
    }

    pub fn accept_broadcasts(&self) {
        self.state.lock().unwrap().broadcast_error = None;
    }

    pub fn broadcasts(&self) -> Vec<Bytes> {
        self.state.lock().unwrap().broadcasts.clone()
    }

    pub fn broadcast_hashes(&self) -> Vec<H256> {
        self.state.lock().unwrap().hashes.clone()
    }

    pub fn receipt_polls(&self) -> usize {
        self.state.lock().unwrap().receipt_polls
    }

    pub fn read_calls(&self) -> usize {
        self.state.lock().unwrap().read_calls
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_balance(&self, _address: Address) -> Result<U256, AppError> {
        let mut s = self.state.lock().unwrap();
        s.read_calls += 1;
        match &s.balance_error {
            Some(message) => Err(AppError::Provider(message.clone())),
            None => Ok(s.balance),
        }
    }

    async fn get_transaction_count(&self, _address: Address) -> Result<U256, AppError> {
        let mut s = self.state.lock().unwrap();
        s.read_calls += 1;
        Ok(s.nonce)
    }

    async fn get_gas_price(&self) -> Result<U256, AppError> {
        let mut s = self.state.lock().unwrap();
        s.read_calls += 1;
        Ok(s.gas_price)
    }

    async fn get_chain_id(&self) -> Result<U256, AppError> {
        Ok(U256::from(TEST_CHAIN_ID))
    }

    async fn send_raw_transaction(&self, rlp: Bytes) -> Result<H256, AppError> {
        let mut s = self.state.lock().unwrap();
        if let Some(message) = &s.broadcast_error {
            return Err(AppError::Provider(message.clone()));
        }
        let hash = H256::from(keccak256(&rlp));
        s.broadcasts.push(rlp);
        s.hashes.push(hash);
        if !s.freeze_nonce {
            s.nonce += U256::one();
        }
        Ok(hash)
    }

    async fn get_transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>, AppError> {
        let mut s = self.state.lock().unwrap();
        s.receipt_polls += 1;
        let receipt = |status: u64, block: u64| TransactionReceipt {
            transaction_hash: tx_hash,
            block_number: Some(U64::from(block)),
            status: Some(U64::from(status)),
            gas_used: Some(U256::from(21_000u64)),
            ..Default::default()
        };
        match s.receipts {
            ReceiptScript::Success => Ok(Some(receipt(1, 100))),
            ReceiptScript::Reverted { block } => Ok(Some(receipt(0, block))),
            ReceiptScript::Never => Ok(None),
            ReceiptScript::FlakyThenSuccess { failures } => {
                if s.receipt_polls <= failures {
                    Err(AppError::Provider("upstream timeout".to_string()))
                } else {
                    Ok(Some(receipt(1, 100)))
                }
            }
        }
    }
}

/// 真实签名，同时记录每一笔被签的交易
pub struct RecordingSigner {
    inner: LocalSigner,
    signed: Mutex<Vec<TypedTransaction>>,
}

impl RecordingSigner {
    pub fn new() -> Self {
        Self {
            inner: LocalSigner::from_private_key(TEST_KEY, TEST_CHAIN_ID).unwrap(),
            signed: Mutex::new(Vec::new()),
        }
    }

    pub fn signed(&self) -> Vec<TypedTransaction> {
        self.signed.lock().unwrap().clone()
    }
}

#[async_trait]
impl TxSigner for RecordingSigner {
    async fn sign_tx(&self, tx: &TypedTransaction) -> Result<Signature, SettlementError> {
        self.signed.lock().unwrap().push(tx.clone());
        self.inner.sign_tx(tx).await
    }

    fn address(&self) -> Address {
        self.inner.address()
    }

    fn chain_id(&self) -> u64 {
        self.inner.chain_id()
    }
}

/// 原样加前缀返回，或按需失败
pub struct StubAnonymizer {
    pub fail_with: Option<String>,
}

#[async_trait]
impl Anonymizer for StubAnonymizer {
    async fn anonymize(&self, report_content: &str) -> Result<String, AppError> {
        match &self.fail_with {
            Some(message) => Err(AppError::Llm(message.clone())),
            None => Ok(format!("[anonymized] {}", report_content)),
        }
    }
}

#[derive(Default)]
pub struct MemoryPatientReports {
    rows: Mutex<Vec<PatientReport>>,
}

#[async_trait]
impl Repository<PatientReport, Uuid> for MemoryPatientReports {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PatientReport>, AppError> {
        Ok(self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    async fn save(&self, entity: &PatientReport) -> Result<(), AppError> {
        self.rows.lock().unwrap().push(entity.clone());
        Ok(())
    }

    async fn find_all(&self, limit: usize) -> Result<Vec<PatientReport>, AppError> {
        let mut rows = self.rows.lock().unwrap().clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit);
        Ok(rows)
    }
}

#[async_trait]
impl PatientReportRepository for MemoryPatientReports {
    async fn find_for_patient(
        &self,
        id: Uuid,
        patient_email: &str,
    ) -> Result<Option<PatientReport>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id && r.patient_email == patient_email)
            .cloned())
    }
}

/// 与 PgPublishedReportRepository 的 SQL 条件保持一致
fn filter_matches(filter: &ReportFilter, report: &PublishedReport) -> bool {
    if filter.active_only && !report.is_active {
        return false;
    }
    if let Some(report_type) = &filter.report_type {
        if &report.report_type != report_type {
            return false;
        }
    }
    if let Some(tag) = &filter.tag {
        match &report.tags {
            Some(tags) if tags.contains(tag.as_str()) => {}
            _ => return false,
        }
    }
    true
}

#[derive(Default)]
pub struct MemoryPublishedReports {
    rows: Mutex<Vec<PublishedReport>>,
}

impl MemoryPublishedReports {
    pub fn all(&self) -> Vec<PublishedReport> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl Repository<PublishedReport, Uuid> for MemoryPublishedReports {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PublishedReport>, AppError> {
        Ok(self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    async fn save(&self, entity: &PublishedReport) -> Result<(), AppError> {
        self.rows.lock().unwrap().push(entity.clone());
        Ok(())
    }

    async fn find_all(&self, limit: usize) -> Result<Vec<PublishedReport>, AppError> {
        self.search(&ReportFilter::active(limit)).await
    }
}

#[async_trait]
impl PublishedReportRepository for MemoryPublishedReports {
    async fn search(&self, filter: &ReportFilter) -> Result<Vec<PublishedReport>, AppError> {
        let mut rows: Vec<PublishedReport> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter_matches(filter, r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        rows.truncate(filter.limit);
        Ok(rows)
    }
}
