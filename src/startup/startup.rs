use std::sync::Arc;

use crate::cli::Command;
use crate::config::{Config, Secrets};
use crate::database::{create_async_db_pool, init_schema};
use crate::errors::error::AppError;
use crate::infrastructure::llm::{Anonymizer, AsiClient};
use crate::infrastructure::provider::{ChainClient, EthereumProvider};
use crate::repositories::{PgPatientReportRepository, PgPublishedReportRepository};
use crate::services::settlement::signer::{LocalSigner, TxSigner};
use crate::services::settlement::{SettlementContext, SettlementExecutor};
use crate::services::{MarketplaceService, PublishRequest};
use crate::utils::convert::u256_to_u64;
use crate::{log_info, log_warn};

pub type Result<T> = std::result::Result<T, AppError>;

/// 应用程序启动与管理结构体（单次 CLI 命令）
pub struct Application {
    pub marketplace: Arc<MarketplaceService>,
}

/// 没有私钥时买家功能不可用，其余操作照常
fn build_signer(secrets: &Secrets, chain_id: u64) -> Result<Option<Arc<dyn TxSigner>>> {
    match &secrets.private_key {
        Some(key) => {
            let signer = LocalSigner::from_private_key(key, chain_id)?;
            log_info!("[CONFIG] Buyer Wallet: {:?}", signer.address());
            Ok(Some(Arc::new(signer)))
        }
        None => {
            log_warn!("[WARNING] No private key configured - buyer functionality disabled");
            Ok(None)
        }
    }
}

/// 节点的 chain id 与签名用的不一致时，广播必然被拒绝。读不到也按不一致处理
async fn check_chain_id(chain: &dyn ChainClient, expected: u64) -> bool {
    match chain.get_chain_id().await.and_then(u256_to_u64) {
        Ok(remote) if remote == expected => true,
        Ok(remote) => {
            log_warn!(
                "RPC chain id {} 与配置的 chain_id {} 不一致，支付将被节点拒绝",
                remote,
                expected
            );
            false
        }
        Err(e) => {
            log_warn!("无法读取 RPC chain id: {}", e);
            false
        }
    }
}

impl Application {
    /// 构建应用实例：连接池与建表、RPC、签名身份、脱敏客户端
    pub async fn build(config: Config, secrets: Secrets) -> Result<Self> {
        let db_pool = create_async_db_pool(&config.database).await?;
        init_schema(&db_pool).await?;
        log_info!("Diesel database pool initialized successfully");

        let chain: Arc<dyn ChainClient> = Arc::new(EthereumProvider::new(&config.ethereum)?);
        let signer = build_signer(&secrets, config.ethereum.chain_id)?;
        if signer.is_some() && !check_chain_id(chain.as_ref(), config.ethereum.chain_id).await {
            log_warn!("继续启动，但 buy-data 可能失败");
        }
        let settlement = SettlementContext::new(chain, signer);
        let executor = Arc::new(SettlementExecutor::from_config(&config.settlement));
        log_info!("[CONFIG] Network: {}", config.ethereum.network_name);

        let anonymizer: Arc<dyn Anonymizer> = Arc::new(AsiClient::new(config.llm.clone())?);

        let marketplace = Arc::new(MarketplaceService::new(
            Arc::new(PgPatientReportRepository::new(db_pool.clone())),
            Arc::new(PgPublishedReportRepository::new(db_pool)),
            anonymizer,
            executor,
            settlement,
            config.ethereum.network_name.clone(),
        ));
        Ok(Self { marketplace })
    }

    /// 执行一条命令，返回给用户的文本
    pub async fn run(&self, command: Command) -> Result<String> {
        let m = &self.marketplace;
        match command {
            Command::AddReport {
                email,
                mpin,
                report_type,
                content,
                test_date,
            } => {
                m.add_patient_report(&email, &mpin, &report_type, &content, &test_date)
                    .await
            }
            Command::VerifyAccess { id, email, mpin } => {
                m.verify_report_access(&id, &email, &mpin).await
            }
            Command::GetReport { id } => m.get_report_by_id(&id).await,
            Command::ListReports { limit } => m.list_all_reports(limit).await,
            Command::ListPatientReports { limit } => {
                m.list_patient_reports_for_publishing(limit).await
            }
            Command::PublishReport {
                id,
                email,
                mpin,
                seller_wallet,
                price_eth,
                title,
                description,
                tags,
            } => {
                m.publish_report(PublishRequest {
                    report_id: id,
                    patient_email: email,
                    mpin,
                    price_eth,
                    seller_wallet,
                    title,
                    description,
                    tags,
                })
                .await
            }
            Command::Marketplace {
                report_type,
                tags,
                limit,
            } => {
                m.get_marketplace_reports(report_type.as_deref(), tags.as_deref(), limit)
                    .await
            }
            Command::Search { term, limit } => m.search_data(&term, limit).await,
            Command::Details { id } => m.get_data_details(&id).await,
            Command::BuyData { id } => m.buy_data_by_id(&id).await,
            Command::Wallet => m.check_buyer_wallet().await,
        }
    }
}
