// services/marketplace_service.rs

use crate::errors::error::AppError;
use crate::errors::settlement::SettlementError;
use crate::infrastructure::llm::Anonymizer;
use crate::models::domain::report::default_price_eth;
use crate::models::domain::{Listing, PatientReport, PublishedReport, ReportFilter};
use crate::repositories::traits::{PatientReportRepository, PublishedReportRepository, Repository};
use crate::services::settlement::{SettlementContext, SettlementExecutor, SettlementRequest};
use crate::utils::check::{parse_address, parse_test_date, require_non_empty, validate_email};
use crate::utils::format::{display_eth, eth_to_wei, format_ether};
use crate::utils::convert::h256_to_string;
use crate::{log_error, log_info, log_warn};
use bigdecimal::BigDecimal;
use ethers_core::types::U256;
use std::collections::HashSet;
use std::fmt::Write;
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_LIST_LIMIT: usize = 20;
pub const DEFAULT_MARKET_LIMIT: usize = 10;
pub const DEFAULT_SEARCH_LIMIT: usize = 5;
/// 估算钱包购买力时取样的挂牌数
const WALLET_PRICE_SAMPLE: usize = 50;
/// 与 published_reports.price_eth 的 NUMERIC(36,18) 一致
const WEI_SCALE: i64 = 18;

/// 发布报告所需的全部输入
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub report_id: String,
    pub patient_email: String,
    pub mpin: String,
    pub price_eth: BigDecimal,
    pub seller_wallet: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
}

/// 市场的全部工具操作，返回给用户的是格式化文本
pub struct MarketplaceService {
    patient_reports: Arc<dyn PatientReportRepository>,
    published_reports: Arc<dyn PublishedReportRepository>,
    anonymizer: Arc<dyn Anonymizer>,
    executor: Arc<SettlementExecutor>,
    settlement: SettlementContext,
    network_name: String,
}

fn parse_report_id(value: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(value.trim())
        .map_err(|_| AppError::Validation(format!("Invalid report ID: {}", value)))
}

/// 0 和未指定都按默认条数
fn limit_or(limit: Option<usize>, default: usize) -> usize {
    match limit {
        Some(0) | None => default,
        Some(n) => n,
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// 列表项：标题、描述、价格、ID
fn write_listing(out: &mut String, reports: &[PublishedReport]) {
    for (i, report) in reports.iter().enumerate() {
        let _ = writeln!(out, "{}. **{}**", i + 1, report.title);
        if let Some(description) = &report.description {
            let _ = writeln!(out, "   📝 Description: {}", description);
        }
        let _ = writeln!(out, "   💰 Price: {} ETH", display_eth(&report.price_eth));
        let _ = writeln!(out, "   🆔 **Report ID: {}**\n", report.id);
    }
}

impl MarketplaceService {
    pub fn new(
        patient_reports: Arc<dyn PatientReportRepository>,
        published_reports: Arc<dyn PublishedReportRepository>,
        anonymizer: Arc<dyn Anonymizer>,
        executor: Arc<SettlementExecutor>,
        settlement: SettlementContext,
        network_name: String,
    ) -> Self {
        Self {
            patient_reports,
            published_reports,
            anonymizer,
            executor,
            settlement,
            network_name,
        }
    }

    pub async fn add_patient_report(
        &self,
        patient_email: &str,
        mpin: &str,
        report_type: &str,
        report_content: &str,
        test_date: &str,
    ) -> Result<String, AppError> {
        validate_email(patient_email)?;
        require_non_empty("MPIN", mpin)?;
        require_non_empty("Report type", report_type)?;
        require_non_empty("Report content", report_content)?;
        let test_date = parse_test_date(test_date)?;

        let report = PatientReport::new(patient_email, mpin, report_type, report_content, test_date);
        self.patient_reports.save(&report).await?;
        log_info!("新增患者报告: id={}, type={}", report.id, report.report_type);

        Ok(format!(
            "✅ Report added successfully!\n\
             📧 Patient: {}\n\
             🆔 Report ID: {}\n\
             🏷️ Type: {}\n\
             📅 Test Date: {}\n\
             🔐 MPIN set for future authentication",
            report.patient_email,
            report.id,
            report.report_type,
            report.test_date.format("%Y-%m-%d")
        ))
    }

    /// 报告 ID、邮箱、MPIN 三者都匹配才通过
    async fn authenticate(
        &self,
        report_id: Uuid,
        patient_email: &str,
        mpin: &str,
    ) -> Result<PatientReport, AppError> {
        self.patient_reports
            .find_for_patient(report_id, patient_email.trim())
            .await?
            .filter(|report| report.verify_mpin(mpin))
            .ok_or_else(|| {
                AppError::Unauthorized("Invalid report ID, email, or MPIN.".to_string())
            })
    }

    pub async fn verify_report_access(
        &self,
        report_id: &str,
        patient_email: &str,
        mpin: &str,
    ) -> Result<String, AppError> {
        let id = parse_report_id(report_id)?;
        self.authenticate(id, patient_email, mpin).await?;
        Ok(format!(
            "✅ Authentication successful! You have access to report {}",
            id
        ))
    }

    async fn published_by_id(&self, report_id: &str) -> Result<PublishedReport, AppError> {
        let id = parse_report_id(report_id)?;
        self.published_reports
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report with ID {} not found", id)))
    }

    pub async fn get_report_by_id(&self, report_id: &str) -> Result<String, AppError> {
        let report = self.published_by_id(report_id).await?;

        let mut out = String::from("📋 **Published Report Details**\n\n");
        let _ = writeln!(out, "🏷️ **Title:** {}", report.title);
        if let Some(description) = &report.description {
            let _ = writeln!(out, "📝 **Description:** {}", description);
        }
        let _ = writeln!(out, "💰 **Price:** {} ETH", display_eth(&report.price_eth));
        let _ = write!(out, "🆔 **Report ID:** {}", report.id);
        Ok(out)
    }

    pub async fn list_all_reports(&self, limit: Option<usize>) -> Result<String, AppError> {
        let reports = self
            .published_reports
            .find_all(limit_or(limit, DEFAULT_LIST_LIMIT))
            .await?;
        if reports.is_empty() {
            return Err(AppError::NotFound(
                "No published reports found in marketplace".to_string(),
            ));
        }

        let mut out = format!(
            "🛒 **Published Reports in Marketplace** ({} items):\n\n",
            reports.len()
        );
        write_listing(&mut out, &reports);
        Ok(out.trim_end().to_string())
    }

    pub async fn list_patient_reports_for_publishing(
        &self,
        limit: Option<usize>,
    ) -> Result<String, AppError> {
        let reports = self
            .patient_reports
            .find_all(limit_or(limit, DEFAULT_LIST_LIMIT))
            .await?;
        if reports.is_empty() {
            return Err(AppError::NotFound(
                "No patient reports found in database".to_string(),
            ));
        }

        let mut out = format!(
            "📋 **Patient Reports Available for Publishing** ({} items):\n\n",
            reports.len()
        );
        for (i, report) in reports.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. **{}** - {}",
                i + 1,
                report.report_type.to_uppercase(),
                report.test_date.format("%Y-%m-%d")
            );
            let _ = writeln!(out, "   🆔 ID: {}", report.id);
            let _ = writeln!(out, "   📝 Preview: {}\n", report.preview());
        }
        out.push_str("💡 **To publish a report, use:** `publish-report` with the Report ID");
        Ok(out)
    }

    /// 认证 → 脱敏 → 挂牌。输入先校验，避免无效请求消耗 LLM 调用。
    pub async fn publish_report(&self, request: PublishRequest) -> Result<String, AppError> {
        let id = parse_report_id(&request.report_id)?;
        // 截到 wei 精度，校验的与入库的是同一个价格
        let price_eth = request.price_eth.with_scale(WEI_SCALE);
        if eth_to_wei(&price_eth)?.is_zero() {
            return Err(AppError::Validation(format!(
                "Price must be greater than 0 ETH, got {}",
                request.price_eth
            )));
        }
        let seller_wallet = parse_address(&request.seller_wallet)?;

        let original = self
            .authenticate(id, &request.patient_email, &request.mpin)
            .await?;

        let anonymized = self
            .anonymizer
            .anonymize(&original.report_content)
            .await
            .map_err(|e| {
                log_error!("报告脱敏失败 id={}: {}", id, e);
                e
            })?;

        let title = non_blank(request.title.as_deref()).unwrap_or_else(|| original.default_title());
        let listing = Listing {
            title,
            description: non_blank(request.description.as_deref()),
            tags: non_blank(request.tags.as_deref()),
            price_eth,
            seller_wallet: format!("{:?}", seller_wallet),
        };
        let published = PublishedReport::from_original(&original, anonymized, listing);
        self.published_reports.save(&published).await?;
        log_info!(
            "报告已发布: published_id={}, original_id={}, price={} ETH",
            published.id,
            original.id,
            display_eth(&published.price_eth)
        );

        Ok(format!(
            "✅ Successfully authenticated and published report to marketplace!\n\
             👤 Authorized User: {}\n\
             📋 Published ID: {}\n\
             📝 Title: {}\n\
             🏷️ Type: {}\n\
             📅 Test Date: {}\n\
             💰 Price: {} ETH\n\
             💳 Seller Wallet: {}\n\
             🔒 Content has been fully anonymized and HIPAA compliant",
            original.patient_email,
            published.id,
            published.title,
            published.report_type,
            published.test_date.format("%Y-%m-%d"),
            display_eth(&published.price_eth),
            published.seller_wallet
        ))
    }

    pub async fn get_marketplace_reports(
        &self,
        report_type: Option<&str>,
        tags: Option<&str>,
        limit: Option<usize>,
    ) -> Result<String, AppError> {
        let filter = ReportFilter::active(limit_or(limit, DEFAULT_MARKET_LIMIT))
            .with_type(report_type)
            .with_tag(tags);
        let reports = self.published_reports.search(&filter).await?;

        if reports.is_empty() {
            let mut filters = Vec::new();
            if let Some(t) = &filter.report_type {
                filters.push(format!("type: {}", t));
            }
            if let Some(t) = &filter.tag {
                filters.push(format!("tags: {}", t));
            }
            let suffix = if filters.is_empty() {
                String::new()
            } else {
                format!(" with filters ({})", filters.join(", "))
            };
            return Err(AppError::NotFound(format!(
                "No published reports found{}",
                suffix
            )));
        }

        let mut out = format!(
            "🛒 **Marketplace Data** ({} items available):\n\n",
            reports.len()
        );
        write_listing(&mut out, &reports);
        out.push_str("💡 **To purchase data, use:** `buy-data` with the Report ID");
        Ok(out)
    }

    /// 同时按类型和标签查找，按 ID 去重后截断
    pub async fn search_data(&self, term: &str, limit: Option<usize>) -> Result<String, AppError> {
        require_non_empty("Search term", term)?;
        let limit = limit_or(limit, DEFAULT_SEARCH_LIMIT);
        let needle = term.trim().to_lowercase();

        let by_type = self
            .published_reports
            .search(&ReportFilter::active(limit).with_type(Some(&needle)))
            .await?;
        let by_tag = self
            .published_reports
            .search(&ReportFilter::active(limit).with_tag(Some(&needle)))
            .await?;

        let mut seen = HashSet::new();
        let reports: Vec<PublishedReport> = by_type
            .into_iter()
            .chain(by_tag)
            .filter(|r| seen.insert(r.id))
            .take(limit)
            .collect();

        if reports.is_empty() {
            return Err(AppError::NotFound(format!(
                "No {} data found in marketplace",
                term.trim()
            )));
        }

        let mut out = format!(
            "🔍 **Search Results for '{}'** ({} items):\n\n",
            term.trim(),
            reports.len()
        );
        write_listing(&mut out, &reports);
        out.push_str("💡 **To purchase data, use:** `buy-data` with the Report ID");
        Ok(out)
    }

    pub async fn get_data_details(&self, report_id: &str) -> Result<String, AppError> {
        let report = self.published_by_id(report_id).await.map_err(|e| match e {
            AppError::NotFound(_) => {
                AppError::NotFound(format!("Data with ID {} not found", report_id.trim()))
            }
            other => other,
        })?;

        let mut out = String::from("📋 **Data Details**\n\n");
        let _ = writeln!(out, "🏷️ **Title:** {}", report.title);
        let _ = writeln!(out, "📊 **Type:** {}", report.report_type);
        let _ = writeln!(out, "💰 **Price:** {} ETH", display_eth(&report.price_eth));
        let _ = writeln!(out, "💳 **Seller Wallet:** {}", report.seller_wallet);
        let _ = writeln!(out, "📅 **Test Date:** {}", report.test_date.format("%Y-%m-%d"));
        let _ = writeln!(
            out,
            "📅 **Published:** {}",
            report.published_at.format("%Y-%m-%d %H:%M:%S")
        );
        if let Some(description) = &report.description {
            let _ = writeln!(out, "📝 **Description:** {}", description);
        }
        if let Some(tags) = &report.tags {
            let _ = writeln!(out, "🏷️ **Tags:** {}", tags);
        }
        let _ = writeln!(out, "🆔 **Report ID:** {}\n", report.id);
        out.push_str("💡 **To purchase this data, use:** `buy-data` with this Report ID");
        Ok(out)
    }

    /// 购买：向卖家钱包结算挂牌价，确认后返回脱敏内容
    pub async fn buy_data_by_id(&self, report_id: &str) -> Result<String, AppError> {
        let id = parse_report_id(report_id)?;
        let report = self
            .published_reports
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Data with ID {} not found", id)))?;
        if !report.is_active {
            return Err(AppError::Conflict(
                "This data is no longer available for purchase".to_string(),
            ));
        }

        log_info!("[BUYER] Initiating purchase for report {}", id);
        log_info!(
            "[BUYER] Price: {} ETH, Seller: {}",
            display_eth(&report.price_eth),
            report.seller_wallet
        );

        let request = SettlementRequest::new(&report.seller_wallet, &report.price_eth)?;
        let tx_hash = self
            .executor
            .settle(&self.settlement, &request)
            .await
            .map_err(|e| {
                if let Some(hash) = e.tx_hash() {
                    log_warn!("[BUYER] 支付未完成，相关交易: {}", h256_to_string(hash));
                }
                if let Some(short) = e.shortfall() {
                    log_warn!("[BUYER] 余额缺口 {} ETH", format_ether(short));
                }
                e
            })?;

        Ok(format!(
            "✅ **Purchase Successful!**\n\n\
             💳 **Transaction Hash:** {}\n\
             💰 **Amount Paid:** {} ETH\n\
             👤 **Paid to:** {}\n\
             📋 **Data Title:** {}\n\
             📊 **Type:** {}\n\n\
             📄 **Your Purchased Data:**\n\
             ```\n{}\n```\n\n\
             🎉 **Thank you for your purchase!**",
            h256_to_string(tx_hash),
            display_eth(&report.price_eth),
            report.seller_wallet,
            report.title,
            report.report_type,
            report.anonymized_content
        ))
    }

    /// 买家钱包状态：余额、nonce、单笔 gas 成本和可购买次数估算
    pub async fn check_buyer_wallet(&self) -> Result<String, AppError> {
        let address = self
            .settlement
            .sender()
            .ok_or(SettlementError::NoSigningKey)?;
        let chain = &self.settlement.chain;
        let balance = chain.get_balance(address).await?;
        let nonce = chain.get_transaction_count(address).await?;
        let network_gas_price = chain.get_gas_price().await?;

        let policy = self.executor.gas_policy();
        let gas_price = policy.gas_price(network_gas_price);
        let gas_cost = policy
            .gas_cost(self.executor.gas_limit(), gas_price)
            .ok_or_else(|| AppError::Conversion("gas cost overflow".to_string()))?;

        let reports = self
            .published_reports
            .search(&ReportFilter::active(WALLET_PRICE_SAMPLE))
            .await?;
        let average_price = if reports.is_empty() {
            default_price_eth()
        } else {
            let total = reports
                .iter()
                .fold(BigDecimal::from(0), |acc, r| acc + &r.price_eth);
            total / BigDecimal::from(reports.len() as u64)
        };
        let average_wei = eth_to_wei(&average_price)?;
        let per_purchase = average_wei.saturating_add(gas_cost);
        let possible = if per_purchase.is_zero() {
            U256::zero()
        } else {
            balance / per_purchase
        };

        Ok(format!(
            "💳 **Buyer Wallet Status**\n\n\
             🏦 **Wallet:** {:?}\n\
             💰 **ETH Balance:** {} ETH\n\
             📊 **Nonce:** {}\n\
             ⛽ **Gas Cost per TX:** ~{} ETH ({} wei gas price)\n\
             📈 **Average Data Price:** {} ETH\n\
             🛒 **Estimated Purchases Possible:** {}\n\
             📋 **Available Data Items:** {}\n\
             🔗 **Network:** {}",
            address,
            format_ether(balance),
            nonce,
            format_ether(gas_cost),
            gas_price,
            format_ether(average_wei),
            possible,
            reports.len(),
            self.network_name
        ))
    }
}
