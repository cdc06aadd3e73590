use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use ethers_core::utils::keccak256;
use std::str::FromStr;
use uuid::Uuid;

/// 未设置价格时的默认挂牌价（ETH）
pub const DEFAULT_PRICE_ETH: &str = "0.001";

/// MPIN 不落明文：hex(keccak256("{report_id}:{mpin}"))
pub fn mpin_digest(report_id: Uuid, mpin: &str) -> String {
    hex::encode(keccak256(format!("{}:{}", report_id, mpin).as_bytes()))
}

pub fn default_price_eth() -> BigDecimal {
    BigDecimal::from_str(DEFAULT_PRICE_ETH).unwrap_or_else(|_| BigDecimal::from(0))
}

/// 患者原始报告
#[derive(Debug, Clone, PartialEq)]
pub struct PatientReport {
    pub id: Uuid,
    pub patient_email: String,
    pub mpin_digest: String,
    pub report_type: String,
    pub report_content: String,
    pub test_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl PatientReport {
    pub fn new(
        patient_email: &str,
        mpin: &str,
        report_type: &str,
        report_content: &str,
        test_date: DateTime<Utc>,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            patient_email: patient_email.trim().to_string(),
            mpin_digest: mpin_digest(id, mpin),
            report_type: report_type.trim().to_string(),
            report_content: report_content.to_string(),
            test_date,
            created_at: Utc::now(),
        }
    }

    pub fn verify_mpin(&self, mpin: &str) -> bool {
        self.mpin_digest == mpin_digest(self.id, mpin)
    }

    /// 列表里展示的前 100 个字符
    pub fn preview(&self) -> String {
        let mut preview: String = self.report_content.chars().take(100).collect();
        if self.report_content.chars().count() > 100 {
            preview.push_str("...");
        }
        preview
    }

    /// "Anonymous Blood Report - 2024-03"
    pub fn default_title(&self) -> String {
        let mut chars = self.report_type.chars();
        let titled = match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
            None => String::new(),
        };
        format!(
            "Anonymous {} Report - {}",
            titled,
            self.test_date.format("%Y-%m")
        )
    }
}

/// 挂到市场上的脱敏报告
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedReport {
    pub id: Uuid,
    pub original_report_id: Uuid,
    pub anonymized_content: String,
    pub report_type: String,
    pub test_date: DateTime<Utc>,
    pub published_at: DateTime<Utc>,
    pub title: String,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub is_active: bool,
    pub price_eth: BigDecimal,
    pub seller_wallet: String,
}

/// 发布时由调用方提供的字段
#[derive(Debug, Clone)]
pub struct Listing {
    pub title: String,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub price_eth: BigDecimal,
    pub seller_wallet: String,
}

impl PublishedReport {
    /// 报告类型和检测日期从原始报告复制
    pub fn from_original(original: &PatientReport, anonymized_content: String, listing: Listing) -> Self {
        Self {
            id: Uuid::new_v4(),
            original_report_id: original.id,
            anonymized_content,
            report_type: original.report_type.clone(),
            test_date: original.test_date,
            published_at: Utc::now(),
            title: listing.title,
            description: listing.description,
            tags: listing.tags,
            is_active: true,
            price_eth: listing.price_eth,
            seller_wallet: listing.seller_wallet,
        }
    }
}

/// 市场查询条件。tag 为子串匹配，结果按发布时间倒序。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFilter {
    pub report_type: Option<String>,
    pub tag: Option<String>,
    pub active_only: bool,
    pub limit: usize,
}

impl ReportFilter {
    pub fn active(limit: usize) -> Self {
        Self {
            report_type: None,
            tag: None,
            active_only: true,
            limit,
        }
    }

    pub fn with_type(mut self, report_type: Option<&str>) -> Self {
        self.report_type = report_type
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        self
    }

    pub fn with_tag(mut self, tag: Option<&str>) -> Self {
        self.tag = tag
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        self
    }
}
