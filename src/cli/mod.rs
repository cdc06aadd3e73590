use crate::errors::error::AppError;
use bigdecimal::BigDecimal;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "medical-marketplace")]
#[command(about = "Publish anonymized medical reports and buy them with on-chain ETH payments", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Add a patient report protected by an MPIN
    AddReport {
        #[arg(long)]
        email: String,
        #[arg(long)]
        mpin: String,
        /// e.g. blood, xray, mri
        #[arg(long = "type")]
        report_type: String,
        #[arg(long)]
        content: String,
        /// YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS
        #[arg(long)]
        test_date: String,
    },
    /// Check report ID, email and MPIN
    VerifyAccess {
        #[arg(long)]
        id: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        mpin: String,
    },
    /// Show a published report
    GetReport { id: String },
    /// List published reports
    ListReports {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List patient reports that can be published
    ListPatientReports {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Anonymize a patient report and list it on the marketplace
    PublishReport {
        #[arg(long)]
        id: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        mpin: String,
        #[arg(long)]
        seller_wallet: String,
        #[arg(long, default_value = "0.001")]
        price_eth: BigDecimal,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// comma separated
        #[arg(long)]
        tags: Option<String>,
    },
    /// Browse the marketplace
    Marketplace {
        #[arg(long = "type")]
        report_type: Option<String>,
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Search by report type or tag
    Search {
        term: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show price, seller and dates for a listing
    Details { id: String },
    /// Pay the seller on-chain and receive the anonymized report
    BuyData { id: String },
    /// Show buyer wallet balance and purchase capacity
    Wallet,
}

/// 终端输出与退出码
#[derive(Debug, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub exit_code: i32,
}

/// 未确认的支付单独提示，不能让用户误以为失败而重复付款
pub fn render(result: Result<String, AppError>) -> Rendered {
    match result {
        Ok(text) => Rendered { text, exit_code: 0 },
        Err(e) if e.is_indeterminate() => Rendered {
            text: format!("⏳ {}", e),
            exit_code: 2,
        },
        Err(e) => Rendered {
            text: format!("❌ {}", e),
            exit_code: 1,
        },
    }
}
