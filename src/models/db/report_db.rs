use crate::models::db::schema::{patient_reports, published_reports};
use crate::models::domain::{PatientReport, PublishedReport};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable, Selectable};
use uuid::Uuid;

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = patient_reports)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PatientReportRow {
    pub id: Uuid,
    pub patient_email: String,
    pub mpin_digest: String,
    pub report_type: String,
    pub report_content: String,
    pub test_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<&PatientReport> for PatientReportRow {
    fn from(report: &PatientReport) -> Self {
        Self {
            id: report.id,
            patient_email: report.patient_email.clone(),
            mpin_digest: report.mpin_digest.clone(),
            report_type: report.report_type.clone(),
            report_content: report.report_content.clone(),
            test_date: report.test_date,
            created_at: report.created_at,
        }
    }
}

impl From<PatientReportRow> for PatientReport {
    fn from(row: PatientReportRow) -> Self {
        Self {
            id: row.id,
            patient_email: row.patient_email,
            mpin_digest: row.mpin_digest,
            report_type: row.report_type,
            report_content: row.report_content,
            test_date: row.test_date,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = published_reports)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PublishedReportRow {
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

impl From<&PublishedReport> for PublishedReportRow {
    fn from(report: &PublishedReport) -> Self {
        Self {
            id: report.id,
            original_report_id: report.original_report_id,
            anonymized_content: report.anonymized_content.clone(),
            report_type: report.report_type.clone(),
            test_date: report.test_date,
            published_at: report.published_at,
            title: report.title.clone(),
            description: report.description.clone(),
            tags: report.tags.clone(),
            is_active: report.is_active,
            price_eth: report.price_eth.clone(),
            seller_wallet: report.seller_wallet.clone(),
        }
    }
}

impl From<PublishedReportRow> for PublishedReport {
    fn from(row: PublishedReportRow) -> Self {
        Self {
            id: row.id,
            original_report_id: row.original_report_id,
            anonymized_content: row.anonymized_content,
            report_type: row.report_type,
            test_date: row.test_date,
            published_at: row.published_at,
            title: row.title,
            description: row.description,
            tags: row.tags,
            is_active: row.is_active,
            price_eth: row.price_eth,
            seller_wallet: row.seller_wallet,
        }
    }
}
