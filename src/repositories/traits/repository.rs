use crate::errors::error::AppError;
use crate::models::domain::{PatientReport, ReportFilter, PublishedReport};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait Repository<T, ID>: Send + Sync {
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, AppError>;
    async fn save(&self, entity: &T) -> Result<(), AppError>;
    /// 最新的 limit 条
    async fn find_all(&self, limit: usize) -> Result<Vec<T>, AppError>;
}

#[async_trait]
pub trait PatientReportRepository: Repository<PatientReport, Uuid> {
    /// id 与邮箱同时匹配才返回
    async fn find_for_patient(
        &self,
        id: Uuid,
        patient_email: &str,
    ) -> Result<Option<PatientReport>, AppError>;
}

#[async_trait]
pub trait PublishedReportRepository: Repository<PublishedReport, Uuid> {
    async fn search(&self, filter: &ReportFilter) -> Result<Vec<PublishedReport>, AppError>;
}
