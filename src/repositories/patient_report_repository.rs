use crate::database::AsyncDbPool;
use crate::errors::error::AppError;
use crate::models::db::PatientReportRow;
use crate::models::db::schema::patient_reports;
use crate::models::domain::PatientReport;
use crate::repositories::base::RepositoryBase;
use crate::repositories::traits::{PatientReportRepository, Repository};
use crate::utils::convert::limit_to_i64;
use async_trait::async_trait;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

pub struct PgPatientReportRepository {
    base: RepositoryBase,
}

impl PgPatientReportRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self {
            base: RepositoryBase::new(pool),
        }
    }
}

#[async_trait]
impl Repository<PatientReport, Uuid> for PgPatientReportRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PatientReport>, AppError> {
        let mut conn = self.base.get_connection().await?;
        let row: Option<PatientReportRow> = patient_reports::table
            .find(id)
            .select(PatientReportRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| self.base.map_diesel_error(e))?;
        Ok(row.map(PatientReport::from))
    }

    async fn save(&self, entity: &PatientReport) -> Result<(), AppError> {
        let mut conn = self.base.get_connection().await?;
        diesel::insert_into(patient_reports::table)
            .values(PatientReportRow::from(entity))
            .execute(&mut conn)
            .await
            .map_err(|e| self.base.map_diesel_error(e))?;
        Ok(())
    }

    async fn find_all(&self, limit: usize) -> Result<Vec<PatientReport>, AppError> {
        let mut conn = self.base.get_connection().await?;
        let rows: Vec<PatientReportRow> = patient_reports::table
            .order(patient_reports::created_at.desc())
            .limit(limit_to_i64(limit)?)
            .select(PatientReportRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|e| self.base.map_diesel_error(e))?;
        Ok(rows.into_iter().map(PatientReport::from).collect())
    }
}

#[async_trait]
impl PatientReportRepository for PgPatientReportRepository {
    async fn find_for_patient(
        &self,
        id: Uuid,
        patient_email: &str,
    ) -> Result<Option<PatientReport>, AppError> {
        let mut conn = self.base.get_connection().await?;
        let row: Option<PatientReportRow> = patient_reports::table
            .filter(patient_reports::id.eq(id))
            .filter(patient_reports::patient_email.eq(patient_email))
            .select(PatientReportRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| self.base.map_diesel_error(e))?;
        Ok(row.map(PatientReport::from))
    }
}
