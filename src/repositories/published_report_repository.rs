use crate::database::AsyncDbPool;
use crate::errors::error::AppError;
use crate::models::db::PublishedReportRow;
use crate::models::db::schema::published_reports;
use crate::models::domain::{PublishedReport, ReportFilter};
use crate::repositories::base::RepositoryBase;
use crate::repositories::traits::{PublishedReportRepository, Repository};
use crate::utils::convert::limit_to_i64;
use async_trait::async_trait;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper, TextExpressionMethods};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

pub struct PgPublishedReportRepository {
    base: RepositoryBase,
}

impl PgPublishedReportRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self {
            base: RepositoryBase::new(pool),
        }
    }
}

/// LIKE 通配符转义，tag 按字面子串匹配
fn like_pattern(tag: &str) -> String {
    let escaped = tag
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl Repository<PublishedReport, Uuid> for PgPublishedReportRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PublishedReport>, AppError> {
        let mut conn = self.base.get_connection().await?;
        let row: Option<PublishedReportRow> = published_reports::table
            .find(id)
            .select(PublishedReportRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| self.base.map_diesel_error(e))?;
        Ok(row.map(PublishedReport::from))
    }

    async fn save(&self, entity: &PublishedReport) -> Result<(), AppError> {
        let mut conn = self.base.get_connection().await?;
        diesel::insert_into(published_reports::table)
            .values(PublishedReportRow::from(entity))
            .execute(&mut conn)
            .await
            .map_err(|e| self.base.map_diesel_error(e))?;
        Ok(())
    }

    async fn find_all(&self, limit: usize) -> Result<Vec<PublishedReport>, AppError> {
        self.search(&ReportFilter::active(limit)).await
    }
}

#[async_trait]
impl PublishedReportRepository for PgPublishedReportRepository {
    async fn search(&self, filter: &ReportFilter) -> Result<Vec<PublishedReport>, AppError> {
        let mut query = published_reports::table
            .select(PublishedReportRow::as_select())
            .into_boxed();
        if filter.active_only {
            query = query.filter(published_reports::is_active.eq(true));
        }
        if let Some(report_type) = &filter.report_type {
            query = query.filter(published_reports::report_type.eq(report_type.clone()));
        }
        if let Some(tag) = &filter.tag {
            query = query.filter(published_reports::tags.like(like_pattern(tag)));
        }

        let mut conn = self.base.get_connection().await?;
        let rows: Vec<PublishedReportRow> = query
            .order(published_reports::published_at.desc())
            .limit(limit_to_i64(filter.limit)?)
            .load(&mut conn)
            .await
            .map_err(|e| self.base.map_diesel_error(e))?;
        Ok(rows.into_iter().map(PublishedReport::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_pattern_is_a_literal_substring() {
        assert_eq!(like_pattern("covid"), "%covid%");
        assert_eq!(like_pattern("100%_x"), "%100\\%\\_x%");
    }
}
