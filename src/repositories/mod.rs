pub mod base;
pub mod patient_report_repository;
pub mod published_report_repository;
pub mod traits;

pub use patient_report_repository::PgPatientReportRepository;
pub use published_report_repository::PgPublishedReportRepository;
