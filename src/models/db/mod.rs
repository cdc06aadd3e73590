pub mod report_db;
pub mod schema;

pub use report_db::{PatientReportRow, PublishedReportRow};
