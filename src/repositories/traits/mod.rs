pub mod repository;

pub use repository::{PatientReportRepository, PublishedReportRepository, Repository};
