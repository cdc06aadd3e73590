pub mod report;

pub use report::{Listing, PatientReport, PublishedReport, ReportFilter};
