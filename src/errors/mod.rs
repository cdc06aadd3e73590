pub mod error;
pub mod settlement;
