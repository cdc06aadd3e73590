pub mod marketplace_service;
pub mod settlement;

pub use marketplace_service::{MarketplaceService, PublishRequest};
