pub mod executor;
pub mod gas;
pub mod nonce;
pub mod signer;
pub mod types;

pub use executor::SettlementExecutor;
pub use types::{SettlementContext, SettlementRequest};
