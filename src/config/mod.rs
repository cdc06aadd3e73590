pub mod config;

pub use self::config::{Config, DatabaseConfig, EthereumConfig, LlmConfig, Secrets, SettlementConfig};
