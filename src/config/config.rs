use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// 签名私钥，只从进程环境读取
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";
pub const LLM_API_KEY_ENV: &str = "ASI1_API_KEY";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub ethereum: EthereumConfig,
    pub settlement: SettlementConfig,
    pub llm: LlmConfig,
}

/// PostgreSQL 连接配置
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database_name: String,
    pub username: String,
    pub password: String,
    pub max_connections: u32,
    pub connect_timeout_seconds: u64,
    /// 完整连接串，设置后覆盖上面的分项
    #[serde(default)]
    pub url: Option<String>,
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgresql://{}:{}@{}:{}/{}",
                self.username, self.password, self.host, self.port, self.database_name
            ),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EthereumConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// 逗号分隔；为空时直接使用 rpc_url
    #[serde(default)]
    pub api_keys: String,
    pub network_name: String,
    pub request_timeout_secs: u64,
}

/// 结算参数。gas 价格 = max(floor_gas_price_wei, 网络价格 / network_price_divisor)
#[derive(Debug, Deserialize, Clone)]
pub struct SettlementConfig {
    pub gas_limit: u64,
    pub floor_gas_price_wei: u64,
    pub network_price_divisor: u64,
    pub confirmation_timeout_secs: u64,
    pub poll_interval_millis: u64,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            gas_limit: 21_000,
            floor_gas_price_wei: 1_000_000_000,
            network_price_divisor: 2,
            confirmation_timeout_secs: 120,
            poll_interval_millis: 7_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    #[serde(skip)]
    pub api_key: Option<String>,
}

/// 进程环境里的密钥，不进配置文件
#[derive(Clone, Default)]
pub struct Secrets {
    pub private_key: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            private_key: non_empty_env(PRIVATE_KEY_ENV),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        // .env 不存在时忽略
        let _ = dotenvy::dotenv();
        let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let mut config: Config = config::Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        if let Some(url) = non_empty_env(DATABASE_URL_ENV) {
            config.database.url = Some(url);
        }
        config.llm.api_key = non_empty_env(LLM_API_KEY_ENV);
        Ok(config)
    }
}
