use crate::benchmarks::BenchmarkConfig;
use crate::errors::NodeError;
use crate::logging::LogFormat;
use config::{Config, Environment};
use serde::Deserialize;
use token_ledger::{KeyLayout, ReservedOps, TokenLedger};

/// Process settings, read from the environment after an optional `.env`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub rust_log: String,
    pub log_format: String,
    pub key_layout: String,
    pub reserved_ops: String,
    pub token_name: String,
    pub token_symbol: String,
    pub token_owner: String,
    pub token_supply: u64,
    pub bench_accounts: usize,
    pub bench_rounds: usize,
    pub bench_workers: usize,
    pub bench_seed: u64,
}

pub fn load_config() -> Result<AppConfig, NodeError> {
    // Load .env file if present
    dotenvy::dotenv().ok();
    build_config(Environment::default())
}

fn build_config(env: Environment) -> Result<AppConfig, NodeError> {
    let settings = Config::builder()
        .add_source(env)
        .set_default("rust_log", "info")?
        .set_default("log_format", "pretty")?
        .set_default("key_layout", "legacy")?
        .set_default("reserved_ops", "noop")?
        .set_default("token_name", "dappToken")?
        .set_default("token_symbol", "DT")?
        .set_default("token_owner", "dappcampus")?
        .set_default("token_supply", 1_000_000)?
        .set_default("bench_accounts", 16)?
        .set_default("bench_rounds", 500)?
        .set_default("bench_workers", 4)?
        .set_default("bench_seed", 7)?
        .build()?;

    let config: AppConfig = settings.try_deserialize()?;
    // Surface bad enum values at startup rather than at first use.
    config.ledger()?;
    Ok(config)
}

impl AppConfig {
    pub fn log_format(&self) -> LogFormat {
        LogFormat::from_str_lossy(&self.log_format)
    }

    pub fn key_layout(&self) -> Result<KeyLayout, NodeError> {
        self.key_layout
            .parse::<KeyLayout>()
            .map_err(|reason| NodeError::InvalidSetting {
                key: "key_layout",
                reason,
            })
    }

    pub fn reserved_ops(&self) -> Result<ReservedOps, NodeError> {
        self.reserved_ops
            .parse::<ReservedOps>()
            .map_err(|reason| NodeError::InvalidSetting {
                key: "reserved_ops",
                reason,
            })
    }

    pub fn ledger(&self) -> Result<TokenLedger, NodeError> {
        Ok(TokenLedger::new(self.key_layout()?, self.reserved_ops()?))
    }

    /// Parameters of the `init` invocation that creates the token.
    pub fn genesis_params(&self) -> [String; 4] {
        [
            self.token_name.clone(),
            self.token_symbol.clone(),
            self.token_owner.clone(),
            self.token_supply.to_string(),
        ]
    }

    pub fn benchmark(&self) -> BenchmarkConfig {
        BenchmarkConfig {
            accounts: self.bench_accounts,
            rounds: self.bench_rounds,
            workers: self.bench_workers,
            seed: self.bench_seed,
        }
    }
}
